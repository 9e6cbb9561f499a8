use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{query_email, search_term};
use crate::{
    authz,
    cache::{CatalogKey, CatalogLookup},
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{AdvertiseUpdate, NewTicket, Role, Ticket, TicketStatusUpdate},
    store::TicketFilter,
    AppState,
};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/{id}", get(get_ticket))
        .route("/tickets/status/{id}", patch(update_status))
        .route("/tickets/advertise/{id}", patch(update_advertise))
        .route("/all-tickets", get(available_tickets))
        .route("/tickets-advertise", get(advertised_tickets))
        .route("/my-tickets", get(my_tickets))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

// GET /tickets?search=
async fn list_tickets(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Ticket>>> {
    authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;
    let tickets = state
        .store
        .list_tickets(TicketFilter::All {
            search: search_term(&params.search),
        })
        .await?;
    Ok(Json(tickets))
}

// POST /tickets
async fn create_ticket(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(req): Json<NewTicket>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .store
        .find_user_by_email(&principal.email)
        .await?
        .ok_or_else(ApiError::forbidden)?;
    if user.role == Role::Fraud {
        warn!(email = %user.email, "fraud account tried to list a ticket");
        return Err(ApiError::Forbidden(
            "You are not allowed to create a ticket".to_string(),
        ));
    }
    if !authz::authorize(user.role, authz::VENDOR) {
        return Err(ApiError::forbidden());
    }
    req.validate()?;

    let ticket = Ticket::listed_by(&user.email, req);
    state.store.insert_ticket(&ticket).await?;
    state.cache.invalidate_catalog().await;

    info!(ticket_id = %ticket.id, owner = %ticket.owner_email, "ticket listed");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "ticket": ticket })),
    ))
}

// GET /tickets/{id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state
        .store
        .find_ticket(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket"))?;
    Ok(Json(ticket))
}

// PATCH /tickets/status/{id}
async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<TicketStatusUpdate>,
) -> ApiResult<Json<Ticket>> {
    authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;
    let ticket = state
        .store
        .set_ticket_status(id, req.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket"))?;
    state.cache.invalidate_catalog().await;

    info!(ticket_id = %id, status = %ticket.status, "ticket moderated");
    Ok(Json(ticket))
}

// PATCH /tickets/advertise/{id}
async fn update_advertise(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AdvertiseUpdate>,
) -> ApiResult<Json<Ticket>> {
    authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;
    let ticket = state
        .store
        .set_ticket_advertised(id, req.is_advertised)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket"))?;
    state.cache.invalidate_catalog().await;
    Ok(Json(ticket))
}

// GET /all-tickets
async fn available_tickets(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    cached_listing(&state, CatalogKey::AllTickets, TicketFilter::Available).await
}

// GET /tickets-advertise
async fn advertised_tickets(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    cached_listing(&state, CatalogKey::Advertised, TicketFilter::Advertised).await
}

// GET /my-tickets?email=
async fn my_tickets(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<EmailQuery>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let email = query_email(params.email, "email")?;
    authz::require_self(&principal, &email)?;
    authz::require_role(state.store.as_ref(), &principal, authz::VENDOR).await?;

    let tickets = state.store.list_tickets(TicketFilter::OwnedBy(&email)).await?;
    Ok(Json(tickets))
}

async fn cached_listing(
    state: &AppState,
    key: CatalogKey,
    filter: TicketFilter<'_>,
) -> ApiResult<Response> {
    let token = match state.cache.get_catalog(key).await {
        CatalogLookup::Hit(cached_json) => return Ok(json_response(cached_json, "HIT")),
        CatalogLookup::Miss(token) => token,
    };

    let tickets = state.store.list_tickets(filter).await?;
    let json = serde_json::to_string(&tickets).map_err(|e| {
        error!("Failed to serialize ticket listing: {:?}", e);
        ApiError::Internal
    })?;
    state.cache.put_catalog(key, &json, token).await;

    Ok(json_response(json, "MISS"))
}

fn json_response(body: String, cache_status: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (X_CACHE, cache_status),
        ],
        body,
    )
        .into_response()
}
