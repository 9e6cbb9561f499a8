use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::search_term;
use crate::{
    authz,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{user::normalize_email, NewUser, ProfileUpdate, Role, RoleUpdate, User},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{email}/role", get(get_role))
        .route("/users-profile/{email}", get(get_profile))
        .route("/users-update/{email}", patch(update_profile))
        .route("/users/role/{id}", patch(update_role))
        .route("/users/fraud/{id}", patch(mark_fraud))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

// POST /users
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let user = User::from_sign_in(req);

    if !state.store.insert_user_if_absent(&user).await? {
        return Ok((
            StatusCode::OK,
            Json(json!({ "success": true, "message": "User already exists" })),
        ));
    }

    info!(email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "User created", "user": user })),
    ))
}

// GET /users?search=
async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Vec<User>>> {
    authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;
    let users = state.store.list_users(search_term(&params.search)).await?;
    Ok(Json(users))
}

// GET /users/{email}/role
async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let role = state
        .store
        .find_user_by_email(&normalize_email(&email))
        .await?
        .map_or(Role::User, |user| user.role);
    Ok(Json(json!({ "role": role })))
}

// GET /users-profile/{email}
async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<User>> {
    authz::require_self(&principal, &email)?;
    let user = state
        .store
        .find_user_by_email(&principal.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(user))
}

// PATCH /users-update/{email}
async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(email): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    authz::require_self(&principal, &email)?;
    update.validate()?;
    let user = state
        .store
        .update_profile(&principal.email, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(Json(user))
}

// PATCH /users/role/{id}
async fn update_role(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleUpdate>,
) -> ApiResult<Json<User>> {
    authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;
    if req.role == Role::Fraud {
        return Err(ApiError::BadRequest(
            "Use /users/fraud/{id} to flag a fraudulent user".to_string(),
        ));
    }

    let user = state
        .store
        .set_user_role(id, req.role)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    info!(user_id = %id, role = %user.role, "role changed");
    Ok(Json(user))
}

// PATCH /users/fraud/{id}
async fn mark_fraud(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;

    let user = state
        .store
        .set_user_role(id, Role::Fraud)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let deleted = state.store.delete_tickets_by_owner(&user.email).await?;
    state.cache.invalidate_catalog().await;

    info!(user_id = %id, email = %user.email, deleted, "user flagged as fraud");
    Ok(Json(json!({
        "success": true,
        "user": user,
        "deletedTickets": deleted,
    })))
}
