use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::query_email;
use crate::{
    authz,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{Booking, BookingDecision, BookingStatus, BookingWithTicket, NewBooking, TicketStatus},
    store::BookingFilter,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", patch(decide_booking))
        .route("/my-bookings", get(my_bookings))
        .route("/vendor/bookings-request", get(vendor_requests))
}

#[derive(Debug, Deserialize)]
struct CustomerQuery {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VendorQuery {
    vendor_email: Option<String>,
}

/* ---------- BOOKINGS ---------- */

// POST /bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(req): Json<NewBooking>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let ticket = state
        .store
        .find_ticket(req.ticket_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket"))?;
    if ticket.status != TicketStatus::Approved {
        return Err(ApiError::BadRequest(
            "Ticket is not open for booking".to_string(),
        ));
    }
    if req.quantity > ticket.quantity {
        return Err(ApiError::BadRequest("Not enough seats available!".to_string()));
    }

    let booking = Booking::request(&ticket, &principal.email, req.quantity)
        .ok_or_else(|| ApiError::BadRequest("Booking total is too large".to_string()))?;
    state.store.insert_booking(&booking).await?;

    info!(booking_id = %booking.id, ticket_id = %ticket.id, quantity = booking.quantity, "booking requested");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Booking successful",
            "booking": booking,
        })),
    ))
}

// PATCH /bookings/{id}
async fn decide_booking(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<BookingDecision>,
) -> ApiResult<Json<Booking>> {
    if !matches!(req.status, BookingStatus::Accepted | BookingStatus::Rejected) {
        return Err(ApiError::BadRequest(
            "status must be accepted or rejected".to_string(),
        ));
    }

    let booking = state
        .store
        .find_booking(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    if booking.vendor_email != principal.email {
        authz::require_role(state.store.as_ref(), &principal, authz::ADMIN).await?;
    }
    if booking.is_paid() {
        return Err(ApiError::Conflict("Paid bookings cannot be changed".to_string()));
    }

    // The conditional update also loses to a confirmation that lands in between.
    let booking = state
        .store
        .set_booking_status(id, req.status)
        .await?
        .ok_or_else(|| ApiError::Conflict("Paid bookings cannot be changed".to_string()))?;

    info!(booking_id = %id, status = %booking.status, "booking decided");
    Ok(Json(booking))
}

// GET /my-bookings?email=
async fn my_bookings(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<BookingWithTicket>>> {
    let email = query_email(params.email, "email")?;
    authz::require_self(&principal, &email)?;

    let bookings = state.store.list_bookings(BookingFilter::Customer(&email)).await?;
    Ok(Json(bookings))
}

// GET /vendor/bookings-request?vendorEmail=
async fn vendor_requests(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<VendorQuery>,
) -> ApiResult<Json<Vec<BookingWithTicket>>> {
    let email = query_email(params.vendor_email, "vendorEmail")?;
    authz::require_self(&principal, &email)?;
    authz::require_role(state.store.as_ref(), &principal, authz::VENDOR).await?;

    let bookings = state.store.list_bookings(BookingFilter::Vendor(&email)).await?;
    Ok(Json(bookings))
}
