use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::query_email;
use crate::{
    authz,
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{BookingStatus, Payment},
    services::{
        payment::CheckoutRequest,
        reconciliation::{Confirmation, ReconcileError, Receipt},
        webhook::{self, WebhookEvent},
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/payment-success", patch(payment_success))
        .route("/webhooks/payment", post(payment_webhook))
        .route("/payment-transaction", get(payment_history))
}

// --- Request/Response structs ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody {
    booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationBody {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_status: Option<String>,
    #[serde(flatten)]
    receipt: Option<Receipt>,
}

impl From<Confirmation> for ConfirmationBody {
    fn from(confirmation: Confirmation) -> Self {
        let message = confirmation.message();
        match confirmation {
            Confirmation::NotPaid { payment_status } => ConfirmationBody {
                success: false,
                message,
                payment_status: Some(payment_status),
                receipt: None,
            },
            Confirmation::Confirmed(receipt) | Confirmation::AlreadyPaid(receipt) => {
                ConfirmationBody {
                    success: true,
                    message,
                    payment_status: None,
                    receipt: Some(receipt),
                }
            }
        }
    }
}

// --- HTTP Handlers ---

/// POST /create-checkout-session
async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Json(req): Json<CheckoutBody>,
) -> ApiResult<Json<Value>> {
    let booking = state
        .store
        .find_booking(req.booking_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Booking"))?;

    if booking.customer_email != principal.email {
        return Err(ApiError::forbidden());
    }
    match booking.status {
        BookingStatus::Paid => {
            return Err(ApiError::Conflict("Booking is already paid".to_string()))
        }
        BookingStatus::Rejected => {
            return Err(ApiError::BadRequest(
                "Booking was rejected by the vendor".to_string(),
            ))
        }
        BookingStatus::Unpaid | BookingStatus::Accepted => {}
    }
    if booking.total_price <= 0 {
        return Err(ApiError::BadRequest("Booking has nothing to pay".to_string()));
    }

    let ticket = state
        .store
        .find_ticket(booking.ticket_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket"))?;

    let session = state
        .gateway
        .create_checkout_session(&CheckoutRequest {
            booking_id: booking.id,
            ticket_id: ticket.id,
            title: ticket.title,
            quantity: booking.quantity,
            amount: booking.total_price,
            customer_email: booking.customer_email,
        })
        .await?;
    let url = session.url.ok_or(ApiError::BadGateway)?;

    info!(booking_id = %booking.id, session_id = %session.id, "checkout session opened");
    Ok(Json(json!({ "url": url, "sessionId": session.id })))
}

/// PATCH /payment-success?session_id=
async fn payment_success(
    State(state): State<Arc<AppState>>,
    AuthUser(_principal): AuthUser,
    Query(params): Query<SessionQuery>,
) -> ApiResult<Json<ConfirmationBody>> {
    let session_id = params
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("session_id is required".to_string()))?;

    let confirmation = confirm_session(&state, session_id.trim()).await?;
    Ok(Json(confirmation.into()))
}

/// POST /webhooks/payment
async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let secret = state
        .payment
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("Webhook endpoint is not configured".to_string()))?;

    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing signature".to_string()))?;

    webhook::verify_signature(&body, signature, secret, Utc::now().timestamp()).map_err(|e| {
        warn!("webhook rejected: {}", e);
        ApiError::BadRequest("Invalid signature".to_string())
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Malformed event".to_string()))?;

    if event.kind != webhook::CHECKOUT_COMPLETED {
        return Ok(Json(json!({ "received": true })));
    }

    let session_id = event
        .session_id()
        .ok_or_else(|| ApiError::BadRequest("Event has no session".to_string()))?;

    match confirm_session(&state, session_id).await {
        Ok(confirmation) => Ok(Json(json!({
            "received": true,
            "message": confirmation.message(),
        }))),
        // Retrying cannot change these outcomes, so the delivery is acknowledged.
        Err(
            err @ (ReconcileError::InsufficientInventory
            | ReconcileError::TicketNotFound
            | ReconcileError::BookingNotFound
            | ReconcileError::BookingRejected
            | ReconcileError::InvalidMetadata(_)),
        ) => {
            warn!(session_id, "webhook reconciliation failed: {}", err);
            Ok(Json(json!({ "received": true, "message": err.to_string() })))
        }
        Err(err) => Err(err.into()),
    }
}

/// GET /payment-transaction?email=
async fn payment_history(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<EmailQuery>,
) -> ApiResult<Json<Vec<Payment>>> {
    let email = query_email(params.email, "email")?;
    authz::require_self(&principal, &email)?;

    let payments = state.store.list_payments_for_customer(&email).await?;
    Ok(Json(payments))
}

/// Runs reconciliation and drops the catalog cache once inventory moved.
async fn confirm_session(
    state: &AppState,
    session_id: &str,
) -> Result<Confirmation, ReconcileError> {
    let confirmation = state.reconciler.confirm(session_id).await?;
    if matches!(confirmation, Confirmation::Confirmed(_)) {
        state.cache.invalidate_catalog().await;
    }
    Ok(confirmation)
}
