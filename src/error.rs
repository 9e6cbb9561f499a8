use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::services::{
    payment::GatewayError,
    reconciliation::ReconcileError,
};
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized access")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InsufficientInventory(String),
    #[error("Payment gateway unavailable")]
    BadGateway,
    #[error("{0}")]
    Unavailable(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden("Forbidden access".to_string())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InsufficientInventory(_) => StatusCode::CONFLICT,
            ApiError::BadGateway => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("store error: {:?}", err);
        ApiError::Internal
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        error!("payment gateway error: {}", err);
        match err {
            GatewayError::InvalidSessionId => ApiError::BadRequest("Invalid session id".to_string()),
            GatewayError::NotFound => ApiError::not_found("Checkout session"),
            _ => ApiError::BadGateway,
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Gateway(e) => e.into(),
            ReconcileError::Store(e) => e.into(),
            ReconcileError::InvalidMetadata(reason) => {
                ApiError::BadRequest(format!("Invalid session metadata: {reason}"))
            }
            ReconcileError::BookingNotFound => ApiError::not_found("Booking"),
            ReconcileError::TicketNotFound => ApiError::not_found("Ticket"),
            ReconcileError::InsufficientInventory => {
                ApiError::InsufficientInventory("Not enough tickets left".to_string())
            }
            ReconcileError::BookingRejected => {
                ApiError::Conflict("Booking was rejected by the vendor".to_string())
            }
            ReconcileError::InProgress => {
                ApiError::Conflict("Payment confirmation in progress, retry shortly".to_string())
            }
        }
    }
}
