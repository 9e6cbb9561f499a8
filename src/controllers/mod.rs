pub mod analytics;
pub mod bookings;
pub mod payment;
pub mod tickets;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::models::user::normalize_email;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(users::routes())
        .merge(tickets::routes())
        .merge(bookings::routes())
        .merge(payment::routes())
        .merge(analytics::routes())
}

/// A required query-string email, normalized.
fn query_email(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .as_deref()
        .map(normalize_email)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} query parameter is required")))
}

/// Blank `?search=` means no filter.
fn search_term(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
