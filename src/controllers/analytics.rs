//! analytics.rs
//!
//! Vendor revenue chart: paid bookings and new listings per day.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::query_email;
use crate::{
    authz,
    error::ApiResult,
    middleware::AuthUser,
    services::revenue::{merge_daily_stats, RevenuePoint},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/vendor/revenue-stats", get(revenue_stats))
}

#[derive(Debug, Deserialize)]
struct RevenueQuery {
    email: Option<String>,
}

/// GET /vendor/revenue-stats?email=
///
/// One point per day that had a sale or a new listing, oldest first.
async fn revenue_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Query(params): Query<RevenueQuery>,
) -> ApiResult<Json<Vec<RevenuePoint>>> {
    let email = query_email(params.email, "email")?;
    authz::require_self(&principal, &email)?;
    authz::require_role(state.store.as_ref(), &principal, authz::VENDOR).await?;

    let (sales, listings) = futures::try_join!(
        state.store.daily_sales(&email),
        state.store.daily_listings(&email),
    )?;

    Ok(Json(merge_daily_stats(&sales, &listings)))
}
