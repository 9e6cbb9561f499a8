use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::services::identity::Principal;

/// The verified caller of a bearer-authenticated route.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

// Bearer token extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let principal = state.identity.verify(token).await.map_err(|e| {
            warn!("bearer token rejected: {}", e);
            ApiError::Unauthorized
        })?;

        Ok(AuthUser(principal))
    }
}
