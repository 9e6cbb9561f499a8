//! Role checks shared by every gated handler.
//!
//! The role always comes from the stored user record, never from the token.

use tracing::warn;

use crate::error::ApiError;
use crate::models::{Role, User};
use crate::services::identity::Principal;
use crate::store::Store;

pub const ADMIN: &[Role] = &[Role::Admin];
pub const VENDOR: &[Role] = &[Role::Vendor];
pub const VENDOR_OR_ADMIN: &[Role] = &[Role::Vendor, Role::Admin];

pub fn authorize(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// Loads the principal's user record and checks its role. A principal with no
/// stored record is treated as forbidden.
pub async fn require_role(
    store: &dyn Store,
    principal: &Principal,
    allowed: &[Role],
) -> Result<User, ApiError> {
    let user = store
        .find_user_by_email(&principal.email)
        .await?
        .ok_or_else(ApiError::forbidden)?;

    if !authorize(user.role, allowed) {
        warn!(email = %principal.email, role = %user.role, "role check failed");
        return Err(ApiError::forbidden());
    }
    Ok(user)
}

pub fn require_self(principal: &Principal, email: &str) -> Result<(), ApiError> {
    if principal.email.eq_ignore_ascii_case(email.trim()) {
        Ok(())
    } else {
        warn!(email = %principal.email, requested = %email, "cross-account access denied");
        Err(ApiError::forbidden())
    }
}
