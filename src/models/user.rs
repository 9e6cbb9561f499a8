use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Vendor,
    Admin,
    /// Terminal: set by an admin, purges the user's tickets.
    Fraud,
}

text_enum!(Role, "role" {
    User => "user",
    Vendor => "vendor",
    Admin => "admin",
    Fraud => "fraud",
});

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First sign-in: the role is always `user`, whatever the client sent.
    pub fn from_sign_in(req: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&req.email),
            display_name: req.display_name,
            photo_url: req.photo_url,
            role: Role::User,
            phone: None,
            address: None,
            city: None,
            bio: None,
            created_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// POST /users
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(max = 120))]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(url)]
    pub photo_url: Option<String>,
}

// PATCH /users-update/{email}
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    #[validate(length(max = 80))]
    pub city: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
}

// PATCH /users/role/{id}
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleUpdate {
    pub role: Role,
}
