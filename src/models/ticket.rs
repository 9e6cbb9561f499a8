use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(TicketStatus, "ticket status" {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// A vendor's listing. `quantity` is the remaining inventory and is only
/// decremented through the store's conditional decrement.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub owner_email: String,
    pub title: String,
    pub from_location: String,
    pub to_location: String,
    pub transport_type: String,
    /// Unit price in minor currency units.
    pub price: i64,
    pub quantity: i32,
    pub departure_at: Option<DateTime<Utc>>,
    pub perks: Vec<String>,
    pub image_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    pub is_advertised: bool,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn listed_by(owner_email: &str, req: NewTicket) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_email: owner_email.to_string(),
            title: req.title,
            from_location: req.from_location,
            to_location: req.to_location,
            transport_type: req.transport_type,
            price: req.price,
            quantity: req.quantity,
            departure_at: req.departure_at,
            perks: req.perks,
            image_url: req.image_url,
            status: TicketStatus::Pending,
            is_advertised: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == TicketStatus::Approved && self.quantity > 0
    }
}

// POST /tickets
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 120))]
    pub from_location: String,
    #[validate(length(min = 1, max = 120))]
    pub to_location: String,
    #[validate(length(min = 1, max = 40))]
    pub transport_type: String,
    #[validate(range(min = 0, max = 100_000_000))]
    pub price: i64,
    #[validate(range(min = 1, max = 100000))]
    pub quantity: i32,
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub perks: Vec<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

// PATCH /tickets/status/{id}
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketStatusUpdate {
    pub status: TicketStatus,
}

// PATCH /tickets/advertise/{id}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdvertiseUpdate {
    pub is_advertised: bool,
}
