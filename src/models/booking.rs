use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::Ticket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Unpaid,
    Accepted,
    Rejected,
    /// Reached once, through payment reconciliation only.
    Paid,
}

text_enum!(BookingStatus, "booking status" {
    Unpaid => "unpaid",
    Accepted => "accepted",
    Rejected => "rejected",
    Paid => "paid",
});

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub customer_email: String,
    pub vendor_email: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub payment_id: Option<String>,
    pub tracking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// `None` when the total does not fit in minor units.
    pub fn request(ticket: &Ticket, customer_email: &str, quantity: i32) -> Option<Self> {
        let total_price = ticket.price.checked_mul(i64::from(quantity))?;
        Some(Self {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            customer_email: customer_email.to_string(),
            vendor_email: ticket.owner_email.clone(),
            quantity,
            unit_price: ticket.price,
            total_price,
            status: BookingStatus::Unpaid,
            payment_id: None,
            tracking_id: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == BookingStatus::Paid
    }
}

/// A booking with its referenced ticket looked up and flattened in.
/// `ticket` is `None` when the ticket has since been purged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingWithTicket {
    #[serde(flatten)]
    pub booking: Booking,
    pub ticket: Option<Ticket>,
}

// POST /bookings
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub ticket_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: i32,
}

// PATCH /bookings/{id}
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingDecision {
    pub status: BookingStatus,
}
