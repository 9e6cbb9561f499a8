use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger row, written once per successful reconciliation and never updated.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub ticket_id: Uuid,
    pub ticket_title: String,
    /// Minor currency units, as reported by the gateway.
    pub amount: i64,
    pub customer_email: String,
    pub transaction_id: String,
    pub payment_status: String,
    pub paid_at: DateTime<Utc>,
}
