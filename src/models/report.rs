use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// Paid bookings of one vendor grouped by booking day.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DailySales {
    pub day: NaiveDate,
    pub revenue: i64,
    pub sold: i64,
}

/// Tickets listed by one vendor grouped by listing day.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DailyListings {
    pub day: NaiveDate,
    pub added: i64,
}
