use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{DailyListings, DailySales};

/// One day of a vendor's revenue chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    /// Short label, e.g. `Oct 7`.
    pub name: String,
    pub date: NaiveDate,
    pub revenue: i64,
    pub sold: i64,
    pub added: i64,
}

/// Joins sales and listings on the day, ascending. Days present on only one
/// side get zeros for the other.
pub fn merge_daily_stats(sales: &[DailySales], listings: &[DailyListings]) -> Vec<RevenuePoint> {
    let mut days: BTreeMap<NaiveDate, (i64, i64, i64)> = BTreeMap::new();
    for day in sales {
        let entry = days.entry(day.day).or_default();
        entry.0 += day.revenue;
        entry.1 += day.sold;
    }
    for day in listings {
        days.entry(day.day).or_default().2 += day.added;
    }

    days.into_iter()
        .map(|(date, (revenue, sold, added))| RevenuePoint {
            name: date.format("%b %-d").to_string(),
            date,
            revenue,
            sold,
            added,
        })
        .collect()
}
