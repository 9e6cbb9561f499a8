pub mod identity;
pub mod payment;
pub mod reconciliation;
pub mod revenue;
pub mod tracking;
pub mod webhook;
