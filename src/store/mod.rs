//! Persistence boundary.
//!
//! Handlers and the reconciliation procedure only ever see `dyn Store`. Every
//! method is a single store operation; the ones documented as conditional are
//! atomic check-and-mutate at the store level (one `UPDATE ... WHERE ...` in
//! Postgres, one critical section in memory). No method spans two rows of
//! different tables, so there is no cross-entity transaction anywhere.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, BookingWithTicket, DailyListings, DailySales, Payment,
    ProfileUpdate, Role, Ticket, TicketStatus, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate {0}")]
    Duplicate(&'static str),
}

/// Which tickets a listing returns.
#[derive(Debug, Clone, Copy)]
pub enum TicketFilter<'a> {
    /// Everything, optionally narrowed by a case-insensitive substring of
    /// title or owner email. Newest first.
    All { search: Option<&'a str> },
    /// Approved with inventory left. Newest first.
    Available,
    Advertised,
    OwnedBy(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum BookingFilter<'a> {
    Customer(&'a str),
    Vendor(&'a str),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts unless a user with the same email exists. Returns whether a row
    /// was written.
    async fn insert_user_if_absent(&self, user: &User) -> Result<bool, StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Newest first; `search` matches display name or email, case-insensitive.
    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, StoreError>;
    /// Writes only the fields present in `update`.
    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError>;

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;
    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;
    async fn list_tickets(&self, filter: TicketFilter<'_>) -> Result<Vec<Ticket>, StoreError>;
    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError>;
    async fn set_ticket_advertised(
        &self,
        id: Uuid,
        advertised: bool,
    ) -> Result<Option<Ticket>, StoreError>;
    /// Conditional: subtracts `by` only while `quantity >= by`. `None` when the
    /// ticket is missing or has too little inventory left.
    async fn decrement_ticket_quantity(
        &self,
        id: Uuid,
        by: i32,
    ) -> Result<Option<Ticket>, StoreError>;
    async fn delete_tickets_by_owner(&self, owner_email: &str) -> Result<u64, StoreError>;

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;
    /// Conditional: never touches a paid booking.
    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError>;
    /// Conditional: flips the booking to paid and attaches the gateway and
    /// tracking ids only if it is neither paid nor rejected. `None` means no
    /// row matched.
    async fn mark_booking_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        tracking_id: &str,
    ) -> Result<Option<Booking>, StoreError>;
    /// Conditional: undoes `mark_booking_paid` only if the booking still
    /// carries `tracking_id`.
    async fn revert_booking_payment(&self, id: Uuid, tracking_id: &str)
        -> Result<bool, StoreError>;
    /// Newest first, each booking joined with its ticket.
    async fn list_bookings(
        &self,
        filter: BookingFilter<'_>,
    ) -> Result<Vec<BookingWithTicket>, StoreError>;

    /// Fails with `StoreError::Duplicate` when the booking already has a row.
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;
    async fn find_payment_by_booking(&self, booking_id: Uuid)
        -> Result<Option<Payment>, StoreError>;
    /// Newest first.
    async fn list_payments_for_customer(&self, email: &str) -> Result<Vec<Payment>, StoreError>;

    /// Paid bookings of a vendor, grouped by UTC day, ascending.
    async fn daily_sales(&self, vendor_email: &str) -> Result<Vec<DailySales>, StoreError>;
    /// Tickets listed by a vendor, grouped by UTC day, ascending.
    async fn daily_listings(&self, vendor_email: &str) -> Result<Vec<DailyListings>, StoreError>;
}
