//! In-process store used by the test suite and for running the API without
//! Postgres. One mutex guards all collections, so each method is atomic.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookingFilter, Store, StoreError, TicketFilter};
use crate::models::{
    Booking, BookingStatus, BookingWithTicket, DailyListings, DailySales, Payment,
    ProfileUpdate, Role, Ticket, TicketStatus, User,
};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    tickets: HashMap<Uuid, Ticket>,
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<Payment>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger rows for a booking.
    pub async fn payment_count(&self, booking_id: Uuid) -> usize {
        let inner = self.inner.lock().await;
        inner.payments.iter().filter(|p| p.booking_id == booking_id).count()
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user_if_absent(&self, user: &User) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.users.contains_key(&user.email) {
            return Ok(false);
        }
        inner.users.insert(user.email.clone(), user.clone());
        Ok(true)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(email).cloned())
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.lock().await;
        let needle = search.map(str::to_lowercase);
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| match &needle {
                Some(n) => {
                    contains_ci(&u.email, n)
                        || u.display_name.as_deref().is_some_and(|d| contains_ci(d, n))
                }
                None => true,
            })
            .cloned()
            .collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(email) else {
            return Ok(None);
        };
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(address) = &update.address {
            user.address = Some(address.clone());
        }
        if let Some(city) = &update.city {
            user.city = Some(city.clone());
        }
        if let Some(bio) = &update.bio {
            user.bio = Some(bio.clone());
        }
        Ok(Some(user.clone()))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.users.values_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.tickets.contains_key(&ticket.id) {
            return Err(StoreError::Duplicate("ticket"));
        }
        inner.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self, filter: TicketFilter<'_>) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.inner.lock().await;
        let needle = match filter {
            TicketFilter::All { search } => search.map(str::to_lowercase),
            _ => None,
        };
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| match filter {
                TicketFilter::All { .. } => needle
                    .as_deref()
                    .map_or(true, |n| contains_ci(&t.title, n) || contains_ci(&t.owner_email, n)),
                TicketFilter::Available => t.is_available(),
                TicketFilter::Advertised => t.is_advertised,
                TicketFilter::OwnedBy(email) => t.owner_email == email,
            })
            .cloned()
            .collect();
        newest_first(&mut tickets, |t| t.created_at);
        Ok(tickets)
    }

    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.tickets.get_mut(&id).map(|ticket| {
            ticket.status = status;
            ticket.clone()
        }))
    }

    async fn set_ticket_advertised(
        &self,
        id: Uuid,
        advertised: bool,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.tickets.get_mut(&id).map(|ticket| {
            ticket.is_advertised = advertised;
            ticket.clone()
        }))
    }

    async fn decrement_ticket_quantity(
        &self,
        id: Uuid,
        by: i32,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .tickets
            .get_mut(&id)
            .filter(|ticket| ticket.quantity >= by)
            .map(|ticket| {
                ticket.quantity -= by;
                ticket.clone()
            }))
    }

    async fn delete_tickets_by_owner(&self, owner_email: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.tickets.len();
        inner.tickets.retain(|_, t| t.owner_email != owner_email);
        Ok((before - inner.tickets.len()) as u64)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.bookings.contains_key(&booking.id) {
            return Err(StoreError::Duplicate("booking"));
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.bookings.get(&id).cloned())
    }

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .get_mut(&id)
            .filter(|booking| !booking.is_paid())
            .map(|booking| {
                booking.status = status;
                booking.clone()
            }))
    }

    async fn mark_booking_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        tracking_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .get_mut(&id)
            .filter(|booking| {
                !matches!(booking.status, BookingStatus::Paid | BookingStatus::Rejected)
            })
            .map(|booking| {
                booking.status = BookingStatus::Paid;
                booking.payment_id = Some(payment_id.to_string());
                booking.tracking_id = Some(tracking_id.to_string());
                booking.clone()
            }))
    }

    async fn revert_booking_payment(
        &self,
        id: Uuid,
        tracking_id: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(booking) = inner.bookings.get_mut(&id) else {
            return Ok(false);
        };
        if !booking.is_paid() || booking.tracking_id.as_deref() != Some(tracking_id) {
            return Ok(false);
        }
        booking.status = BookingStatus::Unpaid;
        booking.payment_id = None;
        booking.tracking_id = None;
        Ok(true)
    }

    async fn list_bookings(
        &self,
        filter: BookingFilter<'_>,
    ) -> Result<Vec<BookingWithTicket>, StoreError> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| match filter {
                BookingFilter::Customer(email) => b.customer_email == email,
                BookingFilter::Vendor(email) => b.vendor_email == email,
            })
            .cloned()
            .collect();
        newest_first(&mut bookings, |b| b.created_at);
        Ok(bookings
            .into_iter()
            .map(|booking| {
                let ticket = inner.tickets.get(&booking.ticket_id).cloned();
                BookingWithTicket { booking, ticket }
            })
            .collect())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.payments.iter().any(|p| p.booking_id == payment.booking_id) {
            return Err(StoreError::Duplicate("payment"));
        }
        inner.payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.payments.iter().find(|p| p.booking_id == booking_id).cloned())
    }

    async fn list_payments_for_customer(&self, email: &str) -> Result<Vec<Payment>, StoreError> {
        let inner = self.inner.lock().await;
        let mut payments: Vec<Payment> = inner
            .payments
            .iter()
            .filter(|p| p.customer_email == email)
            .cloned()
            .collect();
        newest_first(&mut payments, |p| p.paid_at);
        Ok(payments)
    }

    async fn daily_sales(&self, vendor_email: &str) -> Result<Vec<DailySales>, StoreError> {
        let inner = self.inner.lock().await;
        let mut days: BTreeMap<chrono::NaiveDate, (i64, i64)> = BTreeMap::new();
        for booking in inner
            .bookings
            .values()
            .filter(|b| b.vendor_email == vendor_email && b.is_paid())
        {
            let entry = days.entry(booking.created_at.date_naive()).or_default();
            entry.0 += booking.total_price;
            entry.1 += i64::from(booking.quantity);
        }
        Ok(days
            .into_iter()
            .map(|(day, (revenue, sold))| DailySales { day, revenue, sold })
            .collect())
    }

    async fn daily_listings(&self, vendor_email: &str) -> Result<Vec<DailyListings>, StoreError> {
        let inner = self.inner.lock().await;
        let mut days: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
        for ticket in inner.tickets.values().filter(|t| t.owner_email == vendor_email) {
            *days.entry(ticket.created_at.date_naive()).or_default() += 1;
        }
        Ok(days
            .into_iter()
            .map(|(day, added)| DailyListings { day, added })
            .collect())
    }
}
