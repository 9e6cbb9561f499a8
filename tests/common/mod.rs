#![allow(dead_code)]

use async_trait::async_trait;
use fake::{faker::internet::en::SafeEmail, Fake};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use ticket_market::{
    cache::CacheService,
    config::PaymentConfig,
    models::{
        user::normalize_email, Booking, BookingStatus, BookingWithTicket, DailyListings,
        DailySales, NewTicket, NewUser, Payment, ProfileUpdate, Role, Ticket, TicketStatus, User,
    },
    services::{
        identity::{IdentityError, IdentityVerifier, Principal},
        payment::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, SessionDetails},
    },
    store::{BookingFilter, MemoryStore, Store, StoreError, TicketFilter},
    AppState,
};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Accepts `token:<email>` as a bearer token for `<email>`.
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, IdentityError> {
        let email = token
            .strip_prefix("token:")
            .ok_or_else(|| IdentityError::UnknownKey(token.to_string()))?;
        Ok(Principal {
            uid: format!("uid-{email}"),
            email: normalize_email(email),
        })
    }
}

pub fn token_for(email: &str) -> String {
    format!("token:{email}")
}

/// In-memory gateway. Sessions opened through `create_checkout_session` start
/// unpaid; tests flip them with `pay`.
#[derive(Default)]
pub struct ScriptedGateway {
    sessions: Mutex<HashMap<String, SessionDetails>>,
    opened: Mutex<Vec<CheckoutRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a paid session for `booking` directly.
    pub fn paid_session(&self, booking: &Booking) -> String {
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        let details = session_details(
            &id,
            "paid",
            booking.id,
            booking.ticket_id,
            booking.quantity,
            booking.total_price,
            &booking.customer_email,
        );
        self.insert(details);
        id
    }

    pub fn insert(&self, details: SessionDetails) {
        self.sessions
            .lock()
            .unwrap()
            .insert(details.id.clone(), details);
    }

    pub fn pay(&self, session_id: &str) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(session_id) {
            session.payment_status = "paid".to_string();
            session.payment_intent = Some(format!("pi_{session_id}"));
        }
    }

    pub fn opened(&self) -> Vec<CheckoutRequest> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        self.insert(session_details(
            &id,
            "unpaid",
            request.booking_id,
            request.ticket_id,
            request.quantity,
            request.amount,
            &request.customer_email,
        ));
        self.opened.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, GatewayError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }
}

pub fn session_details(
    id: &str,
    payment_status: &str,
    booking_id: Uuid,
    ticket_id: Uuid,
    quantity: i32,
    amount: i64,
    email: &str,
) -> SessionDetails {
    SessionDetails {
        id: id.to_string(),
        payment_status: payment_status.to_string(),
        amount_total: Some(amount),
        customer_email: Some(email.to_string()),
        customer_details: None,
        payment_intent: None,
        metadata: HashMap::from([
            ("bookingId".to_string(), booking_id.to_string()),
            ("ticketId".to_string(), ticket_id.to_string()),
            ("quantity".to_string(), quantity.to_string()),
            ("bookingTitle".to_string(), "Test trip".to_string()),
        ]),
    }
}

pub fn payment_config() -> PaymentConfig {
    PaymentConfig {
        secret_key: "sk_test".to_string(),
        api_base: "http://gateway.invalid".to_string(),
        site_domain: "http://localhost:5173".to_string(),
        currency: "usd".to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<ScriptedGateway>,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(FakeVerifier),
        gateway.clone(),
        CacheService::disabled(),
        payment_config(),
    );
    TestApp {
        state,
        store,
        gateway,
    }
}

pub fn random_email() -> String {
    let email: String = SafeEmail().fake();
    normalize_email(&email)
}

pub async fn seed_user(store: &dyn Store, email: &str, role: Role) -> User {
    let mut user = User::from_sign_in(NewUser {
        email: email.to_string(),
        display_name: Some("Test User".to_string()),
        photo_url: None,
    });
    user.role = role;
    store.insert_user_if_absent(&user).await.unwrap();
    user
}

/// An approved ticket with the given inventory, priced at 1500 minor units.
pub async fn seed_ticket(store: &dyn Store, owner_email: &str, quantity: i32) -> Ticket {
    let mut ticket = Ticket::listed_by(
        owner_email,
        NewTicket {
            title: "Dhaka to Chattogram".to_string(),
            from_location: "Dhaka".to_string(),
            to_location: "Chattogram".to_string(),
            transport_type: "bus".to_string(),
            price: 1500,
            quantity,
            departure_at: None,
            perks: vec!["AC".to_string()],
            image_url: None,
        },
    );
    ticket.status = TicketStatus::Approved;
    store.insert_ticket(&ticket).await.unwrap();
    ticket
}

pub async fn seed_booking(
    store: &dyn Store,
    ticket: &Ticket,
    customer_email: &str,
    quantity: i32,
) -> Booking {
    let booking = Booking::request(ticket, customer_email, quantity).unwrap();
    store.insert_booking(&booking).await.unwrap();
    booking
}

/// Wraps a `MemoryStore` and parks every `decrement_ticket_quantity` call until
/// the test releases it, so a confirmation can be frozen between marking the
/// booking paid and touching inventory.
pub struct HeldDecrementStore {
    pub inner: Arc<MemoryStore>,
    entered: Notify,
    release: Notify,
}

impl HeldDecrementStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once a decrement is parked.
    pub async fn decrement_started(&self) {
        self.entered.notified().await;
    }

    pub fn release_decrement(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl Store for HeldDecrementStore {
    async fn insert_user_if_absent(&self, user: &User) -> Result<bool, StoreError> {
        self.inner.insert_user_if_absent(user).await
    }
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email).await
    }
    async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, StoreError> {
        self.inner.list_users(search).await
    }
    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        self.inner.update_profile(email, update).await
    }
    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError> {
        self.inner.set_user_role(id, role).await
    }
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        self.inner.insert_ticket(ticket).await
    }
    async fn find_ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        self.inner.find_ticket(id).await
    }
    async fn list_tickets(&self, filter: TicketFilter<'_>) -> Result<Vec<Ticket>, StoreError> {
        self.inner.list_tickets(filter).await
    }
    async fn set_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        self.inner.set_ticket_status(id, status).await
    }
    async fn set_ticket_advertised(
        &self,
        id: Uuid,
        advertised: bool,
    ) -> Result<Option<Ticket>, StoreError> {
        self.inner.set_ticket_advertised(id, advertised).await
    }
    async fn decrement_ticket_quantity(
        &self,
        id: Uuid,
        by: i32,
    ) -> Result<Option<Ticket>, StoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.decrement_ticket_quantity(id, by).await
    }
    async fn delete_tickets_by_owner(&self, owner_email: &str) -> Result<u64, StoreError> {
        self.inner.delete_tickets_by_owner(owner_email).await
    }
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        self.inner.insert_booking(booking).await
    }
    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.inner.find_booking(id).await
    }
    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, StoreError> {
        self.inner.set_booking_status(id, status).await
    }
    async fn mark_booking_paid(
        &self,
        id: Uuid,
        payment_id: &str,
        tracking_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        self.inner.mark_booking_paid(id, payment_id, tracking_id).await
    }
    async fn revert_booking_payment(
        &self,
        id: Uuid,
        tracking_id: &str,
    ) -> Result<bool, StoreError> {
        self.inner.revert_booking_payment(id, tracking_id).await
    }
    async fn list_bookings(
        &self,
        filter: BookingFilter<'_>,
    ) -> Result<Vec<BookingWithTicket>, StoreError> {
        self.inner.list_bookings(filter).await
    }
    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.inner.insert_payment(payment).await
    }
    async fn find_payment_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        self.inner.find_payment_by_booking(booking_id).await
    }
    async fn list_payments_for_customer(&self, email: &str) -> Result<Vec<Payment>, StoreError> {
        self.inner.list_payments_for_customer(email).await
    }
    async fn daily_sales(&self, vendor_email: &str) -> Result<Vec<DailySales>, StoreError> {
        self.inner.daily_sales(vendor_email).await
    }
    async fn daily_listings(&self, vendor_email: &str) -> Result<Vec<DailyListings>, StoreError> {
        self.inner.daily_listings(vendor_email).await
    }
}
