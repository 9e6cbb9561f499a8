//! payment.rs
//!
//! Client for the hosted-checkout payment gateway.
//!
//! 1.  **CircuitBreaker**: fails fast while the gateway keeps failing, and lets
//!     a single trial at a time through once the open timeout has passed.
//! 2.  **CheckoutGatewayClient**: creates checkout sessions and retrieves them
//!     for reconciliation. Every call goes through the breaker.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{CircuitBreakerConfig, PaymentConfig};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected until the timeout elapses.
    Open,
    /// One trial request is allowed to test recovery.
    HalfOpen,
}

/// Matches the gateway request timeout.
const TRIAL_STALE_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    /// Consecutive failures.
    failure_count: AtomicU32,
    last_failure: Mutex<Option<Instant>>,
    /// Start of the HalfOpen trial in flight, if any.
    trial_started: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout_seconds: u64) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            trial_started: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.timeout_seconds)
    }

    /// Whether the next request may go out. While HalfOpen only one caller
    /// at a time gets through.
    pub fn can_execute(&self) -> bool {
        let state = *self.state.read().unwrap_or_else(PoisonError::into_inner);

        match state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => self.claim_trial(),
            CircuitState::Open => {
                let cooled_down = self
                    .last_failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .map_or(true, |at| at.elapsed() >= self.timeout_duration);

                if cooled_down {
                    *self.state.write().unwrap_or_else(PoisonError::into_inner) =
                        CircuitState::HalfOpen;
                    info!("Circuit breaker transitioning to HalfOpen state");
                    return self.claim_trial();
                }
                false
            }
        }
    }

    // A trial whose caller went away (dropped future) stops blocking others
    // after TRIAL_STALE_AFTER.
    fn claim_trial(&self) -> bool {
        let mut started = self
            .trial_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *started {
            Some(at) if at.elapsed() < TRIAL_STALE_AFTER => false,
            _ => {
                *started = Some(Instant::now());
                true
            }
        }
    }

    fn finish_trial(&self) {
        *self
            .trial_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn record_success(&self) {
        self.finish_trial();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        match *state {
            CircuitState::HalfOpen => {
                *state = CircuitState::Closed;
                self.failure_count.store(0, Ordering::Relaxed);
                info!("Circuit breaker recovered - transitioning to Closed state");
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        self.finish_trial();
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        match *state {
            CircuitState::Closed => {
                if failure_count >= self.failure_threshold {
                    *state = CircuitState::Open;
                    error!(
                        "Circuit breaker OPENED - {} failures reached threshold {}",
                        failure_count, self.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Circuit breaker trial request failed - returning to Open state");
            }
            CircuitState::Open => {}
        }
    }

    pub fn get_state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("circuit breaker is open - payment gateway temporarily unavailable")]
    CircuitOpen,
    #[error("payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment gateway returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("checkout session not found")]
    NotFound,
    #[error("invalid checkout session id")]
    InvalidSessionId,
    #[error("payment gateway response is missing {0}")]
    MissingField(&'static str),
    #[error("failed to encode checkout form: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

impl GatewayError {
    /// Faults that count against the breaker: the gateway is down or broken,
    /// as opposed to rejecting a particular request.
    fn is_outage(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// What a checkout is opened for. `amount` is the booking total in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub booking_id: Uuid,
    pub ticket_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub amount: i64,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

/// A checkout session as retrieved from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDetails {
    pub id: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Booking references attached to a session when it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub booking_id: Uuid,
    pub ticket_id: Uuid,
    pub quantity: i32,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidMetadata(pub String);

impl SessionDetails {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// The payment intent id, or the session id for sessions without one.
    pub fn transaction_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref()?.email.as_deref())
    }

    pub fn booking_metadata(&self) -> Result<SessionMetadata, InvalidMetadata> {
        let field = |name: &str| {
            self.metadata
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| InvalidMetadata(format!("{name} is missing")))
        };
        let uuid = |name: &str| {
            field(name)?
                .parse::<Uuid>()
                .map_err(|_| InvalidMetadata(format!("{name} is not a valid id")))
        };

        let quantity: i32 = field("quantity")?
            .parse()
            .map_err(|_| InvalidMetadata("quantity is not a number".to_string()))?;
        if quantity <= 0 {
            return Err(InvalidMetadata("quantity must be positive".to_string()));
        }

        Ok(SessionMetadata {
            booking_id: uuid("bookingId")?,
            ticket_id: uuid("ticketId")?,
            quantity,
            title: self.metadata.get("bookingTitle").cloned(),
        })
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, GatewayError>;
}

pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 255 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct CheckoutGatewayClient {
    http_client: reqwest::Client,
    base_url: String,
    secret_key: String,
    currency: String,
    success_url: String,
    cancel_url: String,
    circuit_breaker: CircuitBreaker,
}

impl CheckoutGatewayClient {
    pub fn new(
        config: &PaymentConfig,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            currency: config.currency.clone(),
            success_url: config.success_url(),
            cancel_url: config.cancel_url(),
            circuit_breaker: CircuitBreaker::from_config(breaker),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.get_state()
    }

    async fn execute_with_circuit_breaker<F, T>(&self, operation: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking payment gateway request");
            return Err(GatewayError::CircuitOpen);
        }

        match operation.await {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e) if e.is_outage() => {
                error!("Payment gateway request failed: {}", e);
                self.circuit_breaker.record_failure();
                Err(e)
            }
            Err(e) => {
                self.circuit_breaker.record_success();
                Err(e)
            }
        }
    }

    fn checkout_form(&self, request: &CheckoutRequest) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("Please pay for: {}", request.title),
            ),
            ("line_items[0][price_data][unit_amount]", request.amount.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("customer_email", request.customer_email.clone()),
            ("metadata[bookingId]", request.booking_id.to_string()),
            ("metadata[ticketId]", request.ticket_id.to_string()),
            ("metadata[quantity]", request.quantity.to_string()),
            ("metadata[bookingTitle]", request.title.clone()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
        ]
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound);
    }
    if !status.is_success() {
        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| status.to_string());
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl PaymentGateway for CheckoutGatewayClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let body = serde_urlencoded::to_string(self.checkout_form(request))?;

        info!(
            booking_id = %request.booking_id,
            amount = request.amount,
            currency = %self.currency,
            "Creating checkout session"
        );

        let operation = async {
            let response = self
                .http_client
                .post(format!("{}/v1/checkout/sessions", self.base_url))
                .bearer_auth(&self.secret_key)
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body)
                .send()
                .await?;
            read_json::<CheckoutSession>(response).await
        };

        let session = self.execute_with_circuit_breaker(operation).await?;
        if session.url.is_none() {
            return Err(GatewayError::MissingField("url"));
        }
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, GatewayError> {
        if !is_valid_session_id(session_id) {
            return Err(GatewayError::InvalidSessionId);
        }

        let operation = async {
            let response = self
                .http_client
                .get(format!("{}/v1/checkout/sessions/{}", self.base_url, session_id))
                .bearer_auth(&self.secret_key)
                .send()
                .await?;
            read_json::<SessionDetails>(response).await
        };

        self.execute_with_circuit_breaker(operation).await
    }
}
