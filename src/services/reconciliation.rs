//! Turns a paid checkout session into a paid booking, a decremented ticket and
//! one ledger row.
//!
//! There is no transaction across the three writes. Safety comes from the
//! store's conditional updates:
//! - only the caller whose `mark_booking_paid` matched goes on to touch
//!   inventory, so a session confirmed twice decrements once;
//! - the decrement never takes a ticket below zero;
//! - when the decrement fails, the paid transition is undone (keyed on the
//!   tracking id just written) and no ledger row is written;
//! - a losing caller only reports "already paid" once the ledger row exists,
//!   because until then the winner may still be compensated.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{user::normalize_email, Booking, BookingStatus, Payment, Ticket};
use crate::services::payment::{GatewayError, InvalidMetadata, PaymentGateway};
use crate::services::tracking::generate_tracking_id;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid session metadata: {0}")]
    InvalidMetadata(#[from] InvalidMetadata),
    #[error("booking not found")]
    BookingNotFound,
    #[error("ticket not found")]
    TicketNotFound,
    #[error("not enough tickets left")]
    InsufficientInventory,
    #[error("booking was rejected by the vendor")]
    BookingRejected,
    #[error("payment confirmation in progress")]
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tracking_id: String,
    pub transaction_id: String,
    pub booking: Booking,
    pub ticket: Option<Ticket>,
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// The gateway has not collected the money; nothing was written.
    NotPaid { payment_status: String },
    Confirmed(Receipt),
    /// An earlier call already confirmed this booking.
    AlreadyPaid(Receipt),
}

impl Confirmation {
    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            Confirmation::Confirmed(receipt) | Confirmation::AlreadyPaid(receipt) => Some(receipt),
            Confirmation::NotPaid { .. } => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Confirmation::NotPaid { .. } => "Payment not completed",
            Confirmation::Confirmed(_) => "Payment confirmed",
            Confirmation::AlreadyPaid(_) => "Already paid",
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn confirm(&self, session_id: &str) -> Result<Confirmation, ReconcileError> {
        let session = self.gateway.retrieve_session(session_id).await?;
        if !session.is_paid() {
            info!(session_id, status = %session.payment_status, "checkout session not paid");
            return Ok(Confirmation::NotPaid {
                payment_status: session.payment_status,
            });
        }

        let meta = session.booking_metadata()?;
        let transaction_id = session.transaction_id().to_string();
        let tracking_id = generate_tracking_id();

        let Some(booking) = self
            .store
            .mark_booking_paid(meta.booking_id, &session.id, &tracking_id)
            .await?
        else {
            return self.already_paid(meta.booking_id, transaction_id).await;
        };

        let ticket = match self
            .store
            .decrement_ticket_quantity(meta.ticket_id, meta.quantity)
            .await
        {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                self.compensate(booking.id, &tracking_id, session_id).await;
                return Err(match self.store.find_ticket(meta.ticket_id).await? {
                    Some(_) => ReconcileError::InsufficientInventory,
                    None => ReconcileError::TicketNotFound,
                });
            }
            Err(e) => {
                self.compensate(booking.id, &tracking_id, session_id).await;
                return Err(e.into());
            }
        };

        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            ticket_id: ticket.id,
            ticket_title: ticket.title.clone(),
            amount: session.amount_total.unwrap_or(booking.total_price),
            customer_email: session
                .payer_email()
                .map(normalize_email)
                .unwrap_or_else(|| booking.customer_email.clone()),
            transaction_id: transaction_id.clone(),
            payment_status: session.payment_status.clone(),
            paid_at: Utc::now(),
        };

        let payment = match self.store.insert_payment(&payment).await {
            Ok(()) => payment,
            Err(StoreError::Duplicate(_)) => {
                warn!(booking_id = %booking.id, "ledger row already present");
                self.store
                    .find_payment_by_booking(booking.id)
                    .await?
                    .unwrap_or(payment)
            }
            Err(e) => {
                error!(session_id, booking_id = %booking.id, "ledger write failed after inventory commit: {}", e);
                return Err(e.into());
            }
        };

        info!(
            session_id,
            booking_id = %booking.id,
            ticket_id = %ticket.id,
            remaining = ticket.quantity,
            tracking_id = %tracking_id,
            "payment confirmed"
        );

        Ok(Confirmation::Confirmed(Receipt {
            tracking_id,
            transaction_id,
            booking,
            ticket: Some(ticket),
            payment,
        }))
    }

    async fn already_paid(
        &self,
        booking_id: Uuid,
        transaction_id: String,
    ) -> Result<Confirmation, ReconcileError> {
        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(ReconcileError::BookingNotFound)?;

        match booking.status {
            BookingStatus::Paid => {}
            BookingStatus::Rejected => {
                error!(
                    booking_id = %booking.id,
                    transaction_id = %transaction_id,
                    "payment collected for a rejected booking, refund required"
                );
                return Err(ReconcileError::BookingRejected);
            }
            // Reverted by a concurrent confirmation that ran out of inventory.
            BookingStatus::Unpaid | BookingStatus::Accepted => {
                return Err(ReconcileError::InsufficientInventory)
            }
        }

        let (ticket, payment) = futures::try_join!(
            self.store.find_ticket(booking.ticket_id),
            self.store.find_payment_by_booking(booking.id),
        )?;
        let Some(payment) = payment else {
            info!(booking_id = %booking.id, "confirmation still running elsewhere");
            return Err(ReconcileError::InProgress);
        };

        info!(booking_id = %booking.id, "booking already paid");
        Ok(Confirmation::AlreadyPaid(Receipt {
            tracking_id: booking.tracking_id.clone().unwrap_or_default(),
            transaction_id,
            booking,
            ticket,
            payment,
        }))
    }

    async fn compensate(&self, booking_id: Uuid, tracking_id: &str, session_id: &str) {
        match self.store.revert_booking_payment(booking_id, tracking_id).await {
            Ok(true) => error!(
                session_id,
                booking_id = %booking_id,
                "inventory unavailable after payment; booking reverted to unpaid, refund required"
            ),
            Ok(false) => error!(
                session_id,
                booking_id = %booking_id,
                "inventory unavailable after payment and booking no longer carries this confirmation"
            ),
            Err(e) => error!(
                session_id,
                booking_id = %booking_id,
                "failed to revert booking after inventory failure: {}", e
            ),
        }
    }
}
