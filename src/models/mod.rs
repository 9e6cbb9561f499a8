/// Implements `as_str`, `FromStr`, `TryFrom<String>` and `Display` for an enum
/// that is stored as TEXT and travels as a lowercase JSON string.
macro_rules! text_enum {
    ($name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::models::UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(crate::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod user;
pub mod ticket;
pub mod booking;
pub mod payment;
pub mod report;

pub use user::{NewUser, ProfileUpdate, Role, RoleUpdate, User};
pub use ticket::{AdvertiseUpdate, NewTicket, Ticket, TicketStatus, TicketStatusUpdate};
pub use booking::{Booking, BookingDecision, BookingStatus, BookingWithTicket, NewBooking};
pub use payment::Payment;
pub use report::{DailyListings, DailySales};

/// A TEXT column held a value outside the enum's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
