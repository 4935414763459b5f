use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cinebook_core::CoreError;

/// Booking lifecycle state.
///
/// Pending is the only state that may transition; Paid, Expired and
/// Cancelled are sinks. Seats are released the instant a booking leaves
/// {Pending, Paid}, because the held-seat queries filter on those two.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Pending,
    Paid,
    Expired,
    Cancelled,
}

impl BookingState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingState::Pending)
    }

    /// Does this state hold its seats against other buyers?
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingState::Pending | BookingState::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Pending => "PENDING",
            BookingState::Paid => "PAID",
            BookingState::Expired => "EXPIRED",
            BookingState::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingState::Pending),
            "PAID" => Some(BookingState::Paid),
            "EXPIRED" => Some(BookingState::Expired),
            "CANCELLED" => Some(BookingState::Cancelled),
            _ => None,
        }
    }
}

/// The reservation unit: one user, one session, a fixed set of seats and
/// a monetary total. `created_at` drives expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub total_cents: i64,
    pub state: BookingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(user_id: Uuid, session_id: Uuid, seat_ids: Vec<Uuid>, total_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            seat_ids,
            total_cents,
            state: BookingState::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a lifecycle transition. Only Pending bookings may move, and
    /// never back to Pending, so terminal states cannot be resurrected.
    pub fn transition(&mut self, to: BookingState) -> Result<(), CoreError> {
        if self.state != BookingState::Pending || to == BookingState::Pending {
            return Err(CoreError::InvalidState {
                expected: BookingState::Pending.as_str().to_string(),
                actual: self.state.as_str().to_string(),
            });
        }
        self.state = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Paid,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "PENDING",
            PaymentState::Paid => "PAID",
            PaymentState::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentState::Pending),
            "PAID" => Some(PaymentState::Paid),
            "FAILED" => Some(PaymentState::Failed),
            _ => None,
        }
    }
}

/// One payment attempt per booking, keyed on the provider's intent id for
/// webhook reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub provider_intent_id: String,
    pub status: PaymentState,
    pub amount_cents: i64,
    pub voucher_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        booking_id: Uuid,
        provider_intent_id: String,
        amount_cents: i64,
        voucher_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            provider_intent_id,
            status: PaymentState::Pending,
            amount_cents,
            voucher_id,
            created_at: Utc::now(),
        }
    }
}

/// Discount voucher. Usage is counted at payment confirmation, not at
/// checkout, atomically with the finalization it funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: Uuid,
    pub code: String,
    /// Discount fraction in (0, 1).
    pub discount: f64,
    pub valid_until: DateTime<Utc>,
    pub usages: i32,
    pub max_usages: i32,
}

impl Voucher {
    /// Checkout-time validation. Consumption is deferred to confirmation,
    /// where the cap is re-checked inside the settling transaction.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.valid_until <= now {
            return Err(CoreError::VoucherInvalid(format!(
                "voucher {} expired at {}",
                self.code, self.valid_until
            )));
        }
        if self.usages >= self.max_usages {
            return Err(CoreError::VoucherInvalid(format!(
                "voucher {} exhausted ({}/{} usages)",
                self.code, self.usages, self.max_usages
            )));
        }
        Ok(())
    }
}

/// At most one review per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(booking_id: Uuid, user_id: Uuid, rating: i16, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            user_id,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}
