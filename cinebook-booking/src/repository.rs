use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cinebook_core::CoreError;

use crate::models::{Booking, Payment, Review, Voucher};

/// Transactional access to bookings, payments, vouchers and reviews.
///
/// Every mutating method is a single atomic unit against the store: the
/// in-memory implementation runs it under one mutex guard, the Postgres
/// implementation inside one transaction. Conditional transitions return
/// `Ok(false)` when the booking was no longer Pending, so the loser of a
/// race (sweep vs. confirm, sweep vs. sweep) is a no-op rather than a
/// corrupting write.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new Pending booking and its seat links, re-checking
    /// inside the same atomic unit that the session exists (`NotFound`
    /// otherwise) and that none of its seats is held by a Pending or Paid
    /// booking for the session. On conflict nothing is persisted and
    /// `SeatsUnavailable` lists the contested seats.
    async fn create_booking(&self, booking: &Booking) -> Result<(), CoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, CoreError>;

    /// Seats referenced by {Pending, Paid} bookings for the session.
    async fn held_seats(&self, session_id: Uuid) -> Result<HashSet<Uuid>, CoreError>;

    /// Ids of Pending bookings created before `cutoff`.
    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, CoreError>;

    /// Transition to Expired only if still Pending.
    async fn expire_if_pending(&self, booking_id: Uuid) -> Result<bool, CoreError>;

    /// Transition to Cancelled only if still Pending.
    async fn cancel_if_pending(&self, booking_id: Uuid) -> Result<bool, CoreError>;

    /// Record a payment attempt. A booking has at most one live payment;
    /// an unsettled attempt is replaced, a Paid one is immutable.
    async fn upsert_payment(&self, payment: &Payment) -> Result<(), CoreError>;

    async fn payment_by_provider_id(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<Payment>, CoreError>;

    /// Settle a confirmed payment: mark the payment Paid, transition the
    /// booking Pending→Paid and, if a voucher funded the payment,
    /// increment its usage under a cap-and-expiry re-check. All three
    /// commit together or not at all.
    async fn finalize_paid(&self, provider_intent_id: &str) -> Result<(), CoreError>;

    /// Mark a payment Failed. The booking stays Pending and remains
    /// subject to expiration.
    async fn mark_payment_failed(&self, provider_intent_id: &str) -> Result<(), CoreError>;

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, CoreError>;

    /// Insert a review, enforcing at most one per booking.
    async fn insert_review(&self, review: &Review) -> Result<(), CoreError>;

    async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, CoreError>;
}
