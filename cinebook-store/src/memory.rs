use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use cinebook_booking::models::{Booking, BookingState, Payment, PaymentState, Review, Voucher};
use cinebook_booking::repository::BookingStore;
use cinebook_catalog::models::{Hall, Movie, Seat, Session};
use cinebook_catalog::repository::CatalogStore;
use cinebook_core::CoreError;

/// Id-keyed arena store behind one async mutex.
///
/// Every mutating store operation runs under a single lock guard, which
/// gives it the same atomicity the Postgres store gets from a
/// transaction. Relations are id references resolved by lookup, never
/// in-memory object graphs.
#[derive(Default)]
struct MemoryState {
    halls: HashMap<Uuid, Hall>,
    seats: HashMap<Uuid, Seat>,
    movies: HashMap<Uuid, Movie>,
    sessions: HashMap<Uuid, Session>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
    payment_by_intent: HashMap<String, Uuid>,
    vouchers: HashMap<Uuid, Voucher>,
    /// Keyed by booking id: at most one review per booking.
    reviews: HashMap<Uuid, Review>,
}

pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub async fn seed_hall(&self, hall: Hall) {
        self.state.lock().await.halls.insert(hall.id, hall);
    }

    pub async fn seed_seat(&self, seat: Seat) {
        self.state.lock().await.seats.insert(seat.id, seat);
    }

    pub async fn seed_movie(&self, movie: Movie) {
        self.state.lock().await.movies.insert(movie.id, movie);
    }

    pub async fn seed_session(&self, session: Session) {
        self.state.lock().await.sessions.insert(session.id, session);
    }

    pub async fn seed_voucher(&self, voucher: Voucher) {
        self.state.lock().await.vouchers.insert(voucher.id, voucher);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn held_seat_ids(state: &MemoryState, session_id: Uuid) -> HashSet<Uuid> {
    state
        .bookings
        .values()
        .filter(|b| b.session_id == session_id && b.state.holds_seats())
        .flat_map(|b| b.seat_ids.iter().copied())
        .collect()
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, CoreError> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn get_seat(&self, id: Uuid) -> Result<Option<Seat>, CoreError> {
        Ok(self.state.lock().await.seats.get(&id).cloned())
    }

    async fn seats_in_hall(&self, hall_id: Uuid) -> Result<Vec<Seat>, CoreError> {
        let state = self.state.lock().await;
        let mut seats: Vec<Seat> = state
            .seats
            .values()
            .filter(|s| s.hall_id == hall_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        Ok(seats)
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn create_booking(&self, booking: &Booking) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;

        if !state.sessions.contains_key(&booking.session_id) {
            return Err(CoreError::not_found("session", booking.session_id));
        }

        // Conflict re-check and insert under the same guard.
        let held = held_seat_ids(&state, booking.session_id);
        let mut conflicts: Vec<Uuid> = booking
            .seat_ids
            .iter()
            .copied()
            .filter(|id| held.contains(id))
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort();
            return Err(CoreError::SeatsUnavailable(conflicts));
        }

        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, CoreError> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn held_seats(&self, session_id: Uuid) -> Result<HashSet<Uuid>, CoreError> {
        let state = self.state.lock().await;
        Ok(held_seat_ids(&state, session_id))
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.state == BookingState::Pending && b.created_at < cutoff)
            .map(|b| b.id)
            .collect())
    }

    async fn expire_if_pending(&self, booking_id: Uuid) -> Result<bool, CoreError> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&booking_id) {
            Some(b) if b.state == BookingState::Pending => {
                b.transition(BookingState::Expired)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_if_pending(&self, booking_id: Uuid) -> Result<bool, CoreError> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&booking_id) {
            Some(b) if b.state == BookingState::Pending => {
                b.transition(BookingState::Cancelled)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_payment(&self, payment: &Payment) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;

        let existing: Option<Payment> = state
            .payments
            .values()
            .find(|p| p.booking_id == payment.booking_id)
            .cloned();
        if let Some(old) = existing {
            if old.status == PaymentState::Paid {
                return Err(CoreError::InvalidState {
                    expected: PaymentState::Pending.as_str().to_string(),
                    actual: old.status.as_str().to_string(),
                });
            }
            state.payments.remove(&old.id);
            state.payment_by_intent.remove(&old.provider_intent_id);
        }

        state
            .payment_by_intent
            .insert(payment.provider_intent_id.clone(), payment.id);
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn payment_by_provider_id(
        &self,
        provider_intent_id: &str,
    ) -> Result<Option<Payment>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .payment_by_intent
            .get(provider_intent_id)
            .and_then(|id| state.payments.get(id))
            .cloned())
    }

    async fn finalize_paid(&self, provider_intent_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;

        let payment_id = *state
            .payment_by_intent
            .get(provider_intent_id)
            .ok_or_else(|| CoreError::not_found("payment", provider_intent_id))?;
        let (booking_id, voucher_id, status) = {
            let p = state.payments.get(&payment_id).ok_or_else(|| {
                CoreError::store("finalize_paid", "payment", provider_intent_id, "index desync")
            })?;
            (p.booking_id, p.voucher_id, p.status)
        };
        if status == PaymentState::Paid {
            return Ok(());
        }

        // Validate every leg before mutating anything; one guard makes
        // the three writes a single atomic unit.
        {
            let booking = state.bookings.get(&booking_id).ok_or_else(|| {
                CoreError::store("finalize_paid", "booking", booking_id, "missing for payment")
            })?;
            if booking.state != BookingState::Pending {
                return Err(CoreError::InvalidState {
                    expected: BookingState::Pending.as_str().to_string(),
                    actual: booking.state.as_str().to_string(),
                });
            }
        }
        if let Some(voucher_id) = voucher_id {
            let voucher = state
                .vouchers
                .get(&voucher_id)
                .ok_or_else(|| CoreError::not_found("voucher", voucher_id))?;
            voucher.validate(Utc::now())?;
        }

        if let Some(voucher_id) = voucher_id {
            if let Some(voucher) = state.vouchers.get_mut(&voucher_id) {
                voucher.usages += 1;
            }
        }
        if let Some(booking) = state.bookings.get_mut(&booking_id) {
            booking.transition(BookingState::Paid)?;
        }
        if let Some(payment) = state.payments.get_mut(&payment_id) {
            payment.status = PaymentState::Paid;
        }
        Ok(())
    }

    async fn mark_payment_failed(&self, provider_intent_id: &str) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let payment_id = *state
            .payment_by_intent
            .get(provider_intent_id)
            .ok_or_else(|| CoreError::not_found("payment", provider_intent_id))?;
        let payment = state.payments.get_mut(&payment_id).ok_or_else(|| {
            CoreError::store(
                "mark_payment_failed",
                "payment",
                provider_intent_id,
                "index desync",
            )
        })?;
        if payment.status == PaymentState::Paid {
            return Err(CoreError::InvalidState {
                expected: PaymentState::Pending.as_str().to_string(),
                actual: payment.status.as_str().to_string(),
            });
        }
        payment.status = PaymentState::Failed;
        Ok(())
    }

    async fn get_voucher(&self, id: Uuid) -> Result<Option<Voucher>, CoreError> {
        Ok(self.state.lock().await.vouchers.get(&id).cloned())
    }

    async fn insert_review(&self, review: &Review) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        if state.reviews.contains_key(&review.booking_id) {
            return Err(CoreError::InvalidRequest(format!(
                "booking {} already has a review",
                review.booking_id
            )));
        }
        state.reviews.insert(review.booking_id, review.clone());
        Ok(())
    }

    async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, CoreError> {
        Ok(self.state.lock().await.reviews.get(&booking_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_booking_requires_existing_session() {
        let store = InMemoryStore::new();
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), vec![Uuid::new_v4()], 1000);

        let err = store.create_booking(&booking).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "session", .. }));

        store
            .seed_session(Session {
                id: booking.session_id,
                movie_id: Uuid::new_v4(),
                hall_id: Uuid::new_v4(),
                starts_at: Utc::now() + Duration::days(1),
                ends_at: Utc::now() + Duration::days(1) + Duration::hours(2),
                base_price_cents: 1000,
            })
            .await;
        store.create_booking(&booking).await.unwrap();
    }
}
