use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use cinebook_core::CoreError;

use crate::models::{BookingState, Review};
use crate::repository::BookingStore;

/// Reviews are tied to a booking: one per booking, owner only, and only
/// once the booking is Paid.
pub struct ReviewService {
    store: Arc<dyn BookingStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn leave_review(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, CoreError> {
        if !(1..=5).contains(&rating) {
            return Err(CoreError::InvalidRequest(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", booking_id))?;

        if booking.user_id != user_id {
            return Err(CoreError::InvalidRequest(format!(
                "booking {} does not belong to user {}",
                booking_id, user_id
            )));
        }
        if booking.state != BookingState::Paid {
            return Err(CoreError::InvalidState {
                expected: BookingState::Paid.as_str().to_string(),
                actual: booking.state.as_str().to_string(),
            });
        }

        let review = Review::new(booking_id, user_id, rating, comment);
        // The store enforces the one-per-booking constraint atomically.
        self.store.insert_review(&review).await?;
        info!("review {} left on booking {}", review.id, booking_id);
        Ok(review)
    }

    pub async fn review_for_booking(&self, booking_id: Uuid) -> Result<Option<Review>, CoreError> {
        self.store.review_for_booking(booking_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::testutil::seed_session;
    use cinebook_booking::checkout::{MockPaymentProvider, PaymentOrchestrator};
    use cinebook_booking::repository::BookingStore;
    use cinebook_booking::review::ReviewService;
    use cinebook_booking::service::BookingService;
    use cinebook_catalog::CatalogStore;
    use cinebook_core::notify::NoopNotifier;
    use cinebook_core::CoreError;
    use cinebook_store::memory::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: BookingService,
        orchestrator: PaymentOrchestrator,
        reviews: ReviewService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let catalog: Arc<dyn CatalogStore> = store.clone();
        let bookings: Arc<dyn BookingStore> = store.clone();
        Fixture {
            service: BookingService::new(catalog, bookings.clone()),
            orchestrator: PaymentOrchestrator::new(
                bookings.clone(),
                Arc::new(MockPaymentProvider),
                Arc::new(NoopNotifier),
                "EUR".to_string(),
            ),
            reviews: ReviewService::new(bookings),
            store,
        }
    }

    async fn paid_booking(fx: &Fixture, user_id: Uuid) -> Uuid {
        let seeded = seed_session(&fx.store, 1000, &["NORMAL"]).await;
        let booking = fx
            .service
            .create_booking(user_id, seeded.session_id, seeded.seat_ids)
            .await
            .unwrap();
        let checkout = fx
            .orchestrator
            .create_checkout(booking.id, None)
            .await
            .unwrap();
        fx.orchestrator
            .confirm_payment(&checkout.provider_intent_id, true)
            .await
            .unwrap();
        booking.id
    }

    #[tokio::test]
    async fn test_review_requires_paid_booking() {
        let fx = fixture();
        let user = Uuid::new_v4();
        let seeded = seed_session(&fx.store, 1000, &["NORMAL"]).await;
        let booking = fx
            .service
            .create_booking(user, seeded.session_id, seeded.seat_ids)
            .await
            .unwrap();

        let err = fx
            .reviews
            .leave_review(booking.id, user, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_one_review_per_booking() {
        let fx = fixture();
        let user = Uuid::new_v4();
        let booking_id = paid_booking(&fx, user).await;

        fx.reviews
            .leave_review(booking_id, user, 4, Some("great screening".to_string()))
            .await
            .unwrap();
        let err = fx
            .reviews
            .leave_review(booking_id, user, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));

        let stored = fx
            .reviews
            .review_for_booking(booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rating, 4);
    }

    #[tokio::test]
    async fn test_review_rejects_bad_rating_and_wrong_owner() {
        let fx = fixture();
        let user = Uuid::new_v4();
        let booking_id = paid_booking(&fx, user).await;

        let err = fx
            .reviews
            .leave_review(booking_id, user, 6, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));

        let err = fx
            .reviews
            .leave_review(booking_id, Uuid::new_v4(), 3, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }
}
