use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use cinebook_catalog::{pricing, CatalogStore};
use cinebook_core::CoreError;

use crate::models::{Booking, BookingState};
use crate::repository::BookingStore;

/// Booking creation and user-facing cancellation.
pub struct BookingService {
    catalog: Arc<dyn CatalogStore>,
    bookings: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(catalog: Arc<dyn CatalogStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { catalog, bookings }
    }

    /// Validate a seat request and atomically persist a Pending booking.
    ///
    /// Validation happens before any mutation; the seat-conflict re-check
    /// runs inside the store's atomic creation, so two concurrent requests
    /// for the same seat cannot both succeed.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        seat_ids: Vec<Uuid>,
    ) -> Result<Booking, CoreError> {
        let session = self
            .catalog
            .get_session(session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("session", session_id))?;

        if seat_ids.is_empty() {
            return Err(CoreError::InvalidRequest(
                "a booking needs at least one seat".to_string(),
            ));
        }
        let distinct: HashSet<Uuid> = seat_ids.iter().copied().collect();
        if distinct.len() != seat_ids.len() {
            return Err(CoreError::InvalidRequest(
                "duplicate seat in request".to_string(),
            ));
        }

        let hall_seats: HashMap<Uuid, _> = self
            .catalog
            .seats_in_hall(session.hall_id)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut total_cents = 0i64;
        for seat_id in &seat_ids {
            let seat = hall_seats.get(seat_id).ok_or_else(|| {
                CoreError::InvalidRequest(format!(
                    "seat {} does not belong to the hall of session {}",
                    seat_id, session_id
                ))
            })?;
            total_cents += pricing::seat_price_cents(session.base_price_cents, seat.category);
        }

        let booking = Booking::new(user_id, session_id, seat_ids, total_cents);
        self.bookings.create_booking(&booking).await?;

        info!(
            "booking {} created: session={} seats={} total={}c",
            booking.id,
            session_id,
            booking.seat_ids.len(),
            booking.total_cents
        );
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, CoreError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", booking_id))
    }

    /// Cancel a Pending booking on behalf of its owner, releasing its
    /// seats. Implemented as a conditional transition so it cannot race
    /// the sweeper or a payment confirmation into a double write.
    pub async fn cancel_booking(&self, booking_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let booking = self.get_booking(booking_id).await?;

        if booking.user_id != user_id {
            return Err(CoreError::InvalidRequest(format!(
                "booking {} does not belong to user {}",
                booking_id, user_id
            )));
        }

        if self.bookings.cancel_if_pending(booking_id).await? {
            info!("booking {} cancelled by user {}", booking_id, user_id);
            return Ok(());
        }

        // Lost the race or was never Pending; report the current state.
        let current = self.get_booking(booking_id).await?;
        Err(CoreError::InvalidState {
            expected: BookingState::Pending.as_str().to_string(),
            actual: current.state.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::testutil::seed_session;
    use cinebook_booking::models::BookingState;
    use cinebook_booking::repository::BookingStore;
    use cinebook_booking::service::BookingService;
    use cinebook_catalog::CatalogStore;
    use cinebook_core::CoreError;
    use cinebook_store::memory::InMemoryStore;

    async fn service_with_store() -> (BookingService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let catalog: Arc<dyn CatalogStore> = store.clone();
        let bookings: Arc<dyn BookingStore> = store.clone();
        (BookingService::new(catalog, bookings), store)
    }

    #[tokio::test]
    async fn test_create_booking_prices_seats_by_category() {
        let (service, store) = service_with_store().await;
        // base 1000: one NORMAL (1000) + one VIP (1500)
        let seeded = seed_session(&store, 1000, &["NORMAL", "VIP"]).await;

        let booking = service
            .create_booking(Uuid::new_v4(), seeded.session_id, seeded.seat_ids.clone())
            .await
            .unwrap();

        assert_eq!(booking.state, BookingState::Pending);
        assert_eq!(booking.total_cents, 2500);
    }

    #[tokio::test]
    async fn test_create_booking_unknown_session() {
        let (service, _store) = service_with_store().await;
        let err = service
            .create_booking(Uuid::new_v4(), Uuid::new_v4(), vec![Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "session", .. }));
    }

    #[tokio::test]
    async fn test_create_booking_rejects_empty_and_duplicate_seats() {
        let (service, store) = service_with_store().await;
        let seeded = seed_session(&store, 1000, &["NORMAL"]).await;

        let err = service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));

        let seat = seeded.seat_ids[0];
        let err = service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![seat, seat])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_create_booking_rejects_cross_hall_seat() {
        let (service, store) = service_with_store().await;
        let seeded = seed_session(&store, 1000, &["NORMAL"]).await;
        let other = seed_session(&store, 1000, &["NORMAL"]).await;

        let err = service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![other.seat_ids[0]])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_same_seat_conflicts() {
        let (service, store) = service_with_store().await;
        let seeded = seed_session(&store, 1000, &["NORMAL", "NORMAL"]).await;
        let seat_a1 = seeded.seat_ids[0];
        let seat_a2 = seeded.seat_ids[1];

        service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![seat_a1])
            .await
            .unwrap();

        let err = service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![seat_a1])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SeatsUnavailable(ref seats) if seats == &vec![seat_a1]));

        // A different seat in the same session is still free.
        service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![seat_a2])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creation_keeps_seats_disjoint() {
        let (service, store) = service_with_store().await;
        let seeded = seed_session(&store, 1000, &["NORMAL"]).await;
        let seat = seeded.seat_ids[0];
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            let session_id = seeded.session_id;
            handles.push(tokio::spawn(async move {
                service
                    .create_booking(Uuid::new_v4(), session_id, vec![seat])
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1, "exactly one booking may win the seat");
    }

    #[tokio::test]
    async fn test_cancel_booking() {
        let (service, store) = service_with_store().await;
        let seeded = seed_session(&store, 1000, &["NORMAL"]).await;
        let user = Uuid::new_v4();

        let booking = service
            .create_booking(user, seeded.session_id, seeded.seat_ids.clone())
            .await
            .unwrap();

        // Wrong owner cannot cancel.
        let err = service
            .cancel_booking(booking.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));

        service.cancel_booking(booking.id, user).await.unwrap();
        assert_eq!(
            service.get_booking(booking.id).await.unwrap().state,
            BookingState::Cancelled
        );

        // Cancelled is a sink.
        let err = service.cancel_booking(booking.id, user).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));

        // The seat is free again.
        service
            .create_booking(Uuid::new_v4(), seeded.session_id, seeded.seat_ids)
            .await
            .unwrap();
    }
}
