use std::sync::Arc;

use uuid::Uuid;

use cinebook_catalog::{pricing, CatalogStore, Seat};
use cinebook_core::CoreError;

use crate::repository::BookingStore;

/// Read-side availability: hall seats minus seats held by non-terminal
/// bookings for the session.
///
/// This is a best-effort snapshot, not a reservation; the authoritative
/// conflict check happens inside [`BookingStore::create_booking`].
pub struct AvailabilityService {
    catalog: Arc<dyn CatalogStore>,
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityService {
    pub fn new(catalog: Arc<dyn CatalogStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self { catalog, bookings }
    }

    /// Seats of the session's hall not currently held. Safe to call
    /// concurrently with booking creation.
    pub async fn available_seats(&self, session_id: Uuid) -> Result<Vec<Seat>, CoreError> {
        let session = self
            .catalog
            .get_session(session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("session", session_id))?;

        let all = self.catalog.seats_in_hall(session.hall_id).await?;
        let held = self.bookings.held_seats(session_id).await?;

        Ok(all.into_iter().filter(|s| !held.contains(&s.id)).collect())
    }

    /// Available seats together with their price, as served to clients
    /// picking seats.
    pub async fn available_seats_priced(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<(Seat, i64)>, CoreError> {
        let session = self
            .catalog
            .get_session(session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("session", session_id))?;

        let all = self.catalog.seats_in_hall(session.hall_id).await?;
        let held = self.bookings.held_seats(session_id).await?;

        Ok(all
            .into_iter()
            .filter(|s| !held.contains(&s.id))
            .map(|s| {
                let price = pricing::seat_price_cents(session.base_price_cents, s.category);
                (s, price)
            })
            .collect())
    }

    /// Session base price times the seat-category factor, in cents.
    pub async fn seat_price(&self, seat_id: Uuid, session_id: Uuid) -> Result<i64, CoreError> {
        let session = self
            .catalog
            .get_session(session_id)
            .await?
            .ok_or_else(|| CoreError::not_found("session", session_id))?;
        let seat = self
            .catalog
            .get_seat(seat_id)
            .await?
            .ok_or_else(|| CoreError::not_found("seat", seat_id))?;

        if seat.hall_id != session.hall_id {
            return Err(CoreError::InvalidRequest(format!(
                "seat {} does not belong to the hall of session {}",
                seat_id, session_id
            )));
        }

        Ok(pricing::seat_price_cents(
            session.base_price_cents,
            seat.category,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::testutil::seed_session;
    use cinebook_booking::availability::AvailabilityService;
    use cinebook_core::CoreError;
    use cinebook_store::memory::InMemoryStore;

    fn service(store: &Arc<InMemoryStore>) -> AvailabilityService {
        AvailabilityService::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_seat_price_uses_session_base_and_category() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_session(&store, 1000, &["NORMAL", "REDUCED", "VIP"]).await;
        let availability = service(&store);

        let prices = [1000, 1250, 1500];
        for (seat_id, expected) in seeded.seat_ids.iter().zip(prices) {
            let price = availability
                .seat_price(*seat_id, seeded.session_id)
                .await
                .unwrap();
            assert_eq!(price, expected);
        }
    }

    #[tokio::test]
    async fn test_seat_price_rejects_foreign_seat() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_session(&store, 1000, &["NORMAL"]).await;
        let other = seed_session(&store, 2000, &["NORMAL"]).await;
        let availability = service(&store);

        let err = availability
            .seat_price(other.seat_ids[0], seeded.session_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));

        let err = availability
            .seat_price(Uuid::new_v4(), seeded.session_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "seat", .. }));
    }
}
