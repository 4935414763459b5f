use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use cinebook_core::CoreError;

use crate::repository::BookingStore;

/// Result of one sweep pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub scanned: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Releases seats held by bookings that were never paid within the hold
/// deadline.
///
/// Each expiration is a conditional transition ("to Expired only if still
/// Pending"), so a sweep racing a payment confirmation, or two sweep
/// ticks racing each other, degrades to a no-op on the losing side. One
/// booking's failure never aborts the rest of the pass.
pub struct ExpirationSweeper {
    store: Arc<dyn BookingStore>,
    hold_deadline: Duration,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<dyn BookingStore>, hold_deadline: Duration) -> Self {
        Self {
            store,
            hold_deadline,
        }
    }

    /// One scan-and-expire pass over stale Pending bookings.
    pub async fn run_once(&self) -> Result<SweepOutcome, CoreError> {
        let cutoff = Utc::now() - self.hold_deadline;
        let stale: Vec<Uuid> = self.store.stale_pending(cutoff).await?;

        let mut outcome = SweepOutcome {
            scanned: stale.len(),
            ..Default::default()
        };

        for booking_id in stale {
            match self.store.expire_if_pending(booking_id).await {
                Ok(true) => {
                    info!("booking {} expired, seats released", booking_id);
                    outcome.expired += 1;
                }
                Ok(false) => {
                    // Settled or swept concurrently between scan and update.
                }
                Err(e) => {
                    warn!("failed to expire booking {}: {}", booking_id, e);
                    outcome.failed += 1;
                }
            }
        }

        if outcome.expired > 0 || outcome.failed > 0 {
            info!(
                "sweep done: scanned={} expired={} failed={}",
                outcome.scanned, outcome.expired, outcome.failed
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use uuid::Uuid;

    use crate::testutil::seed_session;
    use cinebook_booking::availability::AvailabilityService;
    use cinebook_booking::models::BookingState;
    use cinebook_booking::repository::BookingStore;
    use cinebook_booking::service::BookingService;
    use cinebook_booking::sweeper::{ExpirationSweeper, SweepOutcome};
    use cinebook_catalog::CatalogStore;
    use cinebook_store::memory::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: BookingService,
        availability: AvailabilityService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let catalog: Arc<dyn CatalogStore> = store.clone();
        let bookings: Arc<dyn BookingStore> = store.clone();
        Fixture {
            service: BookingService::new(catalog.clone(), bookings.clone()),
            availability: AvailabilityService::new(catalog, bookings),
            store,
        }
    }

    #[tokio::test]
    async fn test_sweep_expires_stale_pending_and_frees_seats() {
        let fx = fixture();
        let seeded = seed_session(&fx.store, 1000, &["NORMAL", "NORMAL"]).await;
        let seat_a1 = seeded.seat_ids[0];

        let booking = fx
            .service
            .create_booking(Uuid::new_v4(), seeded.session_id, vec![seat_a1])
            .await
            .unwrap();

        assert_eq!(
            fx.availability
                .available_seats(seeded.session_id)
                .await
                .unwrap()
                .len(),
            1
        );

        // Zero deadline: everything Pending is already stale.
        let sweeper = ExpirationSweeper::new(fx.store.clone(), Duration::zero());
        let outcome = sweeper.run_once().await.unwrap();
        assert_eq!(outcome.expired, 1);
        assert_eq!(outcome.failed, 0);

        assert_eq!(
            fx.service.get_booking(booking.id).await.unwrap().state,
            BookingState::Expired
        );
        // A1 reappears in availability.
        let free = fx
            .availability
            .available_seats(seeded.session_id)
            .await
            .unwrap();
        assert!(free.iter().any(|s| s.id == seat_a1));
        assert_eq!(free.len(), 2);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let fx = fixture();
        let seeded = seed_session(&fx.store, 1000, &["NORMAL"]).await;
        fx.service
            .create_booking(Uuid::new_v4(), seeded.session_id, seeded.seat_ids)
            .await
            .unwrap();

        let sweeper = ExpirationSweeper::new(fx.store.clone(), Duration::zero());
        let first = sweeper.run_once().await.unwrap();
        assert_eq!(first.expired, 1);

        // Second pass with no new bookings is a no-op.
        let second = sweeper.run_once().await.unwrap();
        assert_eq!(second.expired, 0);
        assert_eq!(second.scanned, 0);
    }

    #[tokio::test]
    async fn test_sweep_leaves_fresh_bookings_alone() {
        let fx = fixture();
        let seeded = seed_session(&fx.store, 1000, &["NORMAL"]).await;
        let booking = fx
            .service
            .create_booking(Uuid::new_v4(), seeded.session_id, seeded.seat_ids)
            .await
            .unwrap();

        let sweeper = ExpirationSweeper::new(fx.store.clone(), Duration::minutes(15));
        let outcome = sweeper.run_once().await.unwrap();
        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(
            fx.service.get_booking(booking.id).await.unwrap().state,
            BookingState::Pending
        );
    }

    #[tokio::test]
    async fn test_conservation_of_seats() {
        let fx = fixture();
        let seeded = seed_session(&fx.store, 1000, &["NORMAL", "VIP", "REDUCED"]).await;

        fx.service
            .create_booking(
                Uuid::new_v4(),
                seeded.session_id,
                vec![seeded.seat_ids[0], seeded.seat_ids[2]],
            )
            .await
            .unwrap();

        // available ∪ held = all hall seats, at any instant.
        let free = fx
            .availability
            .available_seats(seeded.session_id)
            .await
            .unwrap();
        let held = fx.store.held_seats(seeded.session_id).await.unwrap();
        assert_eq!(free.len() + held.len(), seeded.seat_ids.len());
        assert!(free.iter().all(|s| !held.contains(&s.id)));
    }
}
