use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use cinebook_catalog::models::{Hall, Movie, Seat, SeatCategory, Session};
use cinebook_store::memory::InMemoryStore;

pub struct SeededSession {
    pub session_id: Uuid,
    pub hall_id: Uuid,
    pub seat_ids: Vec<Uuid>,
}

/// Seed a hall with one seat per category label and a session in it.
pub async fn seed_session(
    store: &Arc<InMemoryStore>,
    base_price_cents: i64,
    categories: &[&str],
) -> SeededSession {
    let hall = Hall {
        id: Uuid::new_v4(),
        name: "Hall 1".to_string(),
    };
    let movie = Movie {
        id: Uuid::new_v4(),
        title: "The Grand Feature".to_string(),
    };

    let mut seat_ids = Vec::new();
    let mut seats = Vec::new();
    for (i, label) in categories.iter().enumerate() {
        let seat = Seat {
            id: Uuid::new_v4(),
            hall_id: hall.id,
            seat_number: format!("A{}", i + 1),
            category: SeatCategory::parse(label).expect("bad category label in test seed"),
        };
        seat_ids.push(seat.id);
        seats.push(seat);
    }

    let session = Session {
        id: Uuid::new_v4(),
        movie_id: movie.id,
        hall_id: hall.id,
        starts_at: Utc::now() + Duration::days(1),
        ends_at: Utc::now() + Duration::days(1) + Duration::hours(2),
        base_price_cents,
    };

    let session_id = session.id;
    let hall_id = hall.id;
    store.seed_hall(hall).await;
    store.seed_movie(movie).await;
    for seat in seats {
        store.seed_seat(seat).await;
    }
    store.seed_session(session).await;

    SeededSession {
        session_id,
        hall_id,
        seat_ids,
    }
}
