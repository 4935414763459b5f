use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use cinebook_catalog::SeatCategory;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct AvailableSeat {
    seat_id: Uuid,
    seat_number: String,
    category: SeatCategory,
    price_cents: i64,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    session_id: Uuid,
    seats: Vec<AvailableSeat>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/sessions/{id}/seats", get(session_seats))
}

/// Best-effort availability snapshot with per-seat prices. The binding
/// conflict check happens at booking creation.
async fn session_seats(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let seats = state
        .availability
        .available_seats_priced(session_id)
        .await?
        .into_iter()
        .map(|(seat, price_cents)| AvailableSeat {
            seat_id: seat.id,
            seat_number: seat.seat_number,
            category: seat.category,
            price_cents,
        })
        .collect();

    Ok(Json(AvailabilityResponse { session_id, seats }))
}
