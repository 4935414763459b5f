use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cinebook_booking::models::{Booking, BookingState};
use cinebook_core::CoreError;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    user_id: Uuid,
    session_id: Uuid,
    seat_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    session_id: Uuid,
    seat_ids: Vec<Uuid>,
    total_cents: i64,
    state: BookingState,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.id,
            session_id: b.session_id,
            seat_ids: b.seat_ids,
            total_cents: b.total_cents,
            state: b.state,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    user_id: Uuid,
    rating: i16,
    comment: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReviewResponse {
    review_id: Uuid,
    booking_id: Uuid,
    rating: i16,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/reviews", post(leave_review))
        .route("/v1/bookings/{id}/invoice", get(get_invoice))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let booking = state
        .bookings
        .create_booking(req.user_id, req.session_id, req.seat_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.bookings.get_booking(booking_id).await?;
    Ok(Json(booking.into()))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    state.bookings.cancel_booking(booking_id, req.user_id).await?;
    let booking = state.bookings.get_booking(booking_id).await?;
    Ok(Json(booking.into()))
}

async fn leave_review(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review = state
        .reviews
        .leave_review(booking_id, req.user_id, req.rating, req.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            review_id: review.id,
            booking_id: review.booking_id,
            rating: review.rating,
        }),
    ))
}

/// Invoices exist only for Paid bookings.
async fn get_invoice(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.bookings.get_booking(booking_id).await?;
    if booking.state != BookingState::Paid {
        return Err(CoreError::InvalidState {
            expected: BookingState::Paid.as_str().to_string(),
            actual: booking.state.as_str().to_string(),
        }
        .into());
    }

    let document = state.invoices.render(booking_id).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        document,
    ))
}
