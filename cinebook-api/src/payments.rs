use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cinebook_booking::CheckoutSession;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateCheckoutRequest {
    booking_id: Uuid,
    voucher_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct PaymentStatusResponse {
    provider_payment_id: String,
    status: String,
}

/// Provider webhook envelope, Stripe-style.
#[derive(Debug, Deserialize)]
struct ProviderWebhook {
    #[serde(rename = "type")]
    type_: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: IntentObject,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/checkout", post(create_checkout))
        .route("/v1/webhooks/payments", post(handle_payment_webhook))
        .route("/v1/payments/{provider_id}", get(payment_status))
}

async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CreateCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutSession>), ApiError> {
    let checkout = state
        .payments
        .create_checkout(req.booking_id, req.voucher_id)
        .await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

/// Receive asynchronous payment confirmations from the provider.
/// Idempotent on the intent id: replayed deliveries are acknowledged
/// without touching the store.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<ProviderWebhook>,
) -> Result<StatusCode, ApiError> {
    let intent_id = &payload.data.object.id;
    tracing::info!("payment webhook: {} for intent {}", payload.type_, intent_id);

    match payload.type_.as_str() {
        "payment_intent.succeeded" => {
            state.payments.confirm_payment(intent_id, true).await?;
        }
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            state.payments.confirm_payment(intent_id, false).await?;
        }
        _ => {
            // Event types we do not consume are acknowledged untouched.
        }
    }

    Ok(StatusCode::OK)
}

async fn payment_status(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let status = state.payments.check_status(&provider_id).await?;
    Ok(Json(PaymentStatusResponse {
        provider_payment_id: provider_id,
        status: status.as_str().to_string(),
    }))
}
