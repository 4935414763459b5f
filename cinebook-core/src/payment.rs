use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Failed,
}

/// Provider-side payment intent, as returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's ID (e.g., pi_123)
    pub id: String,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: IntentStatus,
    pub client_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outbound payment gateway. The real implementation talks to the
/// provider's API; tests use the mock provider in the booking crate.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a payment intent with the provider. Settlement arrives
    /// asynchronously through the webhook, never by polling.
    async fn create_intent(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, CoreError>;
}
