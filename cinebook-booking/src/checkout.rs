use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use cinebook_catalog::pricing;
use cinebook_core::notify::Notifier;
use cinebook_core::payment::{IntentStatus, PaymentIntent, PaymentProvider};
use cinebook_core::CoreError;

use crate::models::{BookingState, Payment, PaymentState};
use crate::repository::BookingStore;

/// What the client needs to complete payment on the provider's side.
#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    pub payment_id: Uuid,
    pub provider_intent_id: String,
    pub client_secret: String,
    pub amount_cents: i64,
}

/// Opens provider-side checkouts for Pending bookings and reconciles the
/// provider's asynchronous confirmation with the booking lifecycle.
pub struct PaymentOrchestrator {
    store: Arc<dyn BookingStore>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        currency: String,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            currency,
        }
    }

    /// Create a provider payment intent for a Pending booking, applying an
    /// optional voucher discount to the charged amount.
    ///
    /// The voucher is only validated here; consumption happens at
    /// confirmation, inside the settling transaction. A provider failure
    /// leaves the booking Pending and the checkout retryable.
    pub async fn create_checkout(
        &self,
        booking_id: Uuid,
        voucher_id: Option<Uuid>,
    ) -> Result<CheckoutSession, CoreError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", booking_id))?;

        if booking.state != BookingState::Pending {
            return Err(CoreError::InvalidState {
                expected: BookingState::Pending.as_str().to_string(),
                actual: booking.state.as_str().to_string(),
            });
        }

        let mut amount_cents = booking.total_cents;
        if let Some(voucher_id) = voucher_id {
            let voucher = self
                .store
                .get_voucher(voucher_id)
                .await?
                .ok_or_else(|| CoreError::not_found("voucher", voucher_id))?;
            voucher.validate(Utc::now())?;
            amount_cents = pricing::discounted_cents(amount_cents, voucher.discount);
        }

        let intent = self
            .provider
            .create_intent(booking.id, amount_cents, &self.currency)
            .await?;
        let client_secret = intent
            .client_secret
            .clone()
            .ok_or_else(|| CoreError::Provider("intent carries no client secret".to_string()))?;

        let payment = Payment::new(booking.id, intent.id.clone(), amount_cents, voucher_id);
        self.store.upsert_payment(&payment).await?;

        info!(
            "checkout opened: booking={} intent={} amount={}c voucher={:?}",
            booking.id, intent.id, amount_cents, voucher_id
        );
        Ok(CheckoutSession {
            payment_id: payment.id,
            provider_intent_id: intent.id,
            client_secret,
            amount_cents,
        })
    }

    /// Apply a provider-reported outcome to the payment it names.
    ///
    /// Success settles payment, booking and voucher as one atomic unit;
    /// failure marks the payment Failed and leaves the booking Pending
    /// (its seats stay correctly held until paid, cancelled or swept).
    /// Idempotent on the provider id: re-delivered webhooks for a settled
    /// payment return its current status without touching the store.
    pub async fn confirm_payment(
        &self,
        provider_intent_id: &str,
        succeeded: bool,
    ) -> Result<PaymentState, CoreError> {
        let payment = self
            .store
            .payment_by_provider_id(provider_intent_id)
            .await?
            .ok_or_else(|| CoreError::not_found("payment", provider_intent_id))?;

        if payment.status != PaymentState::Pending {
            return Ok(payment.status);
        }

        if succeeded {
            self.store.finalize_paid(provider_intent_id).await?;
            info!(
                "payment {} settled: booking {} is PAID",
                provider_intent_id, payment.booking_id
            );
            self.send_receipt(payment.booking_id, payment.amount_cents)
                .await;
            Ok(PaymentState::Paid)
        } else {
            self.store.mark_payment_failed(provider_intent_id).await?;
            info!(
                "payment {} failed: booking {} stays PENDING",
                provider_intent_id, payment.booking_id
            );
            Ok(PaymentState::Failed)
        }
    }

    /// Pure read of a payment's status by provider id.
    pub async fn check_status(&self, provider_intent_id: &str) -> Result<PaymentState, CoreError> {
        let payment = self
            .store
            .payment_by_provider_id(provider_intent_id)
            .await?
            .ok_or_else(|| CoreError::not_found("payment", provider_intent_id))?;
        Ok(payment.status)
    }

    /// Fire-and-forget receipt. A dispatch failure must never roll back
    /// the settled payment, so it is logged and dropped.
    async fn send_receipt(&self, booking_id: Uuid, amount_cents: i64) {
        let booking = match self.store.get_booking(booking_id).await {
            Ok(Some(b)) => b,
            Ok(None) => return,
            Err(e) => {
                warn!("receipt lookup failed for booking {}: {}", booking_id, e);
                return;
            }
        };
        let payload = serde_json::json!({
            "booking_id": booking_id,
            "amount_cents": amount_cents,
        });
        if let Err(e) = self
            .notifier
            .notify(booking.user_id, "payment_receipt", payload)
            .await
        {
            warn!("receipt notification failed for booking {}: {}", booking_id, e);
        }
    }
}

/// Provider stub for tests and local runs, modeled on a Stripe-style
/// intent API.
pub struct MockPaymentProvider;

#[async_trait::async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_intent(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, CoreError> {
        let id = format!("mock_pi_{}", Uuid::new_v4().simple());
        Ok(PaymentIntent {
            client_secret: Some(format!("{}_secret", id)),
            id,
            booking_id,
            amount_cents,
            currency: currency.to_string(),
            status: IntentStatus::RequiresPaymentMethod,
            created_at: Utc::now(),
        })
    }
}
