use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::CoreError;

/// Fire-and-forget notification dispatcher (receipts, day-before
/// reminders). A failure here must never roll back a booking or payment
/// transition, so callers log and drop the error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, template: &str, payload: Value)
        -> Result<(), CoreError>;
}

/// Default dispatcher for environments without a delivery channel.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        template: &str,
        _payload: Value,
    ) -> Result<(), CoreError> {
        tracing::debug!("notification skipped: user={} template={}", user_id, template);
        Ok(())
    }
}
