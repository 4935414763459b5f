use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;

/// Invoice document renderer, invoked only after a booking reaches Paid.
/// PDF generation itself lives outside this core.
#[async_trait]
pub trait InvoiceRenderer: Send + Sync {
    async fn render(&self, booking_id: Uuid) -> Result<Vec<u8>, CoreError>;
}

/// Placeholder renderer producing a plain-text invoice stub.
pub struct StubInvoiceRenderer;

#[async_trait]
impl InvoiceRenderer for StubInvoiceRenderer {
    async fn render(&self, booking_id: Uuid) -> Result<Vec<u8>, CoreError> {
        Ok(format!("INVOICE {}\n", booking_id).into_bytes())
    }
}
