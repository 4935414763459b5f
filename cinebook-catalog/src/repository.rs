use async_trait::async_trait;
use uuid::Uuid;

use cinebook_core::CoreError;

use crate::models::{Seat, Session};

/// Read access to the seat inventory and schedule. Read-heavy, rarely
/// mutated; administrative edits are out of scope for this core.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, CoreError>;

    async fn get_seat(&self, id: Uuid) -> Result<Option<Seat>, CoreError>;

    /// All seats of a hall, ordered by seat number.
    async fn seats_in_hall(&self, hall_id: Uuid) -> Result<Vec<Seat>, CoreError>;
}
