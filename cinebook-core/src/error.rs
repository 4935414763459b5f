use uuid::Uuid;

/// Error taxonomy shared by services and stores.
///
/// Callers need to tell a seat conflict apart from a missing session, so the
/// concurrency failure (`SeatsUnavailable`) and the lifecycle failure
/// (`InvalidState`) are distinct variants rather than generic 4xx strings.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// One or more requested seats are held by a Pending or Paid booking.
    #[error("seats unavailable: {0:?}")]
    SeatsUnavailable(Vec<Uuid>),

    #[error("invalid state: expected {expected}, booking is {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("voucher rejected: {0}")]
    VoucherInvalid(String),

    /// Underlying store failure, wrapped with the operation and entity id
    /// so the failing write can be diagnosed from the log line alone.
    #[error("store failure in {op} ({entity} {id}): {detail}")]
    Store {
        op: &'static str,
        entity: &'static str,
        id: String,
        detail: String,
    },

    #[error("payment provider failure: {0}")]
    Provider(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn store(
        op: &'static str,
        entity: &'static str,
        id: impl ToString,
        detail: impl ToString,
    ) -> Self {
        CoreError::Store {
            op,
            entity,
            id: id.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Stable machine-readable kind, exposed to API clients next to the
    /// human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::InvalidRequest(_) => "INVALID_REQUEST",
            CoreError::SeatsUnavailable(_) => "SEAT_UNAVAILABLE",
            CoreError::InvalidState { .. } => "INVALID_STATE",
            CoreError::VoucherInvalid(_) => "VOUCHER_INVALID",
            CoreError::Store { .. } => "STORE_FAILURE",
            CoreError::Provider(_) => "PROVIDER_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let conflict = CoreError::SeatsUnavailable(vec![Uuid::new_v4()]);
        assert_eq!(conflict.code(), "SEAT_UNAVAILABLE");

        let missing = CoreError::not_found("session", Uuid::new_v4());
        assert_eq!(missing.code(), "NOT_FOUND");
        assert!(missing.to_string().contains("session not found"));
    }

    #[test]
    fn test_store_error_carries_context() {
        let err = CoreError::store("create_booking", "booking", "b-1", "connection reset");
        let msg = err.to_string();
        assert!(msg.contains("create_booking"));
        assert!(msg.contains("b-1"));
    }
}
