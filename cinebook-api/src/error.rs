use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use cinebook_core::CoreError;

#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    Internal(anyhow::Error),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Core(err) => {
                let status = match &err {
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::InvalidRequest(_) | CoreError::VoucherInvalid(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    // Seat conflicts and lifecycle violations are both 409,
                    // told apart by the code field.
                    CoreError::SeatsUnavailable(_) | CoreError::InvalidState { .. } => {
                        StatusCode::CONFLICT
                    }
                    CoreError::Store { .. } => {
                        tracing::error!("store failure: {}", err);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    CoreError::Provider(_) => {
                        tracing::error!("payment provider failure: {}", err);
                        StatusCode::BAD_GATEWAY
                    }
                };
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    "Internal Server Error".to_string()
                } else {
                    err.to_string()
                };
                (status, err.code(), message)
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "code": code,
            "error": message,
        }));

        (status, body).into_response()
    }
}
