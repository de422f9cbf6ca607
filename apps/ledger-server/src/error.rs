//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared_protocol::{ErrorResponse, Identity, ProtocolError};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("No public key published for {0}")]
    NotFound(Identity),

    #[error("A different public key is already published for {0}")]
    KeyConflict(Identity),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Protocol(ProtocolError::MessageTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Protocol(_) => StatusCode::BAD_REQUEST,
            ApiError::KeyConflict(_) => StatusCode::CONFLICT,
        };

        if status != StatusCode::NOT_FOUND {
            warn!("Request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
