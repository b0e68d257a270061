//! Error types for the API layer.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sentinel_core::CommandError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was malformed or out of range.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The instance is no longer running.
    #[error("instance unavailable")]
    Unavailable,

    /// A serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CommandError> for ObserverError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::AnomalyNotFound(id) => Self::NotFound(format!("anomaly {id}")),
            CommandError::NoSelection => Self::Conflict(err.to_string()),
            CommandError::Breach(e) => Self::Conflict(e.to_string()),
            CommandError::InstanceClosed => Self::Unavailable,
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
