//! Mapping of domain errors to HTTP responses.

use crate::error::SessionError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

const REJECTED: &str = "invalid refresh request";

/// Error returned by handlers.
///
/// Every refresh rejection renders the same status and body so clients
/// cannot tell an unknown, expired, reused or mismatched token apart.
#[derive(Debug)]
pub enum ApiError {
    /// Identity is unknown or not a UUID
    UnknownIdentity,
    /// Refresh request rejected for any reason
    Rejected,
    /// Store or internal failure
    Unavailable,
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => Self::UnknownIdentity,
            e if e.is_rejection() => Self::Rejected,
            e => {
                tracing::error!(code = e.code(), error = %e, "request failed");
                Self::Unavailable
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::UnknownIdentity => (StatusCode::NOT_FOUND, "user not found"),
            Self::Rejected => (StatusCode::BAD_REQUEST, REJECTED),
            Self::Unavailable => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
