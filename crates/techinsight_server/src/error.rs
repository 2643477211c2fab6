//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use techinsight_core::SyncError;

/// Failure surfaced to HTTP clients as `500` with a plain-text body.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.message).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(value: SyncError) -> Self {
        error!(
            "event=http_request module=server status=error error={}",
            value
        );
        Self::internal(value.to_string())
    }
}
