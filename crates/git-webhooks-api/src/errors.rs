//! Error types for the HTTP service

use crate::config::ServiceConfigError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use git_webhooks_core::DispatchError;
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// | Cause                                   | Status |
/// |-----------------------------------------|--------|
/// | body missing, empty or undecodable      | 400    |
/// | provider not detected or not configured | 412    |
/// | event not in `handle_events`            | 406    |
/// | signature or token rejected             | 401    |
/// | no identifier, or unknown repository    | 404    |
/// | anything unexpected                     | 500    |
///
/// The response body is the status's canonical reason phrase. Details stay in
/// the server log.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// The dispatcher rejected the request.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Unexpected internal server error
    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Dispatch(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Webhook request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Webhook request rejected");
        }
        status_response(status)
    }
}

/// Plain-text response carrying the status's reason phrase.
pub(crate) fn status_response(status: StatusCode) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        status.canonical_reason().unwrap_or("Error"),
    )
        .into_response()
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ServiceConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
