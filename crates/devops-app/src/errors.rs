//! Handler error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! for server-side failures are generic; the actual cause is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

/// Error returned by route handlers.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match self {
            AppError::BadRequest(reason) => ("BAD_REQUEST", reason),
            AppError::NotFound(resource) => ("NOT_FOUND", resource),
            AppError::Internal => ("INTERNAL_ERROR", "An internal error occurred".to_string()),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

/// Convert a caught handler panic into a 500 response.
///
/// Used by the outermost `CatchPanicLayer`. The panic payload is logged and
/// never returned to the client.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else {
        "non-string panic payload"
    };

    tracing::error!(target: "app.handler", panic = %detail, "Handler panicked");
    AppError::Internal.into_response()
}
