//! The error taxonomy (spec.md §7): one enum, one HTTP mapping.
//!
//! Uses `thiserror` wherever an error type needs to cross a module
//! boundary with variant-specific context, extended here with an
//! [`axum::response::IntoResponse`] impl since this crate's outer boundary
//! is HTTP rather than a terminal UI.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Whether `AppError::Internal` responses include the underlying cause
/// (spec.md §6.3 `VERBOSE_ERRORS`). Set once at startup from
/// [`crate::config::AppConfig`]; defaults to `false` so a config-less
/// test run never leaks internals.
static VERBOSE_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn set_verbose_errors(verbose: bool) {
    VERBOSE_ERRORS.store(verbose, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("business rule violated: {0}")]
    BusinessRule(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = %status, "request failed");
        let message = match &self {
            AppError::Internal(_) if !VERBOSE_ERRORS.load(Ordering::Relaxed) => {
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({
            "ok": false,
            "error": message,
        }));
        (status, body).into_response()
    }
}
