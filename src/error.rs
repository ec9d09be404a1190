//! Error types for ghgate
//!
//! All request-time failures are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Every provider call site in the auth controller maps its outcome
/// into one of these variants, so no provider failure escapes as an
/// unhandled error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Callback reached without an authorization code (400)
    #[error("No code provided by GitHub")]
    MissingCode,

    /// The provider refused the code exchange (400)
    ///
    /// Carries the provider's human-readable description.
    #[error("{0}")]
    ProviderRejection(String),

    /// No token in the cookie or the fallback store (401)
    #[error("Not authenticated. Please login first.")]
    Unauthenticated,

    /// The provider rejected the stored token (401)
    ///
    /// Distinct from `Unauthenticated`: the controller clears the session
    /// before returning it.
    #[error("Token expired. Please login again.")]
    TokenExpired,

    /// Transport failure or unexpected provider reply (500)
    #[error("{0}")]
    Upstream(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCode | AppError::ProviderRejection(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::MissingCode => "missing_code",
            AppError::ProviderRejection(_) => "provider_rejection",
            AppError::Unauthenticated => "unauthenticated",
            AppError::TokenExpired => "token_expired",
            AppError::Upstream(_) => "upstream",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to its HTTP status code and a
    /// JSON `{"error": ...}` body.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status();
        let error_message = match &self {
            AppError::Config(_) | AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.error_type()]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
