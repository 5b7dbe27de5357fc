//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::money::format_cents;

/// Application-wide error type.
///
/// Every fallible operation in the service returns this enum. Business-rule
/// failures (validation, not-found, conflicts, insufficient funds) are
/// produced before or inside the atomic database unit and abort it wholly;
/// only unexpected storage failures surface as opaque 500s.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token is missing, malformed, expired, or has a bad signature.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authenticated identity is not allowed to perform this action
    /// (e.g., a non-admin or the original requester reviewing an override).
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced fund account does not exist.
    #[error("Fund account not found")]
    AccountNotFound,

    /// Referenced transaction does not exist.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// Referenced user does not exist.
    #[error("User not found")]
    UserNotFound,

    /// Referenced override request does not exist.
    #[error("Override request not found")]
    OverrideNotFound,

    /// Override request was already approved or rejected by another reviewer.
    ///
    /// This is the expected outcome of the two-reviewer race, reported
    /// distinctly from not-found. Returns HTTP 409 Conflict.
    #[error("Override request already processed")]
    OverrideAlreadyProcessed,

    /// Fund account code is already taken.
    #[error("Fund code already exists. Please use a different code")]
    DuplicateCode,

    /// Fund account exists but has been deactivated.
    #[error("Fund account is inactive")]
    InactiveAccount,

    /// Account balance cannot cover the requested disbursement.
    ///
    /// Carries the available balance so operators can see how short the
    /// account is. Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient funds. Available balance: {}", format_cents(*.available_cents))]
    InsufficientFunds { available_cents: i64 },

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request with details about what was invalid.
    #[error("{0}")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "invalid_token", self.to_string())
            }
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::AccountNotFound => {
                (StatusCode::NOT_FOUND, "account_not_found", self.to_string())
            }
            AppError::TransactionNotFound => (
                StatusCode::NOT_FOUND,
                "transaction_not_found",
                self.to_string(),
            ),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", self.to_string()),
            AppError::OverrideNotFound => {
                (StatusCode::NOT_FOUND, "override_not_found", self.to_string())
            }
            AppError::OverrideAlreadyProcessed => {
                (StatusCode::CONFLICT, "already_processed", self.to_string())
            }
            AppError::DuplicateCode => {
                (StatusCode::BAD_REQUEST, "duplicate_code", self.to_string())
            }
            AppError::InactiveAccount => {
                (StatusCode::BAD_REQUEST, "inactive_account", self.to_string())
            }
            AppError::InsufficientFunds { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_message_includes_available_balance() {
        let err = AppError::InsufficientFunds {
            available_cents: 12_345,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds. Available balance: 123.45"
        );
    }

    #[test]
    fn already_processed_is_distinct_from_not_found() {
        let conflict = AppError::OverrideAlreadyProcessed.into_response();
        let missing = AppError::OverrideNotFound.into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
