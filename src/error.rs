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

use crate::models::money::{Paise, format_paise};

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid API keys or webhook signatures
/// - **Authorization Errors**: Valid key, wrong role
/// - **Resource Errors**: Requested resources not found
/// - **Business Logic Errors**: Operations that violate ledger rules
/// - **Validation Errors**: Invalid request data
///
/// Idempotent re-processing is deliberately NOT an error: re-delivering a
/// webhook or repeating an identical decision returns success with no side
/// effects.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Webhook signature is missing or does not verify.
    ///
    /// Returns HTTP 401 Unauthorized before the payload is even parsed.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Authenticated user lacks the role the endpoint requires.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Admin access required")]
    Forbidden,

    /// No wallet exists for the targeted user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Application does not exist or doesn't belong to the authenticated user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Application not found")]
    ApplicationNotFound,

    /// Scheme does not exist or is inactive.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Scheme not found")]
    SchemeNotFound,

    /// No payment order matches the webhook's order id.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Payment order not found")]
    PaymentOrderNotFound,

    /// Referenced user does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("User not found")]
    UserNotFound,

    /// Wallet balance cannot cover the requested debit.
    ///
    /// Returns HTTP 400 Bad Request. Both amounts are formatted into the
    /// message so clients can show the shortfall without extra lookups.
    #[error(
        "Insufficient balance: required {}, available {}",
        format_paise(*required_paise),
        format_paise(*available_paise)
    )]
    InsufficientBalance {
        required_paise: Paise,
        available_paise: Paise,
    },

    /// A state-machine write was attempted out of order.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidTransition(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("{0}")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": "Human-readable error message"
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidApiKey` / `InvalidSignature` → 401 Unauthorized
/// - `Forbidden` → 403 Forbidden
/// - `*NotFound` → 404 Not Found
/// - `InsufficientBalance` / `InvalidTransition` / `InvalidRequest` → 400 Bad Request
/// - `Database` → 500 Internal Server Error (details logged, hidden from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidApiKey | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::WalletNotFound
            | AppError::ApplicationNotFound
            | AppError::SchemeNotFound
            | AppError::PaymentOrderNotFound
            | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::InsufficientBalance { .. }
            | AppError::InvalidTransition(_)
            | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Never leak database details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_message_names_both_amounts() {
        let err = AppError::InsufficientBalance {
            required_paise: 50_050,
            available_paise: 50_000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: required ₹500.50, available ₹500.00"
        );
    }
}
