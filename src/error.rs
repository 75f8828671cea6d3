//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Message returned when an expense write would push the balance out of range.
pub const BALANCE_OUT_OF_RANGE: &str = "Balance would exceed the allowed range";

/// Message returned to clients for any failure they cannot act on.
pub const GENERIC_SERVER_ERROR: &str = "A server error has occurred";

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed or out-of-range input
/// - **Authentication Errors**: missing, invalid or expired bearer token
/// - **Resource Errors**: requested record does not exist for this user
/// - **Store Errors**: the ledger store failed; details are never sent to
///   the client outside development mode
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request with the message as the error text.
    #[error("{0}")]
    Validation(String),

    /// No `Authorization: Bearer` header was sent.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("No token provided")]
    MissingToken,

    /// The bearer token failed verification (bad signature, expired, wrong
    /// issuer or audience, unknown signing key).
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Requested record does not exist or belongs to another user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    NotFound(&'static str),

    /// Ledger store operation failed.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

/// Malformed JSON bodies are validation failures like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Internal error text attached to 500 responses.
///
/// Never serialized by default; the error-detail middleware copies it into
/// the body when the server runs in development mode.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// { "error": "Human-readable error message" }
/// ```
///
/// # Status Code Mapping
///
/// - `Validation` → 400 Bad Request
/// - `MissingToken` → 401 Unauthorized
/// - `InvalidToken` → 403 Forbidden
/// - `NotFound` → 404 Not Found
/// - `Store(BalanceOutOfRange)` → 400 Bad Request
/// - `Store` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::MissingToken => (StatusCode::UNAUTHORIZED, self.to_string(), None),
            AppError::InvalidToken => (StatusCode::FORBIDDEN, self.to_string(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string(), None),
            AppError::Store(StoreError::BalanceOutOfRange) => (
                StatusCode::BAD_REQUEST,
                BALANCE_OUT_OF_RANGE.to_string(),
                None,
            ),
            AppError::Store(ref err) => {
                tracing::error!(error = %err, "ledger store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_SERVER_ERROR.to_string(),
                    Some(err.to_string()),
                )
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_400_with_message() {
        let response = AppError::validation("Amount cannot be negative").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Amount cannot be negative" })
        );
    }

    #[tokio::test]
    async fn test_auth_errors_split_401_and_403() {
        assert_eq!(
            AppError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidToken.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_balance_out_of_range_is_client_error() {
        let response = AppError::Store(StoreError::BalanceOutOfRange).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<ErrorDetail>().is_none());
        assert_eq!(
            body_json(response).await,
            json!({ "error": BALANCE_OUT_OF_RANGE })
        );
    }

    #[tokio::test]
    async fn test_store_error_hides_details() {
        let err = AppError::Store(StoreError::Database(sqlx::Error::PoolTimedOut));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ErrorDetail>().is_some());
        assert_eq!(
            body_json(response).await,
            json!({ "error": GENERIC_SERVER_ERROR })
        );
    }
}
