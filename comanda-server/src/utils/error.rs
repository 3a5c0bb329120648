//! Unified error handling
//!
//! [`AppError`] is the app-level error surfaced by API handlers. Storage
//! failures are kept distinct from business failures so the caller can tell
//! "you asked for something that isn't there" apart from "the displayed data
//! may be stale because the store is unreachable".

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::orders::{SessionError, StorageError};

/// API error response body
///
/// ```json
/// {
///   "code": "E0003",
///   "message": "Order not found: 42"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse {
    pub code: String,
    pub message: String,
}

/// Application error enumeration
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Empty or invalid input; nothing was mutated (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced order, item, or resource does not exist (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists (409)
    #[error("Resource already exists: {0}")]
    Conflict(String),

    /// Underlying store unreachable or transaction aborted (503)
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// Unexpected internal failure (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.clone()),
            AppError::Storage(msg) => {
                error!(target: "storage", error = %msg, "Storage error occurred");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "E9002",
                    "Storage unavailable".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(AppResponse {
            code: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::OrderNotFound(id) => {
                AppError::NotFound(format!("Order not found: {id}"))
            }
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Storage(s) => s.into(),
            SessionError::OrderNotFound(id) => {
                AppError::NotFound(format!("Order not found: {id}"))
            }
            SessionError::ItemNotFound(order_id, item_id) => AppError::NotFound(format!(
                "Item {item_id} not found in order {order_id}"
            )),
            SessionError::OrderClosed(msg) => AppError::Validation(msg),
            SessionError::InvalidOperation(msg) => AppError::Validation(msg),
        }
    }
}
