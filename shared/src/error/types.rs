//! `AppError` and the `ApiResponse` envelope
//!
//! Every handler answers with the same JSON shape:
//!
//! ```json
//! { "code": 0,    "message": "OK", "data": { ... } }
//! { "code": 7006, "message": "...", "details": { "remaining": 2 } }
//! ```

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Structured details attached to an error (`tableId`, `remaining`, ...)
pub type ErrorDetails = HashMap<String, Value>;

/// Error carried to the HTTP boundary
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// 容量不足，`details.remaining` 为剩余成人座位
    pub fn capacity_exceeded(remaining: u32) -> Self {
        Self::with_message(
            ErrorCode::CapacityExceeded,
            format!("Table capacity exceeded, {} seats remaining", remaining),
        )
        .with_detail("remaining", remaining)
    }
}

/// Response envelope shared by success and error bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 0 on success, otherwise an [`ErrorCode`] value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: Some(ErrorCode::Success.code()),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// True when `code` is absent or 0
    pub fn is_success(&self) -> bool {
        matches!(self.code, None | Some(0))
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

// ===== Axum =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.http_status();
        match self.code.category() {
            ErrorCategory::System => {
                tracing::error!(code = %self.code, message = %self.message, "System error")
            }
            ErrorCategory::Auth => {
                tracing::warn!(code = %self.code, message = %self.message, "Request rejected")
            }
            _ => {}
        }
        (status, axum::Json(ApiResponse::<()>::from(self))).into_response()
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.map(ErrorCode::try_from) {
            None | Some(Ok(ErrorCode::Success)) => StatusCode::OK,
            Some(Ok(code)) => code.http_status(),
            Some(Err(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, axum::Json(self)).into_response()
    }
}
