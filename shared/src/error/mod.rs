//! Unified error system
//!
//! - [`ErrorCode`]: numeric codes clients switch on
//! - [`ErrorCategory`]: code ranges, drives log levels
//! - [`AppError`]: code + message + details, the HTTP error type
//! - [`ApiResponse`]: envelope for every response body
//!
//! # Example
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::capacity_exceeded(2);
//! assert_eq!(err.code, ErrorCode::CapacityExceeded);
//!
//! let response: ApiResponse<()> = err.into();
//! assert_eq!(response.code, Some(7006));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult, ErrorDetails};
