//! Unified error codes for table session services
//!
//! Codes are grouped by range:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 7xxx: Table / session errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients in any language
/// can switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ----- 0xxx 通用 -----
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,

    // ----- 1xxx 服务员 PIN -----
    /// Waiter PIN was rejected for a shared-group join
    WaiterPinRejected = 1008,

    // ----- 7xxx 桌台 / 会话 / 同组 -----
    /// Table not found
    TableNotFound = 7001,
    /// No active session on the table
    SessionNotFound = 7004,
    /// An active session already exists on the table
    SessionAlreadyActive = 7005,
    /// Joining adults would exceed the table capacity
    CapacityExceeded = 7006,
    /// Device has no active membership in the session
    DeviceNotFound = 7007,
    /// No active synchronized group on the table
    GroupNotFound = 7008,

    // ----- 9xxx 系统 -----
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default English message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "OK",
            ErrorCode::ValidationFailed => "Validation failed",

            ErrorCode::WaiterPinRejected => "Waiter PIN rejected",

            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::SessionNotFound => "No active session for table",
            ErrorCode::SessionAlreadyActive => "Table already has an active session",
            ErrorCode::CapacityExceeded => "Table capacity exceeded",
            ErrorCode::DeviceNotFound => "Device is not part of the session",
            ErrorCode::GroupNotFound => "No active group for table",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

/// Unknown numeric code on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code {0}")]
pub struct InvalidErrorCode(pub u16);

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),

            // Auth
            1008 => Ok(ErrorCode::WaiterPinRejected),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7004 => Ok(ErrorCode::SessionNotFound),
            7005 => Ok(ErrorCode::SessionAlreadyActive),
            7006 => Ok(ErrorCode::CapacityExceeded),
            7007 => Ok(ErrorCode::DeviceNotFound),
            7008 => Ok(ErrorCode::GroupNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
