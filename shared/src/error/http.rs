//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::TableNotFound
            | Self::SessionNotFound
            | Self::DeviceNotFound
            | Self::GroupNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::SessionAlreadyActive | Self::CapacityExceeded => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::WaiterPinRejected => StatusCode::UNAUTHORIZED,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
        }
    }
}
