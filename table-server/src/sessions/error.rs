use super::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::session::describe_validation_errors;
use thiserror::Error;
use validator::ValidationErrors;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("No active session for table: {0}")]
    SessionNotFound(String),

    #[error("Device {device_id} has no session at table {table_id}")]
    DeviceNotFound { table_id: String, device_id: String },

    #[error("No active group for table: {0}")]
    GroupNotFound(String),

    #[error("Table already has an active session: {0}")]
    Conflict(String),

    #[error("Table capacity exceeded, {remaining} seats remaining")]
    CapacityExceeded { remaining: u32 },

    #[error("Waiter PIN rejected")]
    Unauthorized,
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SessionError::Validation(msg.into())
    }
}

impl From<ValidationErrors> for SessionError {
    fn from(errors: ValidationErrors) -> Self {
        SessionError::Validation(describe_validation_errors(&errors))
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Storage(e) => {
                tracing::error!(error = %e, "Session storage error");
                AppError::database(e.to_string())
            }
            SessionError::Validation(msg) => AppError::validation(msg),
            SessionError::TableNotFound(id) => {
                AppError::with_message(ErrorCode::TableNotFound, format!("Table {} not found", id))
                    .with_detail("tableId", id)
            }
            SessionError::SessionNotFound(id) => AppError::with_message(
                ErrorCode::SessionNotFound,
                format!("No active session for table {}", id),
            )
            .with_detail("tableId", id),
            e @ SessionError::DeviceNotFound { .. } => {
                AppError::with_message(ErrorCode::DeviceNotFound, e.to_string())
            }
            SessionError::GroupNotFound(id) => AppError::with_message(
                ErrorCode::GroupNotFound,
                format!("No active group for table {}", id),
            )
            .with_detail("tableId", id),
            SessionError::Conflict(id) => AppError::with_message(
                ErrorCode::SessionAlreadyActive,
                format!("Table {} already has an active session", id),
            )
            .with_detail("tableId", id),
            SessionError::CapacityExceeded { remaining } => AppError::capacity_exceeded(remaining),
            SessionError::Unauthorized => AppError::new(ErrorCode::WaiterPinRejected),
        }
    }
}
