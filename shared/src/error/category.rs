//! 错误分类 (按错误码区间)

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error code range
///
/// `IntoResponse` uses it to decide the log level: system errors are logged
/// as errors, rejected PINs as warnings, the rest not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx, bad input
    General,
    /// 1xxx, waiter PIN
    Auth,
    /// 7xxx, table / session / group state
    Table,
    /// 9xxx and anything unclassified
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            7000..8000 => Self::Table,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(ErrorCategory::from_code(2), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1008), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(7999), ErrorCategory::Table);
        assert_eq!(ErrorCategory::from_code(4242), ErrorCategory::System);
    }

    #[test]
    fn test_every_table_code_is_table_category() {
        for code in [
            ErrorCode::TableNotFound,
            ErrorCode::SessionNotFound,
            ErrorCode::SessionAlreadyActive,
            ErrorCode::CapacityExceeded,
            ErrorCode::DeviceNotFound,
            ErrorCode::GroupNotFound,
        ] {
            assert_eq!(code.category(), ErrorCategory::Table, "{:?}", code);
        }
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }
}
