//! Shared types for the table session service
//!
//! Wire types used by the server and by device clients: table and session
//! models, tagged session requests, bus events and the unified error system.

pub mod error;
pub mod message;
pub mod session;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use message::{RoomEvent, RoomPayload};
