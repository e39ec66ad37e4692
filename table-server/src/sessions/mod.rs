//! Table sessions
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | capacity and occupancy per table |
//! | [`manager`] | session lifecycle, the only entry point for changes |
//! | [`devices`] | per-device memberships |
//! | [`groups`] | synchronized (same) groups |
//! | [`cart`] | cart merge rules |
//! | [`storage`] | redb persistence |
//! | [`dispatch`] | hand-off of placed orders |

pub mod cart;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod groups;
pub mod manager;
pub mod registry;
pub mod storage;

pub use dispatch::{OrderSink, TracingOrderSink};
pub use error::{SessionError, SessionResult};
pub use manager::{OrderSubmitted, SessionEnded, SessionManager, SessionOutcome, SessionUpdate};
pub use storage::{SessionStorage, StorageError, StorageStats};
