//! Table session domain types
//!
//! - [`Table`]: capacity and occupancy
//! - [`TableSession`]: the one active session per table
//! - [`DeviceSession`]: per-device membership
//! - [`SynchronizedGroup`]: devices sharing a cart
//! - [`SessionRequest`]: tagged, validated state-change requests

pub mod cart;
pub mod device;
pub mod group;
pub mod guests;
pub mod request;
pub mod session;
pub mod snapshot;
pub mod table;

pub use cart::{CartItem, CartItemInput, CartMutation};
pub use device::{DeviceSession, DeviceSummary, GroupType, PlacedOrder};
pub use group::{SessionTimer, SynchronizedGroup};
pub use guests::GuestCounts;
pub use request::{
    CreateSession, EndSession, JoinSession, LeaveSession, MutateCart, PatchSession,
    SessionRequest, SubmitOrder, UpdateCart, UpdateTimer, describe_validation_errors,
};
pub use session::{EndReason, SessionStatus, TableSession};
pub use snapshot::{DeviceView, TableSnapshot};
pub use table::{Table, TableStatus, TableStatusUpdate, TableUpsert};
