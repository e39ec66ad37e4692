//! Full-state views pushed to and pulled by devices
//!
//! Devices replace their local state with whichever view they receive; no
//! view is ever a diff.

use super::cart::CartItem;
use super::device::{DeviceSession, DeviceSummary};
use super::group::SynchronizedGroup;
use super::session::TableSession;
use super::table::Table;
use serde::{Deserialize, Serialize};

/// Everything the whole table may see
///
/// Isolated device carts are deliberately absent; they only travel in
/// [`DeviceView`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub table: Table,
    pub session: TableSession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<SynchronizedGroup>,
    pub devices: Vec<DeviceSummary>,
}

/// What one device sees: its membership plus the cart it edits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub session: TableSession,
    pub device: DeviceSession,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<SynchronizedGroup>,
    /// The group's shared cart for `same` members, the device cart otherwise
    pub cart: Vec<CartItem>,
}
