//! Synchronized group - devices sharing one cart, order list and timer

use super::cart::CartItem;
use super::device::PlacedOrder;
use super::guests::GuestCounts;
use serde::{Deserialize, Serialize};

/// Shared dining timer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimer {
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Remaining time in milliseconds
    pub remaining_time: i64,
}

/// Synchronized group. Inactive is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizedGroup {
    pub group_id: String,
    pub table_id: String,
    pub master_device_id: String,
    /// Member devices in join order, no duplicates
    pub devices: Vec<String>,
    pub shared_cart: Vec<CartItem>,
    pub shared_orders: Vec<PlacedOrder>,
    pub session_timer: SessionTimer,
    /// Aggregate of member contributions
    pub guest_counts: GuestCounts,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SynchronizedGroup {
    pub fn has_device(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d == device_id)
    }
}
