//! Device session - one device's membership in a table session

use super::cart::CartItem;
use super::guests::GuestCounts;
use serde::{Deserialize, Serialize};

/// How a device shares the table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Isolated cart on a shared table
    #[default]
    Different,
    /// Member of the table's synchronized group
    Same,
}

/// Items sent to the kitchen from one cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: String,
    /// Device that submitted the order
    pub device_id: String,
    pub items: Vec<CartItem>,
    pub placed_at: i64,
}

impl PlacedOrder {
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

/// Device membership record. Never reused across table sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSession {
    pub session_id: String,
    /// The table session this membership belongs to
    pub table_session_id: String,
    pub table_id: String,
    pub device_id: String,
    pub group_type: GroupType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// This device's own contribution
    pub guest_counts: GuestCounts,
    /// Isolated cart (unused while the device is in a group)
    pub cart: Vec<CartItem>,
    pub orders: Vec<PlacedOrder>,
    pub is_active: bool,
    pub waiter_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter_name: Option<String>,
    pub joined_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<i64>,
}

/// Cart-free view of a device, safe to broadcast to the whole table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub device_id: String,
    pub group_type: GroupType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub guest_counts: GuestCounts,
    pub is_active: bool,
}

impl From<&DeviceSession> for DeviceSummary {
    fn from(device: &DeviceSession) -> Self {
        Self {
            device_id: device.device_id.clone(),
            group_type: device.group_type,
            group_id: device.group_id.clone(),
            guest_counts: device.guest_counts,
            is_active: device.is_active,
        }
    }
}
