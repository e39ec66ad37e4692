//! 消息总线消息类型定义
//!
//! Events fanned out by the server to devices. Every event is scoped by a
//! room key:
//!
//! | Room | Audience | Payload |
//! |------|----------|---------|
//! | `table-{tableId}` | every device at the table | [`TableSnapshot`] or `null` |
//! | `device-{deviceId}` | one device | [`DeviceView`] or `null` |
//! | `tables` | table list screens | [`TablesChanged`] |
//!
//! Delivery is at-least-once and may skip events for slow subscribers.
//! `version` increases per room so clients can drop stale snapshots.

use crate::session::{DeviceView, TableSnapshot, TableStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Room for table list / availability displays
pub const GLOBAL_ROOM: &str = "tables";

/// Room key for everything scoped to one table
pub fn table_room(table_id: &str) -> String {
    format!("table-{}", table_id)
}

/// Room key for one device's private view
pub fn device_room(device_id: &str) -> String {
    format!("device-{}", device_id)
}

/// Coarse "tables list changed" notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TablesChanged {
    pub table_id: String,
    pub status: TableStatus,
    pub current_guests: u32,
}

/// Event body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum RoomPayload {
    /// `None` means the session was cleared (paid or ended)
    SessionUpdate(Option<Box<TableSnapshot>>),
    /// `None` means the device no longer has a membership
    DeviceUpdate(Option<Box<DeviceView>>),
    TablesChanged(TablesChanged),
}

impl RoomPayload {
    pub fn kind(&self) -> RoomEventKind {
        match self {
            RoomPayload::SessionUpdate(_) => RoomEventKind::SessionUpdate,
            RoomPayload::DeviceUpdate(_) => RoomEventKind::DeviceUpdate,
            RoomPayload::TablesChanged(_) => RoomEventKind::TablesChanged,
        }
    }

    /// True for the `null` "session cleared" payload
    pub fn is_cleared(&self) -> bool {
        matches!(
            self,
            RoomPayload::SessionUpdate(None) | RoomPayload::DeviceUpdate(None)
        )
    }
}

/// Event kind, used as the SSE event name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomEventKind {
    SessionUpdate,
    DeviceUpdate,
    TablesChanged,
}

impl fmt::Display for RoomEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomEventKind::SessionUpdate => write!(f, "session_update"),
            RoomEventKind::DeviceUpdate => write!(f, "device_update"),
            RoomEventKind::TablesChanged => write!(f, "tables_changed"),
        }
    }
}

/// One fan-out event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    pub room: String,
    /// Per-room, strictly increasing
    pub version: u64,
    pub timestamp: i64,
    #[serde(flatten)]
    pub payload: RoomPayload,
}

impl RoomEvent {
    pub fn new(room: impl Into<String>, version: u64, payload: RoomPayload) -> Self {
        Self {
            room: room.into(),
            version,
            timestamp: crate::util::now_millis(),
            payload,
        }
    }

    pub fn kind(&self) -> RoomEventKind {
        self.payload.kind()
    }
}
