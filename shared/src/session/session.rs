//! Table session - the single active ordering session bound to a table

use super::cart::CartItem;
use super::guests::GuestCounts;
use serde::{Deserialize, Serialize};

/// Table session status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    /// Paid and closed
    Completed,
    /// Abandoned or explicitly ended
    Cancelled,
}

/// Why a session is being ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// Payment settled
    Completed,
    /// Explicit end without payment
    #[default]
    Cancelled,
}

impl From<EndReason> for SessionStatus {
    fn from(reason: EndReason) -> Self {
        match reason {
            EndReason::Completed => SessionStatus::Completed,
            EndReason::Cancelled => SessionStatus::Cancelled,
        }
    }
}

/// Table session record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableSession {
    pub session_id: String,
    pub table_id: String,
    /// Device that created the session
    pub primary_device_id: String,
    /// Aggregate over every attached device
    pub guest_counts: GuestCounts,
    /// Table-level cart
    pub cart_items: Vec<CartItem>,
    /// Advisory cooldown before the next order may be sent (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_order_available_until: Option<i64>,
    #[serde(default)]
    pub session_ended: bool,
    pub status: SessionStatus,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
}

impl TableSession {
    pub fn new(
        session_id: String,
        table_id: String,
        primary_device_id: String,
        guest_counts: GuestCounts,
        now: i64,
    ) -> Self {
        Self {
            session_id,
            table_id,
            primary_device_id,
            guest_counts,
            cart_items: Vec::new(),
            next_order_available_until: None,
            session_ended: false,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}
