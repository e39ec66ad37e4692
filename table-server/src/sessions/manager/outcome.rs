use serde::Serialize;
use shared::session::{DeviceView, PlacedOrder, Table, TableSession, TableSnapshot};

/// State after a successful session change
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    /// What every device at the table sees
    pub snapshot: TableSnapshot,
    /// The requesting device's private view, when the request named a device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceView>,
}

/// Result of ending a session
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    /// The table after reset
    pub table: Table,
    /// The ended session, or the last one when nothing was active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<TableSession>,
    pub group_deactivated: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmitted {
    pub order: PlacedOrder,
    #[serde(flatten)]
    pub update: SessionUpdate,
}

/// Outcome of [`super::SessionManager::execute`]
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    Updated(SessionUpdate),
    Ended(SessionEnded),
    OrderSubmitted(OrderSubmitted),
}

impl SessionOutcome {
    /// Snapshot of the still-active session, if the session survived
    pub fn snapshot(&self) -> Option<&TableSnapshot> {
        match self {
            SessionOutcome::Updated(update) => Some(&update.snapshot),
            SessionOutcome::OrderSubmitted(submitted) => Some(&submitted.update.snapshot),
            SessionOutcome::Ended(_) => None,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, SessionOutcome::Ended(_))
    }
}
