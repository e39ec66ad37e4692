//! Dining table model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Table occupancy status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Cleaning,
    /// Picked on a device but no session created yet
    Selected,
}

/// Dining table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    /// Number printed on the table
    pub number: i32,
    /// Maximum adults the table may seat
    pub capacity: u32,
    pub status: TableStatus,
    /// Adults currently seated across all attached devices
    pub current_guests: u32,
}

impl Table {
    /// Seats left before the capacity limit is reached
    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.current_guests)
    }

    /// Whether `additional_adults` more adults fit on this table
    pub fn can_seat(&self, additional_adults: u32) -> bool {
        self.current_guests.saturating_add(additional_adults) <= self.capacity
    }
}

/// Table registration payload (PUT /api/tables/{id})
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TableUpsert {
    #[validate(range(min = 0, message = "table number must not be negative"))]
    pub number: i32,
    #[validate(range(min = 1, max = 99, message = "capacity must be between 1 and 99"))]
    pub capacity: u32,
}

/// Manual status change (PUT /api/tables/{id}/status)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatusUpdate {
    pub status: TableStatus,
}
