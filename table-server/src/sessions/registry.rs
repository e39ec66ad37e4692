//! Table registry
//!
//! Owns capacity and occupancy. All writes take the caller's transaction so
//! a capacity check and the session change it guards commit together.

use super::error::{SessionError, SessionResult};
use super::storage::{ReadTxn, SessionStorage};
use redb::WriteTransaction;
use shared::session::{Table, TableStatus, TableUpsert};

#[derive(Debug, Clone)]
pub struct TableRegistry {
    storage: SessionStorage,
}

impl TableRegistry {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }

    /// Load a table or fail with `TableNotFound`
    pub fn require_txn(&self, txn: &impl ReadTxn, table_id: &str) -> SessionResult<Table> {
        self.storage
            .get_table_txn(txn, table_id)?
            .ok_or_else(|| SessionError::TableNotFound(table_id.to_string()))
    }

    /// Check-and-set: add `additional_adults` to the table's occupancy
    ///
    /// Fails with the number of seats still free when the table cannot take
    /// them. Nothing is written on failure.
    pub fn reserve_capacity(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        additional_adults: u32,
    ) -> SessionResult<Table> {
        let mut table = self.require_txn(txn, table_id)?;
        if !table.can_seat(additional_adults) {
            tracing::info!(
                table_id = %table_id,
                requested = additional_adults,
                current = table.current_guests,
                capacity = table.capacity,
                "Capacity exceeded"
            );
            return Err(SessionError::CapacityExceeded {
                remaining: table.remaining_capacity(),
            });
        }

        table.current_guests += additional_adults;
        self.storage.store_table(txn, &table)?;
        Ok(table)
    }

    /// Saturating decrement of the table's occupancy
    pub fn release_capacity(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        adults: u32,
    ) -> SessionResult<Table> {
        let mut table = self.require_txn(txn, table_id)?;
        table.current_guests = table.current_guests.saturating_sub(adults);
        self.storage.store_table(txn, &table)?;
        Ok(table)
    }

    pub fn update_status(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        status: TableStatus,
    ) -> SessionResult<Table> {
        let mut table = self.require_txn(txn, table_id)?;
        table.status = status;
        self.storage.store_table(txn, &table)?;
        Ok(table)
    }

    pub fn update_guest_count(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        total: u32,
    ) -> SessionResult<Table> {
        let mut table = self.require_txn(txn, table_id)?;
        table.current_guests = total;
        self.storage.store_table(txn, &table)?;
        Ok(table)
    }

    /// Back to `available` with nobody seated
    pub fn reset_table(&self, txn: &WriteTransaction, table_id: &str) -> SessionResult<Table> {
        let mut table = self.require_txn(txn, table_id)?;
        table.status = TableStatus::Available;
        table.current_guests = 0;
        self.storage.store_table(txn, &table)?;
        Ok(table)
    }

    /// Register a table or change its number/capacity
    ///
    /// Occupancy fields of an existing table are left untouched, and capacity
    /// never drops below the adults already seated.
    pub fn upsert_table(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        upsert: &TableUpsert,
    ) -> SessionResult<Table> {
        let table = match self.storage.get_table_txn(txn, table_id)? {
            Some(existing) if upsert.capacity < existing.current_guests => {
                return Err(SessionError::validation(format!(
                    "capacity {} is below the {} guests seated at table {}",
                    upsert.capacity, existing.current_guests, table_id
                )));
            }
            Some(existing) => Table {
                number: upsert.number,
                capacity: upsert.capacity,
                ..existing
            },
            None => Table {
                id: table_id.to_string(),
                number: upsert.number,
                capacity: upsert.capacity,
                status: TableStatus::Available,
                current_guests: 0,
            },
        };
        self.storage.store_table(txn, &table)?;
        Ok(table)
    }

    pub fn get_table(&self, table_id: &str) -> SessionResult<Table> {
        self.storage
            .get_table(table_id)?
            .ok_or_else(|| SessionError::TableNotFound(table_id.to_string()))
    }

    pub fn list_tables(&self) -> SessionResult<Vec<Table>> {
        Ok(self.storage.list_tables()?)
    }
}
