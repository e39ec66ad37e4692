//! redb-based storage layer for table sessions
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `tables` | `table_id` | `Table` | Capacity and occupancy |
//! | `sessions` | `table_id` | `TableSession` | Current (or last) session per table |
//! | `device_sessions` | `(table_session_id, device_id)` | `DeviceSession` | Memberships |
//! | `groups` | `group_id` | `SynchronizedGroup` | Groups, active and inactive |
//! | `active_groups` | `table_id` | `group_id` | At most one active group per table |
//!
//! # Atomicity
//!
//! redb allows a single write transaction at a time. Every mutating
//! operation reads what it needs through the `*_txn` accessors of its own
//! write transaction and commits once, so the check and the write are one
//! atomic step and a failed operation leaves nothing behind.
//!
//! Pure reads go through `begin_read`: the same `*_txn` accessors accept a
//! [`ReadTransaction`] via [`ReadTxn`] and see one committed snapshot.

use redb::{
    Database, Key, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, Value, WriteTransaction,
};
use shared::session::{DeviceSession, SynchronizedGroup, Table, TableSession};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = table_id, value = JSON-serialized Table
const TABLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tables");

/// key = table_id, value = JSON-serialized TableSession
const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// key = (table_session_id, device_id), value = JSON-serialized DeviceSession
const DEVICE_SESSIONS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("device_sessions");

/// key = group_id, value = JSON-serialized SynchronizedGroup
const GROUPS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("groups");

/// key = table_id, value = group_id of the active group
const ACTIVE_GROUPS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("active_groups");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Transaction the `*_txn` getters can read through
pub trait ReadTxn {
    fn open<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> StorageResult<impl ReadableTable<K, V>>;
}

impl ReadTxn for WriteTransaction {
    fn open<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> StorageResult<impl ReadableTable<K, V>> {
        Ok(self.open_table(definition)?)
    }
}

impl ReadTxn for ReadTransaction {
    fn open<K: Key + 'static, V: Value + 'static>(
        &self,
        definition: TableDefinition<'_, K, V>,
    ) -> StorageResult<impl ReadableTable<K, V>> {
        Ok(self.open_table(definition)?)
    }
}

/// Session storage backed by redb
#[derive(Clone)]
pub struct SessionStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage").finish_non_exhaustive()
    }
}

impl SessionStorage {
    /// Open or create the database at the given path
    ///
    /// Commits are durable as soon as `commit()` returns (redb's default
    /// `Durability::Immediate`).
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and throwaway instances)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TABLES_TABLE)?;
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(DEVICE_SESSIONS_TABLE)?;
            let _ = write_txn.open_table(GROUPS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_GROUPS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    ///
    /// Blocks while another write transaction is open.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (MVCC snapshot, never blocks writers)
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Tables ==========

    pub fn get_table_txn(
        &self,
        txn: &impl ReadTxn,
        table_id: &str,
    ) -> StorageResult<Option<Table>> {
        let table = txn.open(TABLES_TABLE)?;
        match table.get(table_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_table(&self, txn: &WriteTransaction, record: &Table) -> StorageResult<()> {
        let mut table = txn.open_table(TABLES_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(record.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_table(&self, table_id: &str) -> StorageResult<Option<Table>> {
        self.get_table_txn(&self.begin_read()?, table_id)
    }

    pub fn list_tables(&self) -> StorageResult<Vec<Table>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLES_TABLE)?;

        let mut tables = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let record: Table = serde_json::from_slice(value.value())?;
            tables.push(record);
        }

        tables.sort_by_key(|t| t.number);
        Ok(tables)
    }

    // ========== Table Sessions ==========

    pub fn get_session_txn(
        &self,
        txn: &impl ReadTxn,
        table_id: &str,
    ) -> StorageResult<Option<TableSession>> {
        let table = txn.open(SESSIONS_TABLE)?;
        match table.get(table_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_session(
        &self,
        txn: &WriteTransaction,
        session: &TableSession,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SESSIONS_TABLE)?;
        let value = serde_json::to_vec(session)?;
        table.insert(session.table_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_session(&self, table_id: &str) -> StorageResult<Option<TableSession>> {
        self.get_session_txn(&self.begin_read()?, table_id)
    }

    // ========== Device Sessions ==========

    pub fn get_device_txn(
        &self,
        txn: &impl ReadTxn,
        table_session_id: &str,
        device_id: &str,
    ) -> StorageResult<Option<DeviceSession>> {
        let table = txn.open(DEVICE_SESSIONS_TABLE)?;
        match table.get((table_session_id, device_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_device(&self, txn: &WriteTransaction, device: &DeviceSession) -> StorageResult<()> {
        let mut table = txn.open_table(DEVICE_SESSIONS_TABLE)?;
        let value = serde_json::to_vec(device)?;
        table.insert(
            (device.table_session_id.as_str(), device.device_id.as_str()),
            value.as_slice(),
        )?;
        Ok(())
    }

    /// All memberships (active or not) of one table session, in device id order
    pub fn list_devices_txn(
        &self,
        txn: &impl ReadTxn,
        table_session_id: &str,
    ) -> StorageResult<Vec<DeviceSession>> {
        let table = txn.open(DEVICE_SESSIONS_TABLE)?;

        let mut devices = Vec::new();
        for result in table.range((table_session_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != table_session_id {
                break;
            }
            devices.push(serde_json::from_slice(value.value())?);
        }
        Ok(devices)
    }

    pub fn get_device(
        &self,
        table_session_id: &str,
        device_id: &str,
    ) -> StorageResult<Option<DeviceSession>> {
        self.get_device_txn(&self.begin_read()?, table_session_id, device_id)
    }

    pub fn list_devices(&self, table_session_id: &str) -> StorageResult<Vec<DeviceSession>> {
        self.list_devices_txn(&self.begin_read()?, table_session_id)
    }

    // ========== Synchronized Groups ==========

    pub fn get_group_txn(
        &self,
        txn: &impl ReadTxn,
        group_id: &str,
    ) -> StorageResult<Option<SynchronizedGroup>> {
        let table = txn.open(GROUPS_TABLE)?;
        match table.get(group_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn store_group(
        &self,
        txn: &WriteTransaction,
        group: &SynchronizedGroup,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(GROUPS_TABLE)?;
        let value = serde_json::to_vec(group)?;
        table.insert(group.group_id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_group(&self, group_id: &str) -> StorageResult<Option<SynchronizedGroup>> {
        self.get_group_txn(&self.begin_read()?, group_id)
    }

    // ========== Active Group Index ==========

    pub fn active_group_id_txn(
        &self,
        txn: &impl ReadTxn,
        table_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open(ACTIVE_GROUPS_TABLE)?;
        Ok(table.get(table_id)?.map(|guard| guard.value().to_string()))
    }

    pub fn set_active_group(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        group_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_GROUPS_TABLE)?;
        table.insert(table_id, group_id)?;
        Ok(())
    }

    pub fn clear_active_group(&self, txn: &WriteTransaction, table_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_GROUPS_TABLE)?;
        table.remove(table_id)?;
        Ok(())
    }

    pub fn active_group_id(&self, table_id: &str) -> StorageResult<Option<String>> {
        self.active_group_id_txn(&self.begin_read()?, table_id)
    }

    // ========== Stats ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let tables = read_txn.open_table(TABLES_TABLE)?;
        let sessions = read_txn.open_table(SESSIONS_TABLE)?;
        let devices = read_txn.open_table(DEVICE_SESSIONS_TABLE)?;
        let active_groups = read_txn.open_table(ACTIVE_GROUPS_TABLE)?;

        let mut active_session_count = 0;
        for result in sessions.iter()? {
            let (_key, value) = result?;
            let session: TableSession = serde_json::from_slice(value.value())?;
            if session.is_active() {
                active_session_count += 1;
            }
        }

        Ok(StorageStats {
            table_count: tables.len()?,
            active_session_count,
            device_session_count: devices.len()?,
            active_group_count: active_groups.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub table_count: u64,
    pub active_session_count: u64,
    pub device_session_count: u64,
    pub active_group_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::session::{GroupType, GuestCounts, SessionTimer, TableStatus};

    fn test_table(id: &str, number: i32) -> Table {
        Table {
            id: id.to_string(),
            number,
            capacity: 4,
            status: TableStatus::Available,
            current_guests: 0,
        }
    }

    fn test_device(table_session_id: &str, device_id: &str) -> DeviceSession {
        DeviceSession {
            session_id: format!("ds-{}", device_id),
            table_session_id: table_session_id.to_string(),
            table_id: "t1".to_string(),
            device_id: device_id.to_string(),
            group_type: GroupType::Different,
            group_id: None,
            guest_counts: GuestCounts::adults(1),
            cart: vec![],
            orders: vec![],
            is_active: true,
            waiter_verified: false,
            waiter_name: None,
            joined_at: 1,
            updated_at: 1,
            left_at: None,
        }
    }

    #[test]
    fn test_table_store_and_list_sorted_by_number() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_table(&txn, &test_table("b", 2)).unwrap();
        storage.store_table(&txn, &test_table("a", 1)).unwrap();
        txn.commit().unwrap();

        let tables = storage.list_tables().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].id, "a");
        assert_eq!(storage.get_table("b").unwrap().unwrap().number, 2);
        assert!(storage.get_table("zzz").unwrap().is_none());
    }

    #[test]
    fn test_uncommitted_transaction_leaves_nothing() {
        let storage = SessionStorage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage.store_table(&txn, &test_table("a", 1)).unwrap();
            // dropped without commit
        }
        assert!(storage.get_table("a").unwrap().is_none());
    }

    #[test]
    fn test_read_txn_keeps_its_snapshot() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let before = storage.begin_read().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.store_table(&txn, &test_table("a", 1)).unwrap();
        // the writer sees its own uncommitted change through the same getter
        assert!(storage.get_table_txn(&txn, "a").unwrap().is_some());
        txn.commit().unwrap();

        assert!(storage.get_table_txn(&before, "a").unwrap().is_none());
        let after = storage.begin_read().unwrap();
        assert!(storage.get_table_txn(&after, "a").unwrap().is_some());
    }

    #[test]
    fn test_list_devices_is_scoped_to_session() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.store_device(&txn, &test_device("s1", "d2")).unwrap();
        storage.store_device(&txn, &test_device("s1", "d1")).unwrap();
        storage.store_device(&txn, &test_device("s2", "d3")).unwrap();
        storage.store_device(&txn, &test_device("s10", "d4")).unwrap();

        let in_txn = storage.list_devices_txn(&txn, "s1").unwrap();
        assert_eq!(in_txn.len(), 2);
        txn.commit().unwrap();

        let devices = storage.list_devices("s1").unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert!(storage.get_device("s2", "d3").unwrap().is_some());
        assert!(storage.get_device("s1", "d3").unwrap().is_none());
    }

    #[test]
    fn test_active_group_index() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let group = SynchronizedGroup {
            group_id: "g1".to_string(),
            table_id: "t1".to_string(),
            master_device_id: "d1".to_string(),
            devices: vec!["d1".to_string()],
            shared_cart: vec![],
            shared_orders: vec![],
            session_timer: SessionTimer::default(),
            guest_counts: GuestCounts::adults(2),
            is_active: true,
            created_at: 1,
            updated_at: 1,
        };

        let txn = storage.begin_write().unwrap();
        storage.store_group(&txn, &group).unwrap();
        storage.set_active_group(&txn, "t1", "g1").unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.active_group_id("t1").unwrap().as_deref(), Some("g1"));
        assert_eq!(storage.get_group("g1").unwrap().unwrap(), group);

        let txn = storage.begin_write().unwrap();
        storage.clear_active_group(&txn, "t1").unwrap();
        txn.commit().unwrap();
        assert!(storage.active_group_id("t1").unwrap().is_none());

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.active_group_count, 0);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.redb");
        {
            let storage = SessionStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.store_table(&txn, &test_table("a", 1)).unwrap();
            txn.commit().unwrap();
        }
        let storage = SessionStorage::open(&path).unwrap();
        assert!(storage.get_table("a").unwrap().is_some());
    }
}
