//! Group coordinator
//!
//! A table has at most one active `SynchronizedGroup`, resolved through the
//! `active_groups` index. Find-or-create and membership edits run inside the
//! caller's write transaction, so two devices joining at the same moment end
//! up in the same group.

use super::error::{SessionError, SessionResult};
use super::storage::{ReadTxn, SessionStorage};
use redb::WriteTransaction;
use shared::session::{DeviceSession, GuestCounts, SessionTimer, SynchronizedGroup};
use shared::util::new_id;

#[derive(Debug, Clone)]
pub struct GroupCoordinator {
    storage: SessionStorage,
}

impl GroupCoordinator {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }

    /// The table's active group, if any
    pub fn active_txn(
        &self,
        txn: &impl ReadTxn,
        table_id: &str,
    ) -> SessionResult<Option<SynchronizedGroup>> {
        let Some(group_id) = self.storage.active_group_id_txn(txn, table_id)? else {
            return Ok(None);
        };
        Ok(self
            .storage
            .get_group_txn(txn, &group_id)?
            .filter(|g| g.is_active))
    }

    pub fn require_active_txn(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
    ) -> SessionResult<SynchronizedGroup> {
        self.active_txn(txn, table_id)?
            .ok_or_else(|| SessionError::GroupNotFound(table_id.to_string()))
    }

    /// Add `device_id` to the table's active group, creating it first when the
    /// table has none. The first member becomes master.
    pub fn join(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        device_id: &str,
        now: i64,
    ) -> SessionResult<SynchronizedGroup> {
        let mut group = match self.active_txn(txn, table_id)? {
            Some(group) => group,
            None => {
                let group = SynchronizedGroup {
                    group_id: new_id(),
                    table_id: table_id.to_string(),
                    master_device_id: device_id.to_string(),
                    devices: Vec::new(),
                    shared_cart: Vec::new(),
                    shared_orders: Vec::new(),
                    session_timer: SessionTimer {
                        start_time: now,
                        end_time: None,
                        remaining_time: 0,
                    },
                    guest_counts: GuestCounts::default(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                self.storage
                    .set_active_group(txn, table_id, &group.group_id)?;
                tracing::info!(table_id = %table_id, group_id = %group.group_id, "Group created");
                group
            }
        };

        if !group.has_device(device_id) {
            group.devices.push(device_id.to_string());
        }
        group.updated_at = now;
        self.storage.store_group(txn, &group)?;
        Ok(group)
    }

    /// Recompute the group's guest counts from its active members
    pub fn refresh_guest_counts(
        &self,
        txn: &WriteTransaction,
        group: &mut SynchronizedGroup,
        members: &[DeviceSession],
        now: i64,
    ) -> SessionResult<()> {
        group.guest_counts = GuestCounts::sum(
            members
                .iter()
                .filter(|d| d.is_active && d.group_id.as_deref() == Some(group.group_id.as_str()))
                .map(|d| &d.guest_counts),
        );
        group.updated_at = now;
        self.storage.store_group(txn, group)?;
        Ok(())
    }

    /// Remove a device from its group
    ///
    /// An emptied group goes inactive for good and leaves the index. When the
    /// master leaves, the next member in join order takes over.
    pub fn leave(
        &self,
        txn: &WriteTransaction,
        group_id: &str,
        device_id: &str,
        now: i64,
    ) -> SessionResult<Option<SynchronizedGroup>> {
        let Some(mut group) = self.storage.get_group_txn(txn, group_id)? else {
            return Ok(None);
        };
        if !group.is_active {
            return Ok(Some(group));
        }

        group.devices.retain(|d| d != device_id);
        if group.devices.is_empty() {
            group.is_active = false;
            self.storage.clear_active_group(txn, &group.table_id)?;
            tracing::info!(table_id = %group.table_id, group_id = %group_id, "Group emptied");
        } else if group.master_device_id == device_id {
            group.master_device_id = group.devices[0].clone();
        }
        group.updated_at = now;
        self.storage.store_group(txn, &group)?;
        Ok(Some(group))
    }

    /// Deactivate the table's active group. No-op when there is none.
    pub fn deactivate(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        now: i64,
    ) -> SessionResult<Option<SynchronizedGroup>> {
        let Some(group_id) = self.storage.active_group_id_txn(txn, table_id)? else {
            return Ok(None);
        };
        self.storage.clear_active_group(txn, table_id)?;

        let Some(mut group) = self.storage.get_group_txn(txn, &group_id)? else {
            return Ok(None);
        };
        if group.is_active {
            group.is_active = false;
            group.updated_at = now;
            if group.session_timer.end_time.is_none() {
                group.session_timer.end_time = Some(now);
            }
            self.storage.store_group(txn, &group)?;
        }
        Ok(Some(group))
    }

    pub fn store(&self, txn: &WriteTransaction, group: &mut SynchronizedGroup, now: i64) -> SessionResult<()> {
        group.updated_at = now;
        self.storage.store_group(txn, group)?;
        Ok(())
    }

    pub fn active(&self, table_id: &str) -> SessionResult<Option<SynchronizedGroup>> {
        self.active_txn(&self.storage.begin_read()?, table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> (SessionStorage, GroupCoordinator) {
        let storage = SessionStorage::open_in_memory().unwrap();
        (storage.clone(), GroupCoordinator::new(storage))
    }

    #[test]
    fn test_join_creates_once_and_uses_set_semantics() {
        let (storage, groups) = coordinator();
        let txn = storage.begin_write().unwrap();
        let first = groups.join(&txn, "t1", "d1", 1).unwrap();
        let second = groups.join(&txn, "t1", "d2", 2).unwrap();
        let again = groups.join(&txn, "t1", "d2", 3).unwrap();
        txn.commit().unwrap();

        assert_eq!(first.group_id, second.group_id);
        assert_eq!(again.devices, vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(again.master_device_id, "d1");
        assert_eq!(groups.active("t1").unwrap().unwrap().group_id, first.group_id);
    }

    #[test]
    fn test_master_handover_and_empty_group_goes_inactive() {
        let (storage, groups) = coordinator();
        let txn = storage.begin_write().unwrap();
        let group = groups.join(&txn, "t1", "d1", 1).unwrap();
        groups.join(&txn, "t1", "d2", 1).unwrap();

        let after = groups.leave(&txn, &group.group_id, "d1", 2).unwrap().unwrap();
        assert!(after.is_active);
        assert_eq!(after.master_device_id, "d2");

        let after = groups.leave(&txn, &group.group_id, "d2", 3).unwrap().unwrap();
        assert!(!after.is_active);
        assert!(groups.active_txn(&txn, "t1").unwrap().is_none());

        // a later join starts a fresh group
        let fresh = groups.join(&txn, "t1", "d3", 4).unwrap();
        assert_ne!(fresh.group_id, group.group_id);
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let (storage, groups) = coordinator();
        let txn = storage.begin_write().unwrap();
        groups.join(&txn, "t1", "d1", 1).unwrap();

        let ended = groups.deactivate(&txn, "t1", 5).unwrap().unwrap();
        assert!(!ended.is_active);
        assert_eq!(ended.session_timer.end_time, Some(5));
        assert!(groups.deactivate(&txn, "t1", 6).unwrap().is_none());
        assert!(matches!(
            groups.require_active_txn(&txn, "t1"),
            Err(SessionError::GroupNotFound(_))
        ));
    }
}
