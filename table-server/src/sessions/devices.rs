//! Device session manager
//!
//! One `DeviceSession` per (table session, device). A device that leaves is
//! kept as an inactive record so its placed orders stay readable.

use super::error::{SessionError, SessionResult};
use super::storage::{ReadTxn, SessionStorage};
use redb::WriteTransaction;
use shared::session::{DeviceSession, GroupType, GuestCounts, TableSession};
use shared::util::new_id;

/// Who admitted a device into a same-group session
#[derive(Debug, Clone, Default)]
pub struct Admission {
    pub waiter_verified: bool,
    pub waiter_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeviceSessions {
    storage: SessionStorage,
}

impl DeviceSessions {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }

    /// Create (or re-activate) the membership of `device_id`
    ///
    /// Orders placed under an earlier, inactive membership are carried over.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        txn: &WriteTransaction,
        session: &TableSession,
        device_id: &str,
        guest_counts: GuestCounts,
        group_type: GroupType,
        admission: Admission,
        now: i64,
    ) -> SessionResult<DeviceSession> {
        let orders = self
            .storage
            .get_device_txn(txn, &session.session_id, device_id)?
            .map(|previous| previous.orders)
            .unwrap_or_default();

        let device = DeviceSession {
            session_id: new_id(),
            table_session_id: session.session_id.clone(),
            table_id: session.table_id.clone(),
            device_id: device_id.to_string(),
            group_type,
            group_id: None,
            guest_counts,
            cart: Vec::new(),
            orders,
            is_active: true,
            waiter_verified: admission.waiter_verified,
            waiter_name: admission.waiter_name,
            joined_at: now,
            updated_at: now,
            left_at: None,
        };
        self.storage.store_device(txn, &device)?;

        tracing::debug!(
            table_id = %device.table_id,
            device_id = %device_id,
            group_type = ?group_type,
            "Device session created"
        );
        Ok(device)
    }

    pub fn find_txn(
        &self,
        txn: &impl ReadTxn,
        table_session_id: &str,
        device_id: &str,
    ) -> SessionResult<Option<DeviceSession>> {
        Ok(self.storage.get_device_txn(txn, table_session_id, device_id)?)
    }

    /// Active membership or `DeviceNotFound`
    pub fn require_active_txn(
        &self,
        txn: &impl ReadTxn,
        session: &TableSession,
        device_id: &str,
    ) -> SessionResult<DeviceSession> {
        self.storage
            .get_device_txn(txn, &session.session_id, device_id)?
            .filter(|d| d.is_active)
            .ok_or_else(|| SessionError::DeviceNotFound {
                table_id: session.table_id.clone(),
                device_id: device_id.to_string(),
            })
    }

    pub fn list_active_txn(
        &self,
        txn: &impl ReadTxn,
        table_session_id: &str,
    ) -> SessionResult<Vec<DeviceSession>> {
        let mut devices = self.storage.list_devices_txn(txn, table_session_id)?;
        devices.retain(|d| d.is_active);
        Ok(devices)
    }

    pub fn save(
        &self,
        txn: &WriteTransaction,
        device: &mut DeviceSession,
        now: i64,
    ) -> SessionResult<()> {
        device.updated_at = now;
        self.storage.store_device(txn, device)?;
        Ok(())
    }

    /// Mark one membership inactive; returns the updated record
    pub fn deactivate(
        &self,
        txn: &WriteTransaction,
        session: &TableSession,
        device_id: &str,
        now: i64,
    ) -> SessionResult<DeviceSession> {
        let mut device = self.require_active_txn(txn, session, device_id)?;
        device.is_active = false;
        device.left_at = Some(now);
        device.cart.clear();
        self.save(txn, &mut device, now)?;
        Ok(device)
    }

    /// Mark every active membership of the session inactive
    pub fn deactivate_all(
        &self,
        txn: &WriteTransaction,
        table_session_id: &str,
        now: i64,
    ) -> SessionResult<Vec<DeviceSession>> {
        let mut devices = self.list_active_txn(txn, table_session_id)?;
        for device in devices.iter_mut() {
            device.is_active = false;
            device.left_at = Some(now);
            device.cart.clear();
            self.save(txn, device, now)?;
        }
        Ok(devices)
    }
}
