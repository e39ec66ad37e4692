//! SessionManager - table session lifecycle and multi-device sync
//!
//! # Request Flow
//!
//! ```text
//! execute(request)
//!     ├─ 1. Validate payload (validator)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Read current table / session / group / device state
//!     ├─ 4. Check-and-set (capacity, single active session, single group)
//!     ├─ 5. Persist changes, build snapshots from the same transaction
//!     ├─ 6. Take the publish lock, commit transaction
//!     ├─ 7. Publish table / device / global events, release the lock
//!     └─ 8. Return outcome
//! ```
//!
//! Any error before step 6 drops the transaction, so nothing is written.
//! Steps 6 and 7 run under one lock, so events of a room leave in commit
//! order and their versions never go backwards.
//!
//! Reads (`get_session`, `get_device_view`, `get_group`) use a redb read
//! transaction and never queue behind writers.

mod outcome;
pub use outcome::*;

use super::cart::{apply_mutation, normalize};
use super::devices::{Admission, DeviceSessions};
use super::dispatch::{OrderSink, TracingOrderSink};
use super::error::{SessionError, SessionResult};
use super::groups::GroupCoordinator;
use super::registry::TableRegistry;
use super::storage::{ReadTxn, SessionStorage, StorageError};
use crate::message::Broadcaster;
use crate::waiter::WaiterPinVerifier;
use parking_lot::Mutex;
use redb::WriteTransaction;
use shared::message::TablesChanged;
use shared::session::{
    CartItem, CreateSession, DeviceSession, DeviceSummary, DeviceView, EndReason, EndSession,
    GroupType, GuestCounts, JoinSession, LeaveSession, MutateCart, PatchSession, PlacedOrder,
    SessionRequest, SessionStatus, SubmitOrder, SynchronizedGroup, Table, TableSession,
    TableSnapshot, TableStatus, TableUpsert, UpdateCart, UpdateTimer,
};
use shared::util::{new_id, now_millis};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Default advisory pause between two orders of one session
pub const DEFAULT_ORDER_COOLDOWN: Duration = Duration::from_secs(120);

/// Where a cart operation lands
enum CartTarget {
    /// Table-level cart on the session
    Table,
    /// A device's isolated cart
    Device(Box<DeviceSession>),
    /// The shared cart of the device's synchronized group
    Group(Box<SynchronizedGroup>),
}

/// Events to publish once the transaction has committed
#[derive(Default)]
struct Fanout {
    table: Option<(String, Option<TableSnapshot>)>,
    devices: Vec<(String, Option<DeviceView>)>,
    global: Option<TablesChanged>,
}

impl Fanout {
    /// Registry-only change
    fn global(table: &Table) -> Self {
        Self {
            global: Some(tables_changed(table)),
            ..Default::default()
        }
    }

    /// Session gone: `null` on the table room plus the registry change
    fn cleared(table: &Table) -> Self {
        Self {
            table: Some((table.id.clone(), None)),
            global: Some(tables_changed(table)),
            ..Default::default()
        }
    }
}

/// SessionManager for table session requests
pub struct SessionManager {
    storage: SessionStorage,
    registry: TableRegistry,
    devices: DeviceSessions,
    groups: GroupCoordinator,
    pins: Arc<dyn WaiterPinVerifier>,
    broadcaster: Arc<dyn Broadcaster>,
    order_sink: Arc<dyn OrderSink>,
    order_cooldown: Duration,
    /// Held from commit until the last event of that commit is published
    publish_lock: Mutex<()>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("storage", &"<SessionStorage>")
            .field("broadcaster", &"<dyn Broadcaster>")
            .field("order_cooldown", &self.order_cooldown)
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        storage: SessionStorage,
        broadcaster: Arc<dyn Broadcaster>,
        pins: Arc<dyn WaiterPinVerifier>,
    ) -> Self {
        Self {
            registry: TableRegistry::new(storage.clone()),
            devices: DeviceSessions::new(storage.clone()),
            groups: GroupCoordinator::new(storage.clone()),
            storage,
            pins,
            broadcaster,
            order_sink: Arc::new(TracingOrderSink),
            order_cooldown: DEFAULT_ORDER_COOLDOWN,
            publish_lock: Mutex::new(()),
        }
    }

    /// Replace the downstream order consumer
    pub fn with_order_sink(mut self, sink: Arc<dyn OrderSink>) -> Self {
        self.order_sink = sink;
        self
    }

    pub fn with_order_cooldown(mut self, cooldown: Duration) -> Self {
        self.order_cooldown = cooldown;
        self
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Single dispatch point for tagged requests
    pub fn execute(&self, request: SessionRequest) -> SessionResult<SessionOutcome> {
        tracing::debug!(kind = request.kind(), table_id = %request.table_id(), "Executing session request");
        request.validate()?;

        let outcome = match request {
            SessionRequest::CreateSession(req) => SessionOutcome::Updated(self.create_session(req)?),
            SessionRequest::JoinSession(req) => SessionOutcome::Updated(self.join_session(req)?),
            SessionRequest::LeaveSession(req) => self.leave_session(req)?,
            SessionRequest::UpdateCart(req) => SessionOutcome::Updated(self.update_cart(req)?),
            SessionRequest::MutateCart(req) => SessionOutcome::Updated(self.mutate_cart(req)?),
            SessionRequest::PatchSession(req) => SessionOutcome::Updated(self.patch_session(req)?),
            SessionRequest::UpdateTimer(req) => {
                SessionOutcome::Updated(self.update_group_timer(req)?)
            }
            SessionRequest::SubmitOrder(req) => {
                SessionOutcome::OrderSubmitted(self.submit_order(req)?)
            }
            SessionRequest::EndSession(req) => SessionOutcome::Ended(self.end_session(req)?),
        };
        Ok(outcome)
    }

    // ========== Table Registry ==========

    /// Register a table or change its number/capacity
    pub fn upsert_table(&self, table_id: &str, upsert: TableUpsert) -> SessionResult<Table> {
        if table_id.trim().is_empty() {
            return Err(SessionError::validation("tableId is required"));
        }
        upsert.validate()?;

        let txn = self.storage.begin_write()?;
        let table = self.registry.upsert_table(&txn, table_id, &upsert)?;
        self.commit_and_publish(txn, Fanout::global(&table))?;

        tracing::info!(table_id = %table_id, number = table.number, capacity = table.capacity, "Table upserted");
        Ok(table)
    }

    /// Manual status change (cleaning, selected, ...)
    ///
    /// `occupied` is owned by the session lifecycle: a table with an active
    /// session stays occupied, and only such a table may be set occupied.
    pub fn set_table_status(&self, table_id: &str, status: TableStatus) -> SessionResult<Table> {
        let txn = self.storage.begin_write()?;
        self.registry.require_txn(&txn, table_id)?;
        let in_session = self
            .storage
            .get_session_txn(&txn, table_id)?
            .is_some_and(|s| s.is_active());
        match status {
            TableStatus::Occupied if !in_session => {
                return Err(SessionError::SessionNotFound(table_id.to_string()));
            }
            TableStatus::Occupied => {}
            _ if in_session => return Err(SessionError::Conflict(table_id.to_string())),
            _ => {}
        }
        let table = self.registry.update_status(&txn, table_id, status)?;
        self.commit_and_publish(txn, Fanout::global(&table))?;

        tracing::info!(table_id = %table_id, status = ?status, "Table status updated");
        Ok(table)
    }

    pub fn get_table(&self, table_id: &str) -> SessionResult<Table> {
        self.registry.get_table(table_id)
    }

    pub fn list_tables(&self) -> SessionResult<Vec<Table>> {
        self.registry.list_tables()
    }

    // ========== Session Lifecycle ==========

    /// Open a session on a table
    ///
    /// With `join_existing` an already active session is joined instead of
    /// failing with a conflict.
    pub fn create_session(&self, req: CreateSession) -> SessionResult<SessionUpdate> {
        req.validate()?;
        let now = now_millis();
        let table_id = req.table_id.as_str();

        let txn = self.storage.begin_write()?;
        let table = self.registry.require_txn(&txn, table_id)?;

        if let Some(existing) = self.storage.get_session_txn(&txn, table_id)?
            && existing.is_active()
        {
            if !req.join_existing {
                return Err(SessionError::Conflict(table_id.to_string()));
            }
            let join = JoinSession {
                table_id: req.table_id.clone(),
                device_id: req.device_id.clone(),
                guest_counts: req.guest_counts,
                group_type: req.group_type,
                waiter_pin: req.waiter_pin.clone(),
            };
            return self.finish_join(txn, existing, join, now);
        }

        // leftovers of a session whose cleanup did not complete
        if let Some(stale) = self.groups.deactivate(&txn, table_id, now)? {
            tracing::warn!(table_id = %table_id, group_id = %stale.group_id, "Deactivated stale group");
        }
        if table.current_guests != 0 {
            tracing::warn!(table_id = %table_id, current_guests = table.current_guests, "Resetting stale occupancy");
            self.registry.update_guest_count(&txn, table_id, 0)?;
        }

        self.registry
            .reserve_capacity(&txn, table_id, req.guest_counts.adults)?;
        self.registry
            .update_status(&txn, table_id, TableStatus::Occupied)?;

        let session = TableSession::new(
            new_id(),
            req.table_id.clone(),
            req.device_id.clone(),
            req.guest_counts,
            now,
        );
        self.storage.store_session(&txn, &session)?;

        // the creator never needs a PIN
        let mut device = self.devices.create(
            &txn,
            &session,
            &req.device_id,
            req.guest_counts,
            req.group_type,
            Admission::default(),
            now,
        )?;
        if req.group_type == GroupType::Same {
            self.attach_to_group(&txn, &session, &mut device, now)?;
        }

        let update = self.session_update_txn(&txn, table_id, Some(device))?;
        self.commit_and_publish(txn, self.update_fanout(&update, true))?;

        tracing::info!(
            table_id = %table_id,
            session_id = %update.snapshot.session.session_id,
            device_id = %req.device_id,
            adults = req.guest_counts.adults,
            group_type = ?req.group_type,
            "Session created"
        );
        Ok(update)
    }

    /// Attach a device to the table's active session
    pub fn join_session(&self, req: JoinSession) -> SessionResult<SessionUpdate> {
        req.validate()?;
        let now = now_millis();

        let txn = self.storage.begin_write()?;
        self.registry.require_txn(&txn, &req.table_id)?;
        let session = self.active_session_txn(&txn, &req.table_id)?;
        self.finish_join(txn, session, req, now)
    }

    fn finish_join(
        &self,
        txn: WriteTransaction,
        mut session: TableSession,
        req: JoinSession,
        now: i64,
    ) -> SessionResult<SessionUpdate> {
        let table_id = req.table_id.as_str();

        if let Some(existing) = self
            .devices
            .find_txn(&txn, &session.session_id, &req.device_id)?
            .filter(|d| d.is_active)
        {
            tracing::debug!(table_id = %table_id, device_id = %req.device_id, "Device re-joined, keeping membership");
            let update = self.session_update_txn(&txn, table_id, Some(existing))?;
            return Ok(update);
        }

        let admission = match req.group_type {
            GroupType::Same => self.verify_waiter(table_id, req.waiter_pin.as_deref())?,
            GroupType::Different => Admission::default(),
        };

        self.registry
            .reserve_capacity(&txn, table_id, req.guest_counts.adults)?;

        let mut device = self.devices.create(
            &txn,
            &session,
            &req.device_id,
            req.guest_counts,
            req.group_type,
            admission,
            now,
        )?;
        if req.group_type == GroupType::Same {
            self.attach_to_group(&txn, &session, &mut device, now)?;
        }

        let active = self.devices.list_active_txn(&txn, &session.session_id)?;
        session.guest_counts = GuestCounts::sum(active.iter().map(|d| &d.guest_counts));
        session.updated_at = now;
        self.storage.store_session(&txn, &session)?;

        let update = self.session_update_txn(&txn, table_id, Some(device))?;
        self.commit_and_publish(txn, self.update_fanout(&update, true))?;

        tracing::info!(
            table_id = %table_id,
            device_id = %req.device_id,
            adults = req.guest_counts.adults,
            group_type = ?req.group_type,
            current_guests = update.snapshot.table.current_guests,
            "Device joined session"
        );
        Ok(update)
    }

    fn verify_waiter(&self, table_id: &str, pin: Option<&str>) -> SessionResult<Admission> {
        let Some(pin) = pin.filter(|p| !p.trim().is_empty()) else {
            tracing::warn!(table_id = %table_id, "Same-group join without waiter PIN");
            return Err(SessionError::Unauthorized);
        };
        let verification = self.pins.verify(pin, table_id);
        if !verification.accepted {
            return Err(SessionError::Unauthorized);
        }
        Ok(Admission {
            waiter_verified: true,
            waiter_name: verification.waiter,
        })
    }

    /// Same-group membership: find-or-create the group, link the device,
    /// recompute the group's guest counts.
    fn attach_to_group(
        &self,
        txn: &WriteTransaction,
        session: &TableSession,
        device: &mut DeviceSession,
        now: i64,
    ) -> SessionResult<()> {
        let mut group = self.groups.join(txn, &session.table_id, &device.device_id, now)?;
        device.group_id = Some(group.group_id.clone());
        self.devices.save(txn, device, now)?;

        let members = self.devices.list_active_txn(txn, &session.session_id)?;
        self.groups
            .refresh_guest_counts(txn, &mut group, &members, now)?;
        Ok(())
    }

    /// Detach a device from the session
    ///
    /// When the last active device leaves, the session ends as cancelled.
    pub fn leave_session(&self, req: LeaveSession) -> SessionResult<SessionOutcome> {
        req.validate()?;
        let now = now_millis();
        let table_id = req.table_id.as_str();

        let txn = self.storage.begin_write()?;
        let mut session = self.active_session_txn(&txn, table_id)?;
        let device = self
            .devices
            .deactivate(&txn, &session, &req.device_id, now)?;
        self.registry
            .release_capacity(&txn, table_id, device.guest_counts.adults)?;

        if let Some(group_id) = device.group_id.as_deref()
            && let Some(mut group) = self.groups.leave(&txn, group_id, &req.device_id, now)?
            && group.is_active
        {
            let members = self.devices.list_active_txn(&txn, &session.session_id)?;
            self.groups
                .refresh_guest_counts(&txn, &mut group, &members, now)?;
        }

        let remaining = self.devices.list_active_txn(&txn, &session.session_id)?;
        if remaining.is_empty() {
            let (table, ended, _) =
                self.end_in_txn(&txn, table_id, session, EndReason::Cancelled, now)?;
            self.groups.deactivate(&txn, table_id, now)?;

            let mut fanout = Fanout::cleared(&table);
            fanout.devices.push((req.device_id.clone(), None));
            self.commit_and_publish(txn, fanout)?;

            tracing::info!(table_id = %table_id, device_id = %req.device_id, "Last device left, session cancelled");

            return Ok(SessionOutcome::Ended(SessionEnded {
                table,
                session: Some(ended),
                group_deactivated: true,
            }));
        }

        session.guest_counts = GuestCounts::sum(remaining.iter().map(|d| &d.guest_counts));
        if session.primary_device_id == req.device_id {
            session.primary_device_id = remaining[0].device_id.clone();
        }
        session.updated_at = now;
        self.storage.store_session(&txn, &session)?;

        let update = self.session_update_txn(&txn, table_id, None)?;
        let mut fanout = self.update_fanout(&update, true);
        fanout.devices.push((req.device_id.clone(), None));
        self.commit_and_publish(txn, fanout)?;

        tracing::info!(
            table_id = %table_id,
            device_id = %req.device_id,
            current_guests = update.snapshot.table.current_guests,
            "Device left session"
        );
        Ok(SessionOutcome::Updated(update))
    }

    // ========== Carts ==========

    /// Replace a cart wholesale
    pub fn update_cart(&self, req: UpdateCart) -> SessionResult<SessionUpdate> {
        req.validate()?;
        let items = normalize(req.cart_items);
        self.edit_cart(&req.table_id, req.device_id.as_deref(), |cart| {
            *cart = items;
            Ok(())
        })
    }

    /// Apply one cart mutation against the stored cart
    pub fn mutate_cart(&self, req: MutateCart) -> SessionResult<SessionUpdate> {
        req.validate()?;
        let mutation = req.mutation;
        self.edit_cart(&req.table_id, req.device_id.as_deref(), |cart| {
            apply_mutation(cart, &mutation)
        })
    }

    fn edit_cart(
        &self,
        table_id: &str,
        device_id: Option<&str>,
        edit: impl FnOnce(&mut Vec<CartItem>) -> SessionResult<()>,
    ) -> SessionResult<SessionUpdate> {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let mut session = self.active_session_txn(&txn, table_id)?;

        let target = self.resolve_cart_target(&txn, &session, device_id)?;
        let mut group_members = Vec::new();
        let device = match target {
            CartTarget::Table => {
                edit(&mut session.cart_items)?;
                None
            }
            CartTarget::Device(mut device) => {
                edit(&mut device.cart)?;
                self.devices.save(&txn, &mut device, now)?;
                Some(*device)
            }
            CartTarget::Group(mut group) => {
                edit(&mut group.shared_cart)?;
                self.groups.store(&txn, &mut group, now)?;
                group_members = group.devices.clone();
                match device_id {
                    Some(id) => self.devices.find_txn(&txn, &session.session_id, id)?,
                    None => None,
                }
            }
        };
        session.updated_at = now;
        self.storage.store_session(&txn, &session)?;

        let update = self.session_update_txn(&txn, table_id, device)?;
        let mut fanout = self.update_fanout(&update, false);
        self.push_member_views(&txn, &session, &group_members, &update, &mut fanout)?;
        self.commit_and_publish(txn, fanout)?;

        tracing::debug!(table_id = %table_id, device_id = ?device_id, "Cart updated");
        Ok(update)
    }

    fn resolve_cart_target(
        &self,
        txn: &WriteTransaction,
        session: &TableSession,
        device_id: Option<&str>,
    ) -> SessionResult<CartTarget> {
        let Some(device_id) = device_id else {
            return Ok(CartTarget::Table);
        };
        let device = self.devices.require_active_txn(txn, session, device_id)?;
        if device.group_type == GroupType::Same
            && let Some(group_id) = device.group_id.as_deref()
            && let Some(group) = self
                .storage
                .get_group_txn(txn, group_id)?
                .filter(|g| g.is_active)
        {
            return Ok(CartTarget::Group(Box::new(group)));
        }
        Ok(CartTarget::Device(Box::new(device)))
    }

    /// Private views for the other members of a group whose shared state moved
    fn push_member_views(
        &self,
        txn: &WriteTransaction,
        session: &TableSession,
        members: &[String],
        update: &SessionUpdate,
        fanout: &mut Fanout,
    ) -> SessionResult<()> {
        let already = update.device.as_ref().map(|v| v.device.device_id.as_str());
        for member in members.iter().filter(|m| Some(m.as_str()) != already) {
            if let Some(device) = self
                .devices
                .find_txn(txn, &session.session_id, member)?
                .filter(|d| d.is_active)
            {
                let view = self.device_view_txn(txn, &update.snapshot.session, device)?;
                fanout.devices.push((member.clone(), Some(view)));
            }
        }
        Ok(())
    }

    // ========== Session Fields ==========

    pub fn patch_session(&self, req: PatchSession) -> SessionResult<SessionUpdate> {
        req.validate()?;
        let now = now_millis();

        let txn = self.storage.begin_write()?;
        let mut session = self.active_session_txn(&txn, &req.table_id)?;
        if let Some(until) = req.next_order_available_until {
            session.next_order_available_until = Some(until);
        }
        if let Some(ended) = req.session_ended {
            session.session_ended = ended;
        }
        session.updated_at = now;
        self.storage.store_session(&txn, &session)?;

        let update = self.session_update_txn(&txn, &req.table_id, None)?;
        self.commit_and_publish(txn, self.update_fanout(&update, false))?;
        Ok(update)
    }

    /// Set the shared timer of the table's active group
    pub fn update_group_timer(&self, req: UpdateTimer) -> SessionResult<SessionUpdate> {
        req.validate()?;
        let now = now_millis();

        let txn = self.storage.begin_write()?;
        let session = self.active_session_txn(&txn, &req.table_id)?;
        let mut group = self.groups.require_active_txn(&txn, &req.table_id)?;
        group.session_timer = req.timer;
        self.groups.store(&txn, &mut group, now)?;

        let update = self.session_update_txn(&txn, &req.table_id, None)?;
        let mut fanout = self.update_fanout(&update, false);
        self.push_member_views(&txn, &session, &group.devices, &update, &mut fanout)?;
        self.commit_and_publish(txn, fanout)?;

        tracing::debug!(table_id = %req.table_id, remaining = req.timer.remaining_time, "Group timer updated");
        Ok(update)
    }

    // ========== Orders ==========

    /// Turn the device's cart (or its group's shared cart) into a placed order
    pub fn submit_order(&self, req: SubmitOrder) -> SessionResult<OrderSubmitted> {
        req.validate()?;
        let now = now_millis();
        let table_id = req.table_id.as_str();

        let txn = self.storage.begin_write()?;
        let mut session = self.active_session_txn(&txn, table_id)?;
        let target = self.resolve_cart_target(&txn, &session, Some(&req.device_id))?;

        let mut group_members = Vec::new();
        let order = match target {
            CartTarget::Device(mut device) => {
                let order = take_order(&mut device.cart, &req.device_id, now)?;
                device.orders.push(order.clone());
                self.devices.save(&txn, &mut device, now)?;
                order
            }
            CartTarget::Group(mut group) => {
                let order = take_order(&mut group.shared_cart, &req.device_id, now)?;
                group.shared_orders.push(order.clone());
                self.groups.store(&txn, &mut group, now)?;
                group_members = group.devices.clone();
                order
            }
            CartTarget::Table => return Err(SessionError::validation("deviceId is required")),
        };

        let cooldown = i64::try_from(self.order_cooldown.as_millis()).unwrap_or(i64::MAX);
        session.next_order_available_until = Some(now.saturating_add(cooldown));
        session.updated_at = now;
        self.storage.store_session(&txn, &session)?;

        let device = self
            .devices
            .require_active_txn(&txn, &session, &req.device_id)?;
        let update = self.session_update_txn(&txn, table_id, Some(device))?;
        let mut fanout = self.update_fanout(&update, false);
        self.push_member_views(&txn, &session, &group_members, &update, &mut fanout)?;
        self.commit_and_publish(txn, fanout)?;

        tracing::info!(
            table_id = %table_id,
            device_id = %req.device_id,
            order_id = %order.order_id,
            items = order.items.len(),
            "Order placed"
        );
        self.order_sink.dispatch(table_id, &order);
        Ok(OrderSubmitted { order, update })
    }

    // ========== Ending ==========

    /// End the table's session (idempotent)
    ///
    /// The primary transition (session status, devices, table reset) commits
    /// and is published first. Group deactivation runs in its own transaction;
    /// if it fails the error is logged and the next session on the table
    /// cleans it up.
    pub fn end_session(&self, req: EndSession) -> SessionResult<SessionEnded> {
        req.validate()?;
        let now = now_millis();
        let table_id = req.table_id.as_str();

        let txn = self.storage.begin_write()?;
        self.registry.require_txn(&txn, table_id)?;

        let (table, session, left) = match self.storage.get_session_txn(&txn, table_id)? {
            Some(session) if session.is_active() => {
                let (table, ended, left) =
                    self.end_in_txn(&txn, table_id, session, req.reason, now)?;
                (table, Some(ended), left)
            }
            previous => {
                tracing::info!(table_id = %table_id, "No active session, resetting table");
                let table = self.registry.reset_table(&txn, table_id)?;
                (table, previous, Vec::new())
            }
        };

        let mut fanout = Fanout::cleared(&table);
        fanout
            .devices
            .extend(left.into_iter().map(|d| (d.device_id, None)));
        self.commit_and_publish(txn, fanout)?;

        let group_deactivated = match self.deactivate_group(table_id, now) {
            Ok(deactivated) => deactivated,
            Err(e) => {
                tracing::error!(table_id = %table_id, error = %e, "Failed to deactivate group after session end");
                false
            }
        };

        tracing::info!(
            table_id = %table_id,
            reason = ?req.reason,
            session_id = ?session.as_ref().map(|s| s.session_id.as_str()),
            "Session ended"
        );

        Ok(SessionEnded {
            table,
            session,
            group_deactivated,
        })
    }

    /// Payment collaborator entry point
    pub fn complete_payment(&self, table_id: &str) -> SessionResult<SessionEnded> {
        self.end_session(EndSession {
            table_id: table_id.to_string(),
            reason: EndReason::Completed,
        })
    }

    fn end_in_txn(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        mut session: TableSession,
        reason: EndReason,
        now: i64,
    ) -> SessionResult<(Table, TableSession, Vec<DeviceSession>)> {
        session.status = SessionStatus::from(reason);
        session.cart_items.clear();
        session.session_ended = true;
        session.ended_at = Some(now);
        session.updated_at = now;
        self.storage.store_session(txn, &session)?;

        let left = self
            .devices
            .deactivate_all(txn, &session.session_id, now)?;
        let table = self.registry.reset_table(txn, table_id)?;
        Ok((table, session, left))
    }

    fn deactivate_group(&self, table_id: &str, now: i64) -> SessionResult<bool> {
        let txn = self.storage.begin_write()?;
        let group = self.groups.deactivate(&txn, table_id, now)?;
        commit(txn)?;
        Ok(group.is_some())
    }

    // ========== Reads ==========

    /// Current snapshot of the table's active session
    pub fn get_session(&self, table_id: &str) -> SessionResult<TableSnapshot> {
        let txn = self.storage.begin_read()?;
        self.registry.require_txn(&txn, table_id)?;
        self.active_session_txn(&txn, table_id)?;
        self.snapshot_txn(&txn, table_id)
    }

    /// One device's private view, including its isolated cart
    pub fn get_device_view(&self, table_id: &str, device_id: &str) -> SessionResult<DeviceView> {
        let txn = self.storage.begin_read()?;
        let session = self.active_session_txn(&txn, table_id)?;
        let device = self
            .devices
            .require_active_txn(&txn, &session, device_id)?;
        self.device_view_txn(&txn, &session, device)
    }

    /// The table's active synchronized group
    pub fn get_group(&self, table_id: &str) -> SessionResult<SynchronizedGroup> {
        self.groups
            .active(table_id)?
            .ok_or_else(|| SessionError::GroupNotFound(table_id.to_string()))
    }

    // ========== Helpers ==========

    fn active_session_txn(
        &self,
        txn: &impl ReadTxn,
        table_id: &str,
    ) -> SessionResult<TableSession> {
        self.storage
            .get_session_txn(txn, table_id)?
            .filter(TableSession::is_active)
            .ok_or_else(|| SessionError::SessionNotFound(table_id.to_string()))
    }

    fn snapshot_txn(&self, txn: &impl ReadTxn, table_id: &str) -> SessionResult<TableSnapshot> {
        let table = self.registry.require_txn(txn, table_id)?;
        let session = self
            .storage
            .get_session_txn(txn, table_id)?
            .ok_or_else(|| SessionError::SessionNotFound(table_id.to_string()))?;
        let group = self.groups.active_txn(txn, table_id)?;
        let devices = self
            .devices
            .list_active_txn(txn, &session.session_id)?
            .iter()
            .map(DeviceSummary::from)
            .collect();

        Ok(TableSnapshot {
            table,
            session,
            group,
            devices,
        })
    }

    fn device_view_txn(
        &self,
        txn: &impl ReadTxn,
        session: &TableSession,
        device: DeviceSession,
    ) -> SessionResult<DeviceView> {
        let group = match device.group_id.as_deref() {
            Some(group_id) => self.storage.get_group_txn(txn, group_id)?,
            None => None,
        };
        let cart = match &group {
            Some(group) if group.is_active => group.shared_cart.clone(),
            _ => device.cart.clone(),
        };
        Ok(DeviceView {
            session: session.clone(),
            device,
            group,
            cart,
        })
    }

    fn session_update_txn(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        device: Option<DeviceSession>,
    ) -> SessionResult<SessionUpdate> {
        let snapshot = self.snapshot_txn(txn, table_id)?;
        let device = match device {
            Some(device) => Some(self.device_view_txn(txn, &snapshot.session, device)?),
            None => None,
        };
        Ok(SessionUpdate { snapshot, device })
    }

    fn update_fanout(&self, update: &SessionUpdate, global: bool) -> Fanout {
        let table_id = update.snapshot.table.id.clone();
        let mut fanout = Fanout {
            table: Some((table_id, Some(update.snapshot.clone()))),
            global: global.then(|| tables_changed(&update.snapshot.table)),
            ..Default::default()
        };
        if let Some(view) = &update.device {
            fanout
                .devices
                .push((view.device.device_id.clone(), Some(view.clone())));
        }
        fanout
    }

    /// Commit, then publish while still holding the publish lock
    ///
    /// Never begin a transaction while the lock is held: a writer waiting on
    /// the lock may own the write slot.
    fn commit_and_publish(&self, txn: WriteTransaction, fanout: Fanout) -> SessionResult<()> {
        let _order = self.publish_lock.lock();
        commit(txn)?;
        self.publish(fanout);
        Ok(())
    }

    fn publish(&self, fanout: Fanout) {
        if let Some((table_id, snapshot)) = fanout.table {
            self.broadcaster.publish(&table_id, snapshot);
        }
        for (device_id, view) in fanout.devices {
            self.broadcaster.publish_device(&device_id, view);
        }
        if let Some(event) = fanout.global {
            self.broadcaster.publish_global(event);
        }
    }
}

fn commit(txn: WriteTransaction) -> SessionResult<()> {
    txn.commit().map_err(StorageError::from)?;
    Ok(())
}

fn tables_changed(table: &Table) -> TablesChanged {
    TablesChanged {
        table_id: table.id.clone(),
        status: table.status,
        current_guests: table.current_guests,
    }
}

/// Move every line of `cart` into a new placed order
fn take_order(cart: &mut Vec<CartItem>, device_id: &str, now: i64) -> SessionResult<PlacedOrder> {
    if cart.is_empty() {
        return Err(SessionError::validation("cart is empty"));
    }
    Ok(PlacedOrder {
        order_id: new_id(),
        device_id: device_id.to_string(),
        items: std::mem::take(cart),
        placed_at: now,
    })
}

#[cfg(test)]
mod tests;
