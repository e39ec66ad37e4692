//! Session event fan-out
//!
//! [`Broadcaster`] is the seam the session manager publishes through;
//! [`MessageBus`] is the in-process implementation backed by a tokio
//! broadcast channel.

pub mod bus;

pub use bus::{MessageBus, RoomSubscription, RoomVersions};

use shared::message::TablesChanged;
use shared::session::{DeviceView, TableSnapshot};

/// Room-scoped publisher
///
/// Publishing never fails the operation that triggered it: events are
/// best-effort and clients fall back to pulling snapshots.
pub trait Broadcaster: Send + Sync {
    /// Full table snapshot on `table-{tableId}`; `None` means the session was cleared
    fn publish(&self, table_id: &str, snapshot: Option<TableSnapshot>);

    /// Private view on `device-{deviceId}`; `None` means the membership ended
    /// and closes the room (its version counter restarts on the next view)
    fn publish_device(&self, device_id: &str, view: Option<DeviceView>);

    /// "Tables changed" on the global room
    fn publish_global(&self, event: TablesChanged);
}
