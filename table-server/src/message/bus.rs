//! 消息总线核心实现
//!
//! # 架构
//!
//! ```text
//! SessionManager ──▶ Broadcaster::publish*() ──▶ MessageBus
//!                                                   │
//!                                   broadcast::Sender<RoomEvent>
//!                                                   │
//!                     ┌─────────────────────────────┼──────────────────┐
//!                     ▼                             ▼                  ▼
//!             RoomSubscription("table-7")   RoomSubscription(...)   subscribe()
//!                 (SSE stream)                 (SSE stream)         (tests)
//! ```
//!
//! Delivery is at-least-once per connected subscriber and lossy for slow
//! ones: a receiver that falls more than `channel_capacity` events behind
//! gets `Lagged` and must re-pull the snapshot over HTTP.

use super::Broadcaster;
use dashmap::DashMap;
use shared::message::{
    GLOBAL_ROOM, RoomEvent, RoomPayload, TablesChanged, device_room, table_room,
};
use shared::session::{DeviceView, TableSnapshot};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Default capacity of the broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Per-room version counters
///
/// Starts at 0; the first event of a room carries version 1.
#[derive(Debug, Default)]
pub struct RoomVersions {
    versions: DashMap<String, u64>,
}

impl RoomVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version of `room` (0 if nothing was published yet)
    pub fn get(&self, room: &str) -> u64 {
        self.versions.get(room).map(|v| *v).unwrap_or(0)
    }

    /// Forget a room; its next event starts again at version 1
    pub fn remove(&self, room: &str) {
        self.versions.remove(room);
    }

    /// Number of rooms with a counter
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// 消息总线 - room-scoped fan-out of session events
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 服务器到客户端的广播通道
    tx: broadcast::Sender<RoomEvent>,
    versions: Arc<RoomVersions>,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 创建指定容量的消息总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            versions: Arc::new(RoomVersions::new()),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Publish one payload on `room`, stamping the next room version
    ///
    /// The version is bumped and the event sent under the room's entry lock,
    /// so subscribers see versions of one room in increasing order.
    /// Returns the version used.
    pub fn publish_to(&self, room: &str, payload: RoomPayload) -> u64 {
        let mut entry = self.versions.versions.entry(room.to_string()).or_insert(0);
        *entry += 1;
        let version = *entry;

        let event = RoomEvent::new(room, version, payload);
        let kind = event.kind();
        // send 只在没有订阅者时失败, 这不是错误
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(room = %room, version, kind = %kind, receivers, "Event published")
            }
            Err(_) => tracing::trace!(room = %room, version, kind = %kind, "No subscribers"),
        }
        version
    }

    /// 订阅所有房间的事件
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to a single room
    pub fn subscribe_room(&self, room: impl Into<String>) -> RoomSubscription {
        RoomSubscription {
            room: room.into(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn versions(&self) -> &RoomVersions {
        &self.versions
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭消息总线
    ///
    /// Ends every open event stream.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for MessageBus {
    fn publish(&self, table_id: &str, snapshot: Option<TableSnapshot>) {
        self.publish_to(
            &table_room(table_id),
            RoomPayload::SessionUpdate(snapshot.map(Box::new)),
        );
    }

    fn publish_device(&self, device_id: &str, view: Option<DeviceView>) {
        let room = device_room(device_id);
        let closed = view.is_none();
        self.publish_to(&room, RoomPayload::DeviceUpdate(view.map(Box::new)));
        // membership over, the device room's counter is not kept around
        if closed {
            self.versions.remove(&room);
        }
    }

    fn publish_global(&self, event: TablesChanged) {
        self.publish_to(GLOBAL_ROOM, RoomPayload::TablesChanged(event));
    }
}

/// Receiver filtered to one room
#[derive(Debug)]
pub struct RoomSubscription {
    room: String,
    rx: broadcast::Receiver<RoomEvent>,
}

impl RoomSubscription {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Next event of this room
    ///
    /// `Err(Lagged(n))` means events were dropped; the caller should tell the
    /// client to re-pull. `Err(Closed)` means the bus is gone.
    pub async fn recv(&mut self) -> Result<RoomEvent, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.room == self.room {
                return Ok(event);
            }
        }
    }
}
