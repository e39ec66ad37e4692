//! 房间事件流 (SSE)
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/rooms/{room}/events | GET | 单个房间 (`table-*` / `device-*` / `tables`) |
//! | /api/events | GET | 全局桌台变化 (`tables`) |
//!
//! 每个事件的 SSE `id` 是房间版本号。订阅者落后太多时收到 `resync`，
//! 客户端需要重新拉取快照。

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/rooms/{room}/events", get(handler::room_events))
        .route("/api/events", get(handler::global_events))
}
