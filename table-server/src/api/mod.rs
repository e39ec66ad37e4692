//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`tables`] - 桌台注册与状态
//! - [`sessions`] - 桌台会话、购物车、下单、结束
//! - [`events`] - 房间事件流 (SSE)

pub mod events;
pub mod health;
pub mod sessions;
pub mod tables;

use crate::core::ServerState;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Full application router with middleware and state attached
pub fn build_app(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(tables::router())
        .merge(sessions::router())
        .merge(events::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
