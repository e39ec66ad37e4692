//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 + 存储统计 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::sessions::StorageStats;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageStats>,
    /// 当前事件流订阅数
    subscribers: usize,
}

/// GET /health - 健康检查
async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let storage = state.sessions.storage().clone();
    let stats = tokio::task::spawn_blocking(move || storage.get_stats())
        .await
        .ok()
        .and_then(|r| {
            r.map_err(|e| tracing::warn!(error = %e, "Storage stats unavailable"))
                .ok()
        });

    Json(HealthResponse {
        status: if stats.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        storage: stats,
        subscribers: state.message_bus.subscriber_count(),
    })
}
