//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::session::{Table, TableStatusUpdate, TableUpsert};

use crate::core::ServerState;

/// GET /api/tables - 获取所有桌台
pub async fn list(State(state): State<ServerState>) -> AppResult<ApiResponse<Vec<Table>>> {
    let tables = state.run_blocking(|m| m.list_tables()).await?;
    Ok(ApiResponse::success(tables))
}

/// GET /api/tables/{id} - 获取单个桌台
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Table>> {
    let table = state.run_blocking(move |m| m.get_table(&id)).await?;
    Ok(ApiResponse::success(table))
}

/// PUT /api/tables/{id} - 注册或更新桌台 (不改变占用状态)
pub async fn upsert(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<TableUpsert>,
) -> AppResult<ApiResponse<Table>> {
    let table = state
        .run_blocking(move |m| m.upsert_table(&id, payload))
        .await?;
    Ok(ApiResponse::success(table))
}

/// PUT /api/tables/{id}/status - 手动修改桌台状态
pub async fn set_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<TableStatusUpdate>,
) -> AppResult<ApiResponse<Table>> {
    let table = state
        .run_blocking(move |m| m.set_table_status(&id, payload.status))
        .await?;
    Ok(ApiResponse::success(table))
}
