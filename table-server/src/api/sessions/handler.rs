//! Table Session API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::session::{
    CreateSession, DeviceView, EndSession, JoinSession, LeaveSession, MutateCart, PatchSession,
    SessionRequest, SubmitOrder, SynchronizedGroup, TableSnapshot, UpdateCart, UpdateTimer,
};

use crate::core::ServerState;
use crate::sessions::{OrderSubmitted, SessionEnded, SessionOutcome, SessionUpdate};

/// POST /api/requests - 带 `type` 标签的会话请求，统一分发
pub async fn execute(
    State(state): State<ServerState>,
    Json(request): Json<SessionRequest>,
) -> AppResult<ApiResponse<SessionOutcome>> {
    let outcome = state.run_blocking(move |m| m.execute(request)).await?;
    Ok(ApiResponse::success(outcome))
}

/// GET /api/tables/{id}/session - 当前会话快照
pub async fn get_session(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<TableSnapshot>> {
    let snapshot = state.run_blocking(move |m| m.get_session(&id)).await?;
    Ok(ApiResponse::success(snapshot))
}

/// POST /api/tables/{id}/session - 开台 (创建会话)
pub async fn create(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<CreateSession>,
) -> AppResult<ApiResponse<SessionUpdate>> {
    payload.table_id = id;
    let update = state.run_blocking(move |m| m.create_session(payload)).await?;
    Ok(ApiResponse::success(update))
}

/// POST /api/tables/{id}/session/join - 加入已有会话
pub async fn join(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<JoinSession>,
) -> AppResult<ApiResponse<SessionUpdate>> {
    payload.table_id = id;
    let update = state.run_blocking(move |m| m.join_session(payload)).await?;
    Ok(ApiResponse::success(update))
}

/// POST /api/tables/{id}/session/leave - 设备离开
///
/// 最后一台设备离开时会话以 cancelled 结束
pub async fn leave(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<LeaveSession>,
) -> AppResult<ApiResponse<SessionOutcome>> {
    payload.table_id = id;
    let outcome = state.run_blocking(move |m| m.leave_session(payload)).await?;
    Ok(ApiResponse::success(outcome))
}

/// PATCH /api/tables/{id}/session - 修改会话字段
pub async fn patch(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<PatchSession>,
) -> AppResult<ApiResponse<SessionUpdate>> {
    payload.table_id = id;
    let update = state.run_blocking(move |m| m.patch_session(payload)).await?;
    Ok(ApiResponse::success(update))
}

/// PUT /api/tables/{id}/session/cart - 整体替换购物车
pub async fn replace_cart(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<UpdateCart>,
) -> AppResult<ApiResponse<SessionUpdate>> {
    payload.table_id = id;
    let update = state.run_blocking(move |m| m.update_cart(payload)).await?;
    Ok(ApiResponse::success(update))
}

/// POST /api/tables/{id}/session/cart/items - 加减单个商品
pub async fn mutate_cart(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<MutateCart>,
) -> AppResult<ApiResponse<SessionUpdate>> {
    payload.table_id = id;
    let update = state.run_blocking(move |m| m.mutate_cart(payload)).await?;
    Ok(ApiResponse::success(update))
}

/// PUT /api/tables/{id}/session/timer - 更新同组计时器
pub async fn update_timer(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<UpdateTimer>,
) -> AppResult<ApiResponse<SessionUpdate>> {
    payload.table_id = id;
    let update = state
        .run_blocking(move |m| m.update_group_timer(payload))
        .await?;
    Ok(ApiResponse::success(update))
}

/// POST /api/tables/{id}/session/orders - 提交购物车为订单
pub async fn submit_order(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<SubmitOrder>,
) -> AppResult<ApiResponse<OrderSubmitted>> {
    payload.table_id = id;
    let submitted = state.run_blocking(move |m| m.submit_order(payload)).await?;
    Ok(ApiResponse::success(submitted))
}

/// POST /api/tables/{id}/session/end - 结束会话 (默认 cancelled)
pub async fn end(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut payload): Json<EndSession>,
) -> AppResult<ApiResponse<SessionEnded>> {
    payload.table_id = id;
    let ended = state.run_blocking(move |m| m.end_session(payload)).await?;
    Ok(ApiResponse::success(ended))
}

/// POST /api/tables/{id}/session/payment - 支付完成，结束会话 (completed)
pub async fn complete_payment(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SessionEnded>> {
    let ended = state
        .run_blocking(move |m| m.complete_payment(&id))
        .await?;
    Ok(ApiResponse::success(ended))
}

/// GET /api/tables/{id}/devices/{device_id} - 设备视图 (拉取同步)
pub async fn get_device_view(
    State(state): State<ServerState>,
    Path((id, device_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<DeviceView>> {
    let view = state
        .run_blocking(move |m| m.get_device_view(&id, &device_id))
        .await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/tables/{id}/group - 当前活跃同组
pub async fn get_group(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SynchronizedGroup>> {
    let group = state.run_blocking(move |m| m.get_group(&id)).await?;
    Ok(ApiResponse::success(group))
}
