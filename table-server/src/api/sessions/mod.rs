//! Table Session API 模块
//!
//! 所有写操作都落在 `SessionManager`，路由只负责从路径补全 `tableId`。

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/tables", routes())
        .route("/api/requests", post(handler::execute))
}

fn routes() -> Router<ServerState> {
    let session_routes = Router::new()
        .route(
            "/{id}/session",
            get(handler::get_session)
                .post(handler::create)
                .patch(handler::patch),
        )
        .route("/{id}/session/join", post(handler::join))
        .route("/{id}/session/leave", post(handler::leave))
        .route("/{id}/session/cart", put(handler::replace_cart))
        .route("/{id}/session/cart/items", post(handler::mutate_cart))
        .route("/{id}/session/timer", put(handler::update_timer))
        .route("/{id}/session/orders", post(handler::submit_order))
        .route("/{id}/session/end", post(handler::end))
        .route("/{id}/session/payment", post(handler::complete_payment));

    let view_routes = Router::new()
        .route("/{id}/devices/{device_id}", get(handler::get_device_view))
        .route("/{id}/group", get(handler::get_group));

    session_routes.merge(view_routes)
}
