//! Event Stream Handlers

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use shared::error::{AppError, AppResult};
use shared::message::{GLOBAL_ROOM, RoomEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::message::RoomSubscription;

/// Name of the event sent when a subscriber missed events
pub const RESYNC_EVENT: &str = "resync";

/// First event of every stream, `id` is the room version at subscribe time
pub const READY_EVENT: &str = "ready";

/// GET /api/rooms/{room}/events - 订阅单个房间
pub async fn room_events(
    State(state): State<ServerState>,
    Path(room): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if room.trim().is_empty() {
        return Err(AppError::validation("room is required"));
    }
    tracing::debug!(room = %room, "Event stream opened");
    Ok(open_stream(&state, room))
}

/// GET /api/events - 订阅全局桌台变化
pub async fn global_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    open_stream(&state, GLOBAL_ROOM.to_string())
}

fn open_stream(
    state: &ServerState,
    room: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let bus = &state.message_bus;
    // 先订阅再读版本，ready 之后不会漏事件
    let subscription = bus.subscribe_room(room.clone());
    let ready = Event::default()
        .event(READY_EVENT)
        .id(bus.versions().get(&room).to_string())
        .data(room);

    let stream = futures::stream::once(async move { Ok::<_, Infallible>(ready) })
        .chain(event_stream(subscription, bus.shutdown_token().clone()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// 订阅转换为 SSE 流，关闭信号或总线关闭时结束
fn event_stream(
    subscription: RoomSubscription,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(
        (subscription, shutdown),
        |(mut subscription, shutdown)| async move {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return None,
                next = subscription.recv() => next,
            };
            let event = match next {
                Ok(event) => to_sse(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        room = %subscription.room(),
                        skipped,
                        "Event subscriber lagged, asking client to resync"
                    );
                    Event::default()
                        .event(RESYNC_EVENT)
                        .data(skipped.to_string())
                }
                Err(RecvError::Closed) => return None,
            };
            Some((Ok(event), (subscription, shutdown)))
        },
    )
}

fn to_sse(event: &RoomEvent) -> Event {
    let sse = Event::default()
        .event(event.kind().to_string())
        .id(event.version.to_string());
    match sse.json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            tracing::error!(room = %event.room, error = %e, "Failed to encode room event");
            Event::default()
                .event(RESYNC_EVENT)
                .id(event.version.to_string())
                .data("encode")
        }
    }
}
