//! Live event streams over WebSocket
//!
//! `/api/events/ws` forwards `simbase_sms_received` from the event bus; a
//! client that falls behind skips ahead rather than stalling the bus.
//! `/api/events/states/ws` pushes every entity state whenever the fleet or
//! balance snapshot changes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::AppError;
use crate::events::SMS_RECEIVED_EVENT;
use crate::models::SmsReceived;
use crate::simbase::SimbaseContext;
use crate::state::AppState;

pub const STATE_CHANGED_EVENT: &str = "state_changed";

/// GET /api/events/ws
pub async fn events_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx))
}

pub(crate) fn event_frame(event: &SmsReceived) -> serde_json::Value {
    serde_json::json!({
        "event_type": SMS_RECEIVED_EVENT,
        "iccid": event.iccid,
        "message": event.message,
        "device_name": event.device_name,
        "received_at": event.received_at,
    })
}

/// GET /api/events/states/ws
pub async fn entity_states_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(ws.on_upgrade(move |socket| stream_states(socket, ctx)))
}

async fn states_frame(ctx: &SimbaseContext) -> String {
    let entities = ctx.entity_states().await;
    serde_json::json!({
        "event_type": STATE_CHANGED_EVENT,
        "entities": entities,
    })
    .to_string()
}

async fn stream_states(mut socket: WebSocket, ctx: Arc<SimbaseContext>) {
    let mut fleet_rx = ctx.fleet.subscribe();
    let mut balance_rx = ctx.balance.subscribe();

    if socket.send(Message::Text(states_frame(&ctx).await)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = fleet_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = balance_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    tracing::debug!("[Events] State subscriber disconnected");
                    return;
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                    continue;
                }
                _ => continue,
            },
        }

        if !ctx.is_live() {
            return;
        }
        if socket.send(Message::Text(states_frame(&ctx).await)).await.is_err() {
            return;
        }
    }
}

async fn stream_events(mut socket: WebSocket, mut rx: broadcast::Receiver<SmsReceived>) {
    tracing::debug!("[Events] WebSocket subscriber connected");

    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(event) => {
                    let frame = event_frame(&event).to_string();
                    if socket.send(Message::Text(frame)).await.is_err() {
                        tracing::debug!("[Events] Subscriber went away");
                        return;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[Events] Subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    tracing::debug!("[Events] WebSocket subscriber disconnected");
                    return;
                }
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        return;
                    }
                }
                _ => {}
            },
        }
    }
}
