//! Simbase webhook receiver

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

use crate::simbase::webhook;
use crate::state::AppState;

/// POST /api/webhook/:webhook_id
///
/// Always acknowledges with an empty 200 so Simbase does not retry;
/// malformed or foreign payloads are logged and dropped.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    body: Bytes,
) -> StatusCode {
    if webhook_id != state.webhook_id {
        tracing::warn!("[Webhook] Unknown webhook id {}, ignoring", webhook_id);
        return StatusCode::OK;
    }

    let context = state.context().await;
    if let Ok(outcome) = webhook::process(&body, &state.events, context.as_deref()).await {
        tracing::debug!("[Webhook] {:?}", outcome);
    }

    StatusCode::OK
}
