//! Fleet and balance snapshot handlers

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::simbase::coordinator::{Coordinator, Snapshot};
use crate::state::AppState;

async fn snapshot_body<T>(coordinator: &Arc<Coordinator<T>>) -> serde_json::Value
where
    T: Snapshot + Serialize,
{
    let data = coordinator.current().await;
    let status = coordinator.status().await;
    serde_json::json!({
        "name": coordinator.name(),
        "interval_seconds": coordinator.interval().as_secs(),
        "fetch_count": coordinator.fetch_count(),
        "status": status,
        "data": &*data,
    })
}

/// GET /api/fleet
pub async fn get_fleet(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(Json(snapshot_body(&ctx.fleet).await))
}

/// POST /api/fleet/refresh - coalesced with any refresh already running
pub async fn refresh_fleet(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    ctx.fleet.request_refresh().await;
    Ok(Json(snapshot_body(&ctx.fleet).await))
}

/// GET /api/balance
pub async fn get_balance(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(Json(snapshot_body(&ctx.balance).await))
}

/// POST /api/balance/refresh
pub async fn refresh_balance(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    ctx.balance.request_refresh().await;
    Ok(Json(snapshot_body(&ctx.balance).await))
}
