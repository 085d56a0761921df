//! HTTP handlers module

mod entities;
mod events;
mod services;
mod snapshots;
mod webhook;

pub use self::entities::*;
pub use self::events::*;
pub use self::services::*;
pub use self::snapshots::*;
pub use self::webhook::*;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub ready: bool,
    pub uptime_seconds: u64,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.ready().await.is_ok();
    Json(HealthResponse {
        status: if ready { "ok" } else { "starting" }.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ready,
        uptime_seconds: state.uptime_seconds(),
    })
}
