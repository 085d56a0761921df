//! Device registry and SMS service handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendSmsRequest {
    /// Registry device id of the target SIM
    pub target_sim: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct SendSmsResponse {
    pub iccid: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct LastSmsResponse {
    pub iccid: String,
    pub message: String,
}

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(Json(ctx.registry.list()))
}

/// POST /api/services/send_sms
pub async fn send_sms(
    State(state): State<AppState>,
    Json(req): Json<SendSmsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    let iccid = ctx.send_sms(&req.target_sim, &req.message).await?;
    Ok(Json(SendSmsResponse {
        iccid,
        message: "SMS queued for delivery".to_string(),
    }))
}

/// GET /api/sims/:iccid/sms/last
pub async fn last_inbound_sms(
    State(state): State<AppState>,
    Path(iccid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    let message = ctx.last_inbound_sms(&iccid).await?;
    Ok(Json(LastSmsResponse { iccid, message }))
}
