//! Entity state and switch handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::entities::SwitchAction;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/entities
pub async fn list_entities(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(Json(ctx.entity_states().await))
}

/// GET /api/entities/:unique_id
pub async fn get_entity(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    let entity = ctx
        .entity(&unique_id)
        .ok_or_else(|| AppError::NotFound(format!("Entity {} not found", unique_id)))?;
    Ok(Json(ctx.entity_state(entity).await))
}

/// POST /api/entities/:unique_id/turn_on
pub async fn turn_on(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(Json(ctx.switch(&unique_id, SwitchAction::TurnOn).await?))
}

/// POST /api/entities/:unique_id/turn_off
pub async fn turn_off(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.ready().await?;
    Ok(Json(ctx.switch(&unique_id, SwitchAction::TurnOff).await?))
}
