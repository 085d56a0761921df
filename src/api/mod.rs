//! API module - HTTP handlers and routes

pub mod admin_guard;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let management = Router::new()
        // Snapshots
        .route("/api/fleet", get(handlers::get_fleet))
        .route("/api/fleet/refresh", post(handlers::refresh_fleet))
        .route("/api/balance", get(handlers::get_balance))
        .route("/api/balance/refresh", post(handlers::refresh_balance))
        // Entities
        .route("/api/entities", get(handlers::list_entities))
        .route("/api/entities/:unique_id", get(handlers::get_entity))
        .route("/api/entities/:unique_id/turn_on", post(handlers::turn_on))
        .route("/api/entities/:unique_id/turn_off", post(handlers::turn_off))
        // Devices and services
        .route("/api/devices", get(handlers::list_devices))
        .route("/api/services/send_sms", post(handlers::send_sms))
        .route("/api/sims/:iccid/sms/last", get(handlers::last_inbound_sms))
        // Events
        .route("/api/events/ws", get(handlers::events_ws))
        .route("/api/events/states/ws", get(handlers::entity_states_ws))
        .route_layer(middleware::from_fn(admin_guard::require_private_network));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/webhook/:webhook_id", post(handlers::receive_webhook))
        .merge(management)
}
