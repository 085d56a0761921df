//! simbase-bridge - Simbase SIM fleet bridge
//!
//! Polls the Simbase API for SIM status, usage, costs and account balance,
//! exposes them as sensor and switch entities, accepts inbound SMS webhooks
//! and offers an SMS send service.

mod api;
mod config;
mod entities;
mod error;
mod events;
mod models;
mod registry;
mod simbase;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::SetupError;
use crate::events::EventBus;
use crate::simbase::{SimbaseApi, SimbaseClient, SimbaseContext};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simbase_bridge=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting simbase-bridge...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded (entry {})", config.simbase.entry_id);

    let http_client = reqwest::Client::builder()
        .timeout(simbase::client::REQUEST_TIMEOUT)
        .build()?;
    let api: Arc<dyn SimbaseApi> = Arc::new(SimbaseClient::new(
        http_client,
        &config.simbase.base_url,
        &config.simbase.api_key,
    ));

    let events = EventBus::new();
    let state = AppState::new(config.simbase.webhook_id(), events);

    // Setup runs in the background so the webhook is reachable while
    // Simbase is still unavailable
    let setup_task = tokio::spawn(run_setup(config.clone(), api, state.clone()));

    let cors = CorsLayer::permissive();
    let app = api::routes().with_state(state.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    setup_task.abort();
    if let Some(ctx) = state.detach().await {
        ctx.teardown();
    }
    tracing::info!("simbase-bridge stopped");

    Ok(())
}

/// Retry setup until the initial fetches succeed; configuration errors are final.
async fn run_setup(config: Config, api: Arc<dyn SimbaseApi>, state: AppState) {
    let retry = Duration::from_secs(config.server.setup_retry_seconds.max(1));

    loop {
        match SimbaseContext::setup(&config.simbase, api.clone(), state.events.clone()).await {
            Ok(ctx) => {
                state.attach(ctx).await;
                return;
            }
            Err(SetupError::NotReady(e)) => {
                tracing::warn!(
                    "[Simbase] Setup not ready ({}), retrying in {}s",
                    e,
                    retry.as_secs()
                );
                tokio::time::sleep(retry).await;
            }
            Err(e) => {
                tracing::error!("[Simbase] Setup failed: {}", e);
                return;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
