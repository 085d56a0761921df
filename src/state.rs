//! Shared application state for the HTTP layer

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::error::AppError;
use crate::events::EventBus;
use crate::simbase::SimbaseContext;

/// Handed to every handler. The Simbase context is attached once setup
/// succeeds and detached on shutdown; until then management routes answer
/// "not ready" while the webhook keeps acknowledging.
#[derive(Clone)]
pub struct AppState {
    pub webhook_id: String,
    pub events: EventBus,
    context: Arc<RwLock<Option<Arc<SimbaseContext>>>>,
    start_time: Instant,
}

impl AppState {
    pub fn new(webhook_id: String, events: EventBus) -> Self {
        Self {
            webhook_id,
            events,
            context: Arc::new(RwLock::new(None)),
            start_time: Instant::now(),
        }
    }

    pub async fn context(&self) -> Option<Arc<SimbaseContext>> {
        self.context.read().await.clone()
    }

    /// The live context, or `AppError::NotReady`
    pub async fn ready(&self) -> Result<Arc<SimbaseContext>, AppError> {
        match self.context().await {
            Some(ctx) if ctx.is_live() => Ok(ctx),
            _ => Err(AppError::NotReady),
        }
    }

    pub async fn attach(&self, ctx: Arc<SimbaseContext>) {
        let previous = self.context.write().await.replace(ctx);
        if let Some(old) = previous {
            old.teardown();
        }
    }

    pub async fn detach(&self) -> Option<Arc<SimbaseContext>> {
        self.context.write().await.take()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
