//! SimbaseContext: everything owned by one configured Simbase account
//!
//! Built by `setup`, which performs the mandatory initial fetches, and
//! destroyed by `teardown`. Components receive the context explicitly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::SimbaseConfig;
use crate::entities::{build_catalog, Entity, EntityState, SwitchAction};
use crate::error::{AppError, SetupError};
use crate::events::EventBus;
use crate::models::{Balance, Fleet};
use crate::registry::DeviceRegistry;
use crate::simbase::client::SimbaseApi;
use crate::simbase::coordinator::{Coordinator, FetchFn};

/// Returned by the last-inbound-SMS lookup when the SIM has received nothing
pub const NO_MESSAGES: &str = "No messages";

pub struct SimbaseContext {
    pub entry_id: String,
    api: Arc<dyn SimbaseApi>,
    pub fleet: Arc<Coordinator<Fleet>>,
    pub balance: Arc<Coordinator<Balance>>,
    pub events: EventBus,
    pub registry: DeviceRegistry,
    entities: Vec<Entity>,
    live: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SimbaseContext {
    pub async fn setup(
        config: &SimbaseConfig,
        api: Arc<dyn SimbaseApi>,
        events: EventBus,
    ) -> Result<Arc<Self>, SetupError> {
        if config.usage_interval_seconds == 0 || config.balance_interval_seconds == 0 {
            return Err(SetupError::Config(
                "refresh intervals must be positive".to_string(),
            ));
        }

        // Frequent: status, usage, costs
        let fleet_api = api.clone();
        let fleet_fetch: FetchFn<Fleet> = Arc::new(move || {
            let api = fleet_api.clone();
            Box::pin(async move { api.fetch_fleet().await })
        });
        let fleet = Arc::new(Coordinator::new(
            "simbase_sims",
            Duration::from_secs(config.usage_interval_seconds),
            fleet_fetch,
        ));

        // Infrequent: account balance
        let balance_api = api.clone();
        let balance_fetch: FetchFn<Balance> = Arc::new(move || {
            let api = balance_api.clone();
            Box::pin(async move { api.fetch_balance().await })
        });
        let balance = Arc::new(Coordinator::new(
            "simbase_balance",
            Duration::from_secs(config.balance_interval_seconds),
            balance_fetch,
        ));

        fleet.first_refresh().await?;
        balance.first_refresh().await?;

        let snapshot = fleet.current().await;
        let registry = DeviceRegistry::from_fleet(&snapshot);
        let entities = build_catalog(&snapshot);

        let tasks = vec![fleet.clone().spawn(), balance.clone().spawn()];

        tracing::info!(
            "[Simbase] Entry {} ready: {} SIM cards, {} entities, webhook /api/webhook/{}",
            config.entry_id,
            snapshot.len(),
            entities.len(),
            config.webhook_id()
        );

        Ok(Arc::new(Self {
            entry_id: config.entry_id.clone(),
            api,
            fleet,
            balance,
            events,
            registry,
            entities,
            live: AtomicBool::new(true),
            tasks: Mutex::new(tasks),
        }))
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stop both refresh loops (cancelling in-flight fetches) and mark the
    /// context dead so late webhook handlers leave the snapshots alone.
    pub fn teardown(&self) {
        self.live.store(false, Ordering::Release);
        self.fleet.stop();
        self.balance.stop();

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }

        tracing::info!("[Simbase] Entry {} torn down", self.entry_id);
    }

    pub fn api(&self) -> &dyn SimbaseApi {
        self.api.as_ref()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, unique_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.unique_id == unique_id)
    }

    pub async fn entity_state(&self, entity: &Entity) -> EntityState {
        let fleet = self.fleet.current().await;
        let balance = self.balance.current().await;
        entity.state(
            &fleet,
            &balance,
            self.fleet.last_update_success().await,
            self.balance.last_update_success().await,
        )
    }

    /// States of every entity, read from one pair of snapshots
    pub async fn entity_states(&self) -> Vec<EntityState> {
        let fleet = self.fleet.current().await;
        let balance = self.balance.current().await;
        let fleet_ok = self.fleet.last_update_success().await;
        let balance_ok = self.balance.last_update_success().await;

        self.entities
            .iter()
            .map(|e| e.state(&fleet, &balance, fleet_ok, balance_ok))
            .collect()
    }

    pub async fn switch(
        &self,
        unique_id: &str,
        action: SwitchAction,
    ) -> Result<EntityState, AppError> {
        let entity = self
            .entity(unique_id)
            .ok_or_else(|| AppError::NotFound(format!("Entity {} not found", unique_id)))?;

        entity.switch(action, self.api(), &self.fleet).await?;
        Ok(self.entity_state(entity).await)
    }

    /// Send an SMS to the SIM behind a registry device id.
    pub async fn send_sms(&self, device_id: &str, message: &str) -> Result<String, AppError> {
        let iccid = self.registry.resolve_sim(device_id).map_err(|e| {
            tracing::error!("[Simbase] send_sms rejected: {}", e);
            e
        })?;

        match self.api.send_sms(&iccid, message).await {
            Ok(()) => {
                tracing::info!("[Simbase] SMS sent successfully to {}", iccid);
                Ok(iccid)
            }
            Err(e) => {
                tracing::warn!("[Simbase] Failed to send SMS to {}: {}", iccid, e);
                Err(e.into())
            }
        }
    }

    pub async fn last_inbound_sms(&self, iccid: &str) -> Result<String, AppError> {
        let last = self.api.fetch_last_inbound_sms(iccid).await?;
        Ok(last.unwrap_or_else(|| NO_MESSAGES.to_string()))
    }

    /// Store a pushed SMS on the matching fleet record.
    ///
    /// Returns false when the context is torn down or the ICCID is not part
    /// of the fleet; neither is an error.
    pub async fn record_inbound_sms(&self, iccid: &str, message: &str) -> bool {
        if !self.is_live() {
            return false;
        }

        self.fleet
            .patch(|fleet| match fleet.sims.get_mut(iccid) {
                Some(sim) => {
                    sim.last_sms_text = Some(message.to_string());
                    true
                }
                None => false,
            })
            .await
    }
}

impl Drop for SimbaseContext {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(|e| e.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
