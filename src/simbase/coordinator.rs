//! Coordinator: one periodically refreshed snapshot
//!
//! Each coordinator owns a single in-memory snapshot (fleet or balance),
//! refreshes it on its own interval, and notifies subscribers through a
//! `watch` channel whenever the snapshot changes. Readers always get a
//! complete `Arc<T>`; replacement and in-place patches happen under the
//! same write lock so a webhook patch and a full refresh never lose each
//! other's update.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::SimbaseError;
use crate::models::{Balance, Fleet};

/// Fetch function driving one coordinator
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, SimbaseError>> + Send + Sync>;

/// Value held by a coordinator
pub trait Snapshot: Clone + Default + Send + Sync + 'static {
    /// Combine a freshly fetched value with the snapshot it replaces.
    fn merge_previous(self, _previous: &Self) -> Self {
        self
    }
}

impl Snapshot for Balance {}

impl Snapshot for Fleet {
    /// The list endpoint never carries the last inbound SMS; keep the one
    /// the webhook delivered.
    fn merge_previous(mut self, previous: &Self) -> Self {
        for (iccid, sim) in self.sims.iter_mut() {
            if sim.last_sms_text.is_some() {
                continue;
            }
            if let Some(prev) = previous.sims.get(iccid) {
                sim.last_sms_text = prev.last_sms_text.clone();
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub last_update_success: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct State<T> {
    data: Arc<T>,
    status: RefreshStatus,
}

pub struct Coordinator<T: Snapshot> {
    name: &'static str,
    interval: Duration,
    fetch: FetchFn<T>,
    state: RwLock<State<T>>,
    /// Held for the whole duration of a fetch
    in_flight: Mutex<()>,
    /// A forced refresh is already waiting behind the in-flight fetch
    refresh_queued: AtomicBool,
    /// Set on teardown; no fetch result is written after this
    stopped: AtomicBool,
    fetch_count: AtomicU64,
    updates: watch::Sender<u64>,
}

impl<T: Snapshot> Coordinator<T> {
    pub fn new(name: &'static str, interval: Duration, fetch: FetchFn<T>) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            name,
            interval,
            fetch,
            state: RwLock::new(State {
                data: Arc::new(T::default()),
                status: RefreshStatus::default(),
            }),
            in_flight: Mutex::new(()),
            refresh_queued: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            fetch_count: AtomicU64::new(0),
            updates,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current snapshot
    pub async fn current(&self) -> Arc<T> {
        self.state.read().await.data.clone()
    }

    pub async fn status(&self) -> RefreshStatus {
        self.state.read().await.status.clone()
    }

    pub async fn last_update_success(&self) -> bool {
        self.state.read().await.status.last_update_success
    }

    /// Number of fetches started so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Receives a new version number after every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    /// Stop accepting fetch results. The periodic task is aborted separately
    /// through its `JoinHandle`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Mandatory initial fetch; the error is returned to the setup routine.
    pub async fn first_refresh(&self) -> Result<(), SimbaseError> {
        self.refresh().await?;
        tracing::info!("[Coordinator:{}] Initial fetch complete", self.name);
        Ok(())
    }

    /// Fetch now, waiting for any in-flight fetch first.
    pub async fn refresh(&self) -> Result<(), SimbaseError> {
        let _guard = self.in_flight.lock().await;
        self.refresh_locked().await
    }

    /// Out-of-cycle refresh requested by a write action.
    ///
    /// Waits behind an in-flight fetch and then runs one more. While one such
    /// follow-up is already queued, further requests return immediately.
    pub async fn request_refresh(&self) {
        if self.is_stopped() {
            tracing::debug!("[Coordinator:{}] Stopped, ignoring refresh request", self.name);
            return;
        }
        if self.refresh_queued.swap(true, Ordering::AcqRel) {
            tracing::debug!("[Coordinator:{}] Refresh already queued, coalescing", self.name);
            return;
        }

        let _guard = self.in_flight.lock().await;
        self.refresh_queued.store(false, Ordering::Release);
        if self.is_stopped() {
            return;
        }
        let _ = self.refresh_locked().await;
    }

    /// One periodic cycle. Skipped when a fetch is already running.
    async fn tick(&self) {
        match self.in_flight.try_lock() {
            Ok(_guard) => {
                let _ = self.refresh_locked().await;
            }
            Err(_) => {
                tracing::debug!("[Coordinator:{}] Fetch in flight, skipping tick", self.name);
            }
        }
    }

    /// Caller must hold `in_flight`.
    async fn refresh_locked(&self) -> Result<(), SimbaseError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        let result = (self.fetch)().await;
        if self.is_stopped() {
            tracing::debug!("[Coordinator:{}] Stopped during fetch, discarding result", self.name);
            return Ok(());
        }

        match result {
            Ok(fresh) => {
                {
                    let mut state = self.state.write().await;
                    let merged = fresh.merge_previous(&state.data);
                    state.data = Arc::new(merged);
                    state.status = RefreshStatus {
                        last_update_success: true,
                        last_updated: Some(Utc::now()),
                        last_error: None,
                    };
                }
                self.notify();
                tracing::debug!("[Coordinator:{}] Snapshot refreshed", self.name);
                Ok(())
            }
            Err(e) => {
                {
                    let mut state = self.state.write().await;
                    state.status.last_update_success = false;
                    state.status.last_error = Some(e.to_string());
                }
                if e.is_transient() {
                    tracing::warn!("[Coordinator:{}] Fetch failed: {}", self.name, e);
                } else {
                    tracing::error!("[Coordinator:{}] Fetch rejected: {}", self.name, e);
                }
                Err(e)
            }
        }
    }

    /// Mutate the snapshot in place. `apply` returns whether anything changed;
    /// subscribers are notified only in that case.
    pub async fn patch<F>(&self, apply: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        let changed = {
            let mut state = self.state.write().await;
            apply(Arc::make_mut(&mut state.data))
        };
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        self.updates.send_modify(|version| *version += 1);
    }

    /// Run the periodic refresh loop on its own task.
    ///
    /// The first cycle fires one interval from now; the initial fetch is the
    /// setup routine's job. Aborting the handle cancels any in-flight fetch.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "[Coordinator:{}] Starting periodic refresh (interval: {}s)",
                self.name,
                self.interval.as_secs()
            );

            let mut timer = time::interval_at(Instant::now() + self.interval, self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                self.tick().await;
            }
        })
    }
}
