//! In-memory `SimbaseApi` for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::SimbaseApi;
use crate::error::SimbaseError;
use crate::models::{Balance, Fleet, ImeiLock, SimRecord, SimState};

pub struct FakeApi {
    pub fleet: Mutex<Result<Fleet, SimbaseError>>,
    pub balance: Mutex<Result<Balance, SimbaseError>>,
    /// Returned by every write call when set
    pub write_error: Mutex<Option<SimbaseError>>,
    pub last_inbound: Mutex<Option<String>>,
    pub calls: Mutex<Vec<String>>,
    pub fleet_fetches: AtomicUsize,
}

impl FakeApi {
    pub fn new(fleet: Fleet) -> Self {
        Self {
            fleet: Mutex::new(Ok(fleet)),
            balance: Mutex::new(Ok(Balance {
                balance: Some(25.0),
                currency: Some("EUR".to_string()),
            })),
            write_error: Mutex::new(None),
            last_inbound: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            fleet_fetches: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), SimbaseError> {
        self.calls.lock().unwrap().push(call);
        match self.write_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply a write to the scripted fleet so the next fetch reflects it
    fn update_sim(&self, iccid: &str, apply: impl FnOnce(&mut SimRecord)) {
        if let Ok(fleet) = self.fleet.lock().unwrap().as_mut() {
            if let Some(sim) = fleet.sims.get_mut(iccid) {
                apply(sim);
            }
        }
    }
}

pub fn sample_fleet() -> Fleet {
    let records: Vec<SimRecord> = serde_json::from_value(serde_json::json!([
        { "iccid": "89001", "name": "Van1", "state": "enabled", "imei_lock": "off",
          "current_month_usage": { "data": 2048 } },
        { "iccid": "89002", "name": "Van2", "state": "disabled", "imei_lock": "on" }
    ]))
    .unwrap();
    Fleet::from_records(records)
}

#[async_trait]
impl SimbaseApi for FakeApi {
    async fn fetch_fleet(&self) -> Result<Fleet, SimbaseError> {
        self.fleet_fetches.fetch_add(1, Ordering::SeqCst);
        let fleet = self.fleet.lock().unwrap().clone();
        fleet
    }

    async fn fetch_balance(&self) -> Result<Balance, SimbaseError> {
        let balance = self.balance.lock().unwrap().clone();
        balance
    }

    async fn set_sim_state(&self, iccid: &str, state: SimState) -> Result<(), SimbaseError> {
        self.record(format!("set_sim_state {} {}", iccid, state.as_str()))?;
        self.update_sim(iccid, |sim| sim.state = Some(state));
        Ok(())
    }

    async fn set_imei_lock(&self, iccid: &str, lock: ImeiLock) -> Result<(), SimbaseError> {
        self.record(format!("set_imei_lock {} {}", iccid, lock.as_str()))?;
        self.update_sim(iccid, |sim| sim.imei_lock = Some(lock));
        Ok(())
    }

    async fn send_sms(&self, iccid: &str, message: &str) -> Result<(), SimbaseError> {
        self.record(format!("send_sms {} {}", iccid, message))
    }

    async fn fetch_last_inbound_sms(&self, _iccid: &str) -> Result<Option<String>, SimbaseError> {
        let last = self.last_inbound.lock().unwrap().clone();
        Ok(last)
    }
}
