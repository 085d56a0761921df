//! Entity projections
//!
//! Every entity is a read-only view over the current fleet and balance
//! snapshots. The set of entity kinds is closed: one account balance plus
//! five per SIM card. The two switch kinds can also write through the API
//! client (see `switch`).

mod sensor;
mod switch;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Balance, Fleet};

pub use self::switch::SwitchAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Fleet,
    Balance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    AccountBalance,
    DataUsage { iccid: String },
    MonthlyCost { iccid: String },
    LastSms { iccid: String },
    StatusSwitch { iccid: String },
    ImeiLockSwitch { iccid: String },
}

impl Projection {
    pub fn unique_id(&self) -> String {
        match self {
            Projection::AccountBalance => "simbase_account_balance".to_string(),
            Projection::DataUsage { iccid } => format!("{}_data_usage", iccid),
            Projection::MonthlyCost { iccid } => format!("{}_monthly_cost", iccid),
            Projection::LastSms { iccid } => format!("{}_last_sms", iccid),
            Projection::StatusSwitch { iccid } => format!("{}_status", iccid),
            Projection::ImeiLockSwitch { iccid } => format!("{}_imei_lock", iccid),
        }
    }

    pub fn iccid(&self) -> Option<&str> {
        match self {
            Projection::AccountBalance => None,
            Projection::DataUsage { iccid }
            | Projection::MonthlyCost { iccid }
            | Projection::LastSms { iccid }
            | Projection::StatusSwitch { iccid }
            | Projection::ImeiLockSwitch { iccid } => Some(iccid),
        }
    }

    /// Snapshots this projection derives its state from
    pub fn reads(&self) -> &'static [SnapshotKind] {
        match self {
            Projection::AccountBalance => &[SnapshotKind::Balance],
            Projection::MonthlyCost { .. } => &[SnapshotKind::Fleet, SnapshotKind::Balance],
            _ => &[SnapshotKind::Fleet],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Projection::StatusSwitch { .. } | Projection::ImeiLockSwitch { .. } => "switch",
            _ => "sensor",
        }
    }

    fn name_suffix(&self) -> &'static str {
        match self {
            Projection::AccountBalance => "",
            Projection::DataUsage { .. } => "Data Usage",
            Projection::MonthlyCost { .. } => "Monthly Cost",
            Projection::LastSms { .. } => "Last SMS",
            Projection::StatusSwitch { .. } => "Status",
            Projection::ImeiLockSwitch { .. } => "IMEI Lock",
        }
    }
}

/// Displayed state value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Number(f64),
    Text(String),
    Switch(bool),
}

/// What a projection reads out of the snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: StateValue,
    pub unit: Option<String>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Reading {
    fn new(value: StateValue) -> Self {
        Self {
            value,
            unit: None,
            attributes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub kind: &'static str,
    pub value: StateValue,
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    pub reads: &'static [SnapshotKind],
    pub available: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// A registered entity: projection plus the name fixed when it was created
#[derive(Debug, Clone)]
pub struct Entity {
    pub unique_id: String,
    pub name: String,
    pub projection: Projection,
}

impl Entity {
    pub fn new(projection: Projection, fleet: &Fleet) -> Self {
        let name = match projection.iccid() {
            None => "Simbase Account Balance".to_string(),
            Some(iccid) => {
                let base = fleet
                    .get(iccid)
                    .map(|sim| sim.display_name())
                    .unwrap_or(iccid);
                format!("{} {}", base, projection.name_suffix())
            }
        };
        Self {
            unique_id: projection.unique_id(),
            name,
            projection,
        }
    }

    /// Project the current snapshots.
    ///
    /// `fleet_ok` / `balance_ok` are the coordinators' last-update results.
    pub fn state(
        &self,
        fleet: &Fleet,
        balance: &Balance,
        fleet_ok: bool,
        balance_ok: bool,
    ) -> EntityState {
        let reading = sensor::read(&self.projection, fleet, balance);

        let sources_ok = self.projection.reads().iter().all(|kind| match kind {
            SnapshotKind::Fleet => fleet_ok,
            SnapshotKind::Balance => balance_ok,
        });
        let present = self
            .projection
            .iccid()
            .map(|iccid| fleet.get(iccid).is_some())
            .unwrap_or(true);

        EntityState {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            kind: self.projection.kind(),
            value: reading.value,
            unit: reading.unit,
            precision: sensor::precision(&self.projection),
            icon: sensor::icon(&self.projection),
            reads: self.projection.reads(),
            available: sources_ok && present,
            attributes: reading.attributes,
        }
    }
}

/// Entity catalog for a fleet: the account balance, then five per SIM
pub fn build_catalog(fleet: &Fleet) -> Vec<Entity> {
    let mut entities = vec![Entity::new(Projection::AccountBalance, fleet)];

    for iccid in fleet.iccids() {
        for projection in [
            Projection::DataUsage { iccid: iccid.clone() },
            Projection::MonthlyCost { iccid: iccid.clone() },
            Projection::LastSms { iccid: iccid.clone() },
            Projection::StatusSwitch { iccid: iccid.clone() },
            Projection::ImeiLockSwitch { iccid: iccid.clone() },
        ] {
            entities.push(Entity::new(projection, fleet));
        }
    }

    entities
}
