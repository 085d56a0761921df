//! Data models for the Simbase bridge

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// SIM cards
// ============================================================================

/// Administrative state of a SIM card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimState {
    Enabled,
    Disabled,
    #[serde(other)]
    Unknown,
}

impl SimState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimState::Enabled => "enabled",
            SimState::Disabled => "disabled",
            SimState::Unknown => "unknown",
        }
    }
}

/// Anti-theft IMEI lock setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImeiLock {
    On,
    Off,
    #[serde(other)]
    Unknown,
}

impl ImeiLock {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImeiLock::On => "on",
            ImeiLock::Off => "off",
            ImeiLock::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthUsage {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub data: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthCosts {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub data: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub line_rental: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub other: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
}

/// One SIM card as returned by `GET /simcards`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRecord {
    pub iccid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<SimState>,
    #[serde(default)]
    pub imei_lock: Option<ImeiLock>,
    #[serde(default)]
    pub msisdn: Option<String>,
    #[serde(default)]
    pub imsi: Option<String>,
    #[serde(default)]
    pub current_month_usage: Option<MonthUsage>,
    #[serde(default)]
    pub current_month_costs: Option<MonthCosts>,
    #[serde(default)]
    pub last_update: Option<String>,
    /// Not part of the list endpoint; filled by the SMS webhook
    #[serde(default)]
    pub last_sms_text: Option<String>,
}

impl SimRecord {
    /// Display name, falling back to the ICCID
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.iccid)
    }
}

/// Fleet snapshot keyed by ICCID
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fleet {
    pub sims: HashMap<String, SimRecord>,
}

impl Fleet {
    pub fn from_records(records: Vec<SimRecord>) -> Self {
        let sims = records
            .into_iter()
            .map(|sim| (sim.iccid.clone(), sim))
            .collect();
        Self { sims }
    }

    pub fn get(&self, iccid: &str) -> Option<&SimRecord> {
        self.sims.get(iccid)
    }

    pub fn len(&self) -> usize {
        self.sims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sims.is_empty()
    }

    /// ICCIDs in a stable order
    pub fn iccids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sims.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[derive(Debug, Deserialize)]
pub struct SimListResponse {
    #[serde(default)]
    pub simcards: Vec<SimRecord>,
}

// ============================================================================
// Account
// ============================================================================

/// `GET /account/balance`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl Balance {
    pub fn amount(&self) -> f64 {
        self.balance.unwrap_or(0.0)
    }
}

// ============================================================================
// SMS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SmsEntry {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SmsListResponse {
    #[serde(default)]
    pub messages: Vec<SmsEntry>,
}

impl SmsListResponse {
    /// First inbound message in API order (most recent first)
    pub fn last_inbound(&self) -> Option<String> {
        self.messages
            .iter()
            .find(|m| m.direction.as_deref() == Some("in"))
            .and_then(|m| m.message.clone())
    }
}

#[derive(Debug, Serialize)]
pub struct SendSmsBody<'a> {
    pub message: &'a str,
}

/// Push notification posted by Simbase to the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub iccid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "deviceName")]
    pub device_name: Option<String>,
}

/// Fired on the event bus for every inbound SMS push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsReceived {
    pub iccid: String,
    pub message: String,
    pub device_name: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Accepts a JSON number, a numeric string or null
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match Option::<NumOrStr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrStr::Num(n)) => Ok(Some(n)),
        Some(NumOrStr::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_keyed_by_iccid() {
        let body = serde_json::json!({
            "simcards": [
                { "iccid": "89001", "name": "Van1", "state": "enabled",
                  "current_month_usage": { "data": 2048 } },
                { "iccid": "89002", "state": "disabled", "imei_lock": "on" }
            ]
        });
        let resp: SimListResponse = serde_json::from_value(body).unwrap();
        let fleet = Fleet::from_records(resp.simcards);

        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet.get("89001").unwrap().display_name(), "Van1");
        assert_eq!(fleet.get("89002").unwrap().display_name(), "89002");
        assert_eq!(fleet.get("89002").unwrap().imei_lock, Some(ImeiLock::On));
        assert_eq!(fleet.iccids(), vec!["89001", "89002"]);
    }

    #[test]
    fn test_unknown_state_tolerated() {
        let sim: SimRecord =
            serde_json::from_value(serde_json::json!({ "iccid": "1", "state": "suspended" }))
                .unwrap();
        assert_eq!(sim.state, Some(SimState::Unknown));
    }

    #[test]
    fn test_balance_accepts_string_amount() {
        let b: Balance =
            serde_json::from_value(serde_json::json!({ "balance": "12.50", "currency": "GBP" }))
                .unwrap();
        assert_eq!(b.amount(), 12.5);
        assert_eq!(b.currency.as_deref(), Some("GBP"));

        let empty: Balance = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(empty.amount(), 0.0);
    }

    #[test]
    fn test_last_inbound_skips_outbound() {
        let resp: SmsListResponse = serde_json::from_value(serde_json::json!({
            "messages": [
                { "direction": "out", "message": "ping" },
                { "direction": "in", "message": "newest" },
                { "direction": "in", "message": "older" }
            ]
        }))
        .unwrap();
        assert_eq!(resp.last_inbound().as_deref(), Some("newest"));

        let none: SmsListResponse = serde_json::from_value(serde_json::json!({
            "messages": [{ "direction": "out", "message": "ping" }]
        }))
        .unwrap();
        assert_eq!(none.last_inbound(), None);
    }

    #[test]
    fn test_last_inbound_without_text_is_absent() {
        let resp: SmsListResponse = serde_json::from_value(serde_json::json!({
            "messages": [
                { "direction": "in" },
                { "direction": "in", "message": "older" }
            ]
        }))
        .unwrap();
        assert_eq!(resp.last_inbound(), None);
    }
}
