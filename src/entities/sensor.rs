//! State readers for every projection

use serde_json::json;

use super::{Projection, Reading, StateValue};
use crate::models::{Balance, Fleet, ImeiLock, SimState};

/// Shown by the last-SMS sensor before any SMS has arrived
pub const NO_SMS_MARKER: &str = "None";

const FALLBACK_CURRENCY: &str = "EUR";

pub(super) fn read(projection: &Projection, fleet: &Fleet, balance: &Balance) -> Reading {
    match projection {
        Projection::AccountBalance => {
            let mut reading = Reading::new(StateValue::Number(balance.amount()));
            reading.unit = balance.currency.clone();
            reading
        }

        Projection::DataUsage { iccid } => {
            let sim = fleet.get(iccid);
            // API reports bytes; the sensor shows kB
            let kb = sim
                .and_then(|s| s.current_month_usage.as_ref())
                .map(|usage| usage.data.unwrap_or(0.0) / 1024.0)
                .unwrap_or(0.0);

            let mut reading = Reading::new(StateValue::Number(kb));
            reading.unit = Some("kB".to_string());
            if let Some(sim) = sim {
                reading.attributes.insert("iccid".into(), json!(iccid));
                reading.attributes.insert("msisdn".into(), json!(sim.msisdn));
                reading.attributes.insert("imsi".into(), json!(sim.imsi));
            }
            reading
        }

        Projection::MonthlyCost { iccid } => {
            let costs = fleet
                .get(iccid)
                .and_then(|s| s.current_month_costs.as_ref().map(|c| (s, c)));
            let total = costs.and_then(|(_, c)| c.total).unwrap_or(0.0);

            let mut reading = Reading::new(StateValue::Number(total));
            reading.unit = Some(
                balance
                    .currency
                    .clone()
                    .unwrap_or_else(|| FALLBACK_CURRENCY.to_string()),
            );
            if let Some((sim, c)) = costs {
                reading.attributes.insert("data_cost".into(), json!(c.data));
                reading.attributes.insert("sms_cost".into(), json!(c.sms));
                reading.attributes.insert("line_rental".into(), json!(c.line_rental));
                reading.attributes.insert("other_costs".into(), json!(c.other));
                reading.attributes.insert("last_synced".into(), json!(sim.last_update));
            }
            reading
        }

        Projection::LastSms { iccid } => {
            let text = fleet
                .get(iccid)
                .and_then(|s| s.last_sms_text.clone())
                .unwrap_or_else(|| NO_SMS_MARKER.to_string());
            Reading::new(StateValue::Text(text))
        }

        Projection::StatusSwitch { iccid } => {
            let on = fleet.get(iccid).and_then(|s| s.state) == Some(SimState::Enabled);
            Reading::new(StateValue::Switch(on))
        }

        Projection::ImeiLockSwitch { iccid } => {
            let on = fleet.get(iccid).and_then(|s| s.imei_lock) == Some(ImeiLock::On);
            Reading::new(StateValue::Switch(on))
        }
    }
}

pub(super) fn precision(projection: &Projection) -> Option<u8> {
    match projection {
        Projection::DataUsage { .. } => Some(1),
        _ => None,
    }
}

pub(super) fn icon(projection: &Projection) -> Option<&'static str> {
    match projection {
        Projection::DataUsage { .. } => Some("mdi:sim"),
        Projection::MonthlyCost { .. } => Some("mdi:cash-multiple"),
        Projection::LastSms { .. } => Some("mdi:email-alert"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimRecord;

    fn fleet() -> Fleet {
        let records: Vec<SimRecord> = serde_json::from_value(serde_json::json!([
            {
                "iccid": "89001", "name": "Van1", "state": "enabled", "imei_lock": "off",
                "msisdn": "31600000001",
                "current_month_usage": { "data": 2048 },
                "current_month_costs": { "data": 1.5, "sms": 0.25, "line_rental": 2.0,
                                         "other": 0.0, "total": 3.75 },
                "last_update": "2024-05-01T10:00:00Z"
            },
            { "iccid": "89002", "state": "disabled", "imei_lock": "on" }
        ]))
        .unwrap();
        Fleet::from_records(records)
    }

    fn usage(iccid: &str) -> Projection {
        Projection::DataUsage {
            iccid: iccid.to_string(),
        }
    }

    #[test]
    fn test_data_usage_divides_once() {
        let reading = read(&usage("89001"), &fleet(), &Balance::default());
        assert_eq!(reading.value, StateValue::Number(2.0));
        assert_eq!(reading.unit.as_deref(), Some("kB"));
        assert_eq!(reading.attributes["msisdn"], json!("31600000001"));
        assert_eq!(reading.attributes["imsi"], serde_json::Value::Null);
    }

    #[test]
    fn test_data_usage_defaults_to_zero() {
        assert_eq!(
            read(&usage("89002"), &fleet(), &Balance::default()).value,
            StateValue::Number(0.0)
        );
        assert_eq!(
            read(&usage("missing"), &fleet(), &Balance::default()).value,
            StateValue::Number(0.0)
        );
    }

    #[test]
    fn test_balance_and_currency() {
        let balance = Balance {
            balance: Some(42.5),
            currency: Some("GBP".into()),
        };
        let reading = read(&Projection::AccountBalance, &fleet(), &balance);
        assert_eq!(reading.value, StateValue::Number(42.5));
        assert_eq!(reading.unit.as_deref(), Some("GBP"));

        let startup = read(&Projection::AccountBalance, &fleet(), &Balance::default());
        assert_eq!(startup.value, StateValue::Number(0.0));
        assert_eq!(startup.unit, None);
    }

    #[test]
    fn test_monthly_cost_uses_account_currency() {
        let cost = Projection::MonthlyCost {
            iccid: "89001".into(),
        };
        let balance = Balance {
            balance: Some(1.0),
            currency: Some("GBP".into()),
        };

        let reading = read(&cost, &fleet(), &balance);
        assert_eq!(reading.value, StateValue::Number(3.75));
        assert_eq!(reading.unit.as_deref(), Some("GBP"));
        assert_eq!(reading.attributes["sms_cost"], json!(0.25));
        assert_eq!(reading.attributes["last_synced"], json!("2024-05-01T10:00:00Z"));

        let fallback = read(&cost, &fleet(), &Balance::default());
        assert_eq!(fallback.unit.as_deref(), Some("EUR"));

        let no_costs = Projection::MonthlyCost {
            iccid: "89002".into(),
        };
        let reading = read(&no_costs, &fleet(), &balance);
        assert_eq!(reading.value, StateValue::Number(0.0));
        assert!(reading.attributes.is_empty());
    }

    #[test]
    fn test_switch_states() {
        let fleet = fleet();
        let balance = Balance::default();
        let status = |iccid: &str| Projection::StatusSwitch {
            iccid: iccid.to_string(),
        };
        let lock = |iccid: &str| Projection::ImeiLockSwitch {
            iccid: iccid.to_string(),
        };

        assert_eq!(read(&status("89001"), &fleet, &balance).value, StateValue::Switch(true));
        assert_eq!(read(&status("89002"), &fleet, &balance).value, StateValue::Switch(false));
        assert_eq!(read(&lock("89001"), &fleet, &balance).value, StateValue::Switch(false));
        assert_eq!(read(&lock("89002"), &fleet, &balance).value, StateValue::Switch(true));
    }

    #[test]
    fn test_last_sms_marker() {
        let mut fleet = fleet();
        let last = Projection::LastSms {
            iccid: "89001".into(),
        };
        assert_eq!(
            read(&last, &fleet, &Balance::default()).value,
            StateValue::Text(NO_SMS_MARKER.into())
        );

        fleet.sims.get_mut("89001").unwrap().last_sms_text = Some("Hello".into());
        assert_eq!(
            read(&last, &fleet, &Balance::default()).value,
            StateValue::Text("Hello".into())
        );
    }
}
