//! Device registry
//!
//! Maps opaque device ids handed to API consumers onto Simbase identifiers.
//! One device per SIM card plus a single account device that the SIM devices
//! hang off.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Fleet;

pub const DOMAIN: &str = "simbase";
pub const ACCOUNT_IDENTIFIER: &str = "simbase_account";
const MANUFACTURER: &str = "Simbase";

#[derive(Debug, Clone, Serialize)]
pub struct DeviceEntry {
    pub id: String,
    pub domain: &'static str,
    /// ICCID, or `simbase_account` for the account device
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub hw_version: Option<String>,
    pub via_device: Option<String>,
}

impl DeviceEntry {
    pub fn is_account(&self) -> bool {
        self.identifier == ACCOUNT_IDENTIFIER
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceEntry>,
}

impl DeviceRegistry {
    pub fn from_fleet(fleet: &Fleet) -> Self {
        let mut registry = Self::default();

        registry.insert(DeviceEntry {
            id: Uuid::new_v4().to_string(),
            domain: DOMAIN,
            identifier: ACCOUNT_IDENTIFIER.to_string(),
            name: "Simbase Account".to_string(),
            manufacturer: MANUFACTURER,
            model: "Account",
            hw_version: None,
            via_device: None,
        });

        for iccid in fleet.iccids() {
            let name = fleet
                .get(&iccid)
                .map(|sim| sim.display_name().to_string())
                .unwrap_or_else(|| iccid.clone());
            registry.insert(DeviceEntry {
                id: Uuid::new_v4().to_string(),
                domain: DOMAIN,
                identifier: iccid.clone(),
                name,
                manufacturer: MANUFACTURER,
                model: "SIM Card",
                hw_version: Some(iccid),
                via_device: Some(ACCOUNT_IDENTIFIER.to_string()),
            });
        }

        registry
    }

    fn insert(&mut self, entry: DeviceEntry) {
        self.devices.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceEntry> {
        self.devices.get(device_id)
    }

    #[cfg(test)]
    pub fn find_by_identifier(&self, identifier: &str) -> Option<&DeviceEntry> {
        self.devices.values().find(|d| d.identifier == identifier)
    }

    /// Devices ordered by name
    pub fn list(&self) -> Vec<DeviceEntry> {
        let mut devices: Vec<DeviceEntry> = self.devices.values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then(a.identifier.cmp(&b.identifier)));
        devices
    }

    /// Resolve a device id to the ICCID of a SIM card
    pub fn resolve_sim(&self, device_id: &str) -> Result<String, AppError> {
        let device = self
            .get(device_id)
            .ok_or_else(|| AppError::NotFound(format!("Device {} not found in registry", device_id)))?;

        if device.is_account() {
            return Err(AppError::BadRequest(
                "Selected device is not a valid SIM card".to_string(),
            ));
        }
        Ok(device.identifier.clone())
    }
}
