// ── Entity descriptors ──
//
// What a host needs to register one sensor entity per supported device and
// kind: a stable unique id, a display name, a unit, and the device it
// belongs to. State is always read back from the latest snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;

use govee_cloud_api::{DeviceCollection, DeviceRecord};

use crate::sensor::{SensorKind, SensorValue};

/// Identifier namespace for devices created by this integration.
pub const DOMAIN: &str = "govee_cloud";

pub const MANUFACTURER: &str = "Govee";

/// Device-registry entry for one physical sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    /// `(DOMAIN, device_id)`
    pub identifier: (String, String),
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
    /// `(DOMAIN, account email)`: devices hang off the cloud account.
    pub via_device: (String, String),
}

impl DeviceInfo {
    pub fn from_record(record: &DeviceRecord, account_email: &str) -> Self {
        Self {
            name: record.device_name.clone(),
            identifier: (DOMAIN.to_owned(), record.device_id.clone()),
            manufacturer: MANUFACTURER.to_owned(),
            model: record.sku.clone(),
            sw_version: record.version_soft.clone().unwrap_or_default(),
            via_device: (DOMAIN.to_owned(), account_email.to_owned()),
        }
    }
}

/// One sensor entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntity {
    pub unique_id: String,
    pub name: String,
    pub kind: SensorKind,
    pub unit: Option<&'static str>,
    pub device_id: String,
    pub device: DeviceInfo,
}

impl SensorEntity {
    pub fn new(kind: SensorKind, record: &DeviceRecord, account_email: &str) -> Self {
        Self {
            unique_id: format!("{}{}", kind.unique_id_prefix(), record.device_id),
            name: format!("{} {kind}", record.device_name),
            kind,
            unit: kind.unit(),
            device_id: record.device_id.clone(),
            device: DeviceInfo::from_record(record, account_email),
        }
    }

    /// Current state from `snapshot`. A device missing from the snapshot
    /// is unavailable.
    pub fn state(&self, snapshot: &DeviceCollection, now: DateTime<Utc>) -> Option<SensorValue> {
        let record = snapshot.get(&self.device_id)?;
        self.kind.derive(record, now)
    }
}

/// Every entity for every device in `devices`, in device-id order.
pub fn sensor_entities(devices: &DeviceCollection, account_email: &str) -> Vec<SensorEntity> {
    devices
        .values()
        .flat_map(|record| {
            SensorKind::iter().map(move |kind| SensorEntity::new(kind, record, account_email))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sensor::tests::{now, record};

    #[test]
    fn entity_naming_follows_device() {
        let rec = record("H5179", true, 0, 10);
        let entity = SensorEntity::new(SensorKind::Temperature, &rec, "me@example.com");

        assert_eq!(entity.unique_id, "tempH5179-dev");
        assert_eq!(entity.name, "Office Temperature");
        assert_eq!(entity.unit, Some("°C"));
        assert_eq!(
            entity.device,
            DeviceInfo {
                name: "Office".into(),
                identifier: (DOMAIN.into(), "H5179-dev".into()),
                manufacturer: "Govee".into(),
                model: "H5179".into(),
                sw_version: "1.04.04".into(),
                via_device: (DOMAIN.into(), "me@example.com".into()),
            }
        );
    }

    #[test]
    fn four_entities_per_device() {
        let devices: DeviceCollection = [record("H5179", true, 0, 10)].into_iter().collect();
        let entities = sensor_entities(&devices, "me@example.com");

        let ids: Vec<_> = entities.iter().map(|e| e.unique_id.as_str()).collect();
        assert_eq!(ids, ["tempH5179-dev", "humH5179-dev", "batH5179-dev", "onlineH5179-dev"]);
    }

    #[test]
    fn state_reads_latest_snapshot() {
        let rec = record("H5179", true, 0, 10);
        let entity = SensorEntity::new(SensorKind::Humidity, &rec, "me@example.com");

        let snapshot: DeviceCollection = [rec].into_iter().collect();
        assert_eq!(entity.state(&snapshot, now()), Some(SensorValue::Float(45.12)));
        assert_eq!(entity.state(&DeviceCollection::new(), now()), None);
    }
}
