// Govee cloud API response types
//
// Two layers live here. The wire layer (`LoginResponse`, `DeviceListResponse`,
// `DeviceEnvelope`) mirrors the JSON exactly, including the `deviceExt` fields
// that arrive as JSON-encoded strings. The decoded layer (`DeviceRecord` and
// friends) is what the rest of the workspace sees. `DeviceEnvelope::decode` is
// the only place the second decode pass happens.
//
// Telemetry fields are `Option` because the API omits them freely depending
// on device model and firmware. Consumers decide what a missing value means.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Login ────────────────────────────────────────────────────────────

/// Body of the login endpoint response.
///
/// Failed logins usually still come back as JSON, just without `client`:
/// ```json
/// { "message": "Incorrect password", "status": 454 }
/// ```
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub client: Option<LoginClient>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
}

/// The `client` object of a successful login.
#[derive(Debug, Deserialize)]
pub struct LoginClient {
    #[serde(default)]
    pub token: Option<String>,
    /// Catch-all for account metadata we don't use.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Device list ──────────────────────────────────────────────────────

/// Body of the device-list endpoint response.
///
/// Devices are kept as raw values here so one malformed envelope can be
/// reported (or skipped) without losing the rest of the batch.
#[derive(Debug, Deserialize)]
pub struct DeviceListResponse {
    #[serde(default)]
    pub devices: Option<Vec<Value>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
}

/// One device as delivered on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEnvelope {
    /// Unique device identifier (a MAC-like string).
    #[serde(rename = "device")]
    pub device_id: String,
    pub sku: String,
    pub device_name: String,
    #[serde(default)]
    pub version_hard: Option<String>,
    #[serde(default)]
    pub version_soft: Option<String>,
    pub device_ext: RawDeviceExt,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `deviceExt` before decoding: every field is a JSON document in a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceExt {
    pub last_device_data: String,
    pub device_settings: String,
    pub ext_resources: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceEnvelope {
    /// Decode the JSON-encoded `deviceExt` strings into structured values.
    ///
    /// Fails with [`Error::Decode`] naming the first field that does not parse.
    pub fn decode(self) -> Result<DeviceRecord, Error> {
        let Self {
            device_id,
            sku,
            device_name,
            version_hard,
            version_soft,
            device_ext,
            extra,
        } = self;

        let last_device_data =
            decode_field(&device_id, "lastDeviceData", &device_ext.last_device_data)?;
        let device_settings =
            decode_field(&device_id, "deviceSettings", &device_ext.device_settings)?;
        let ext_resources = decode_field(&device_id, "extResources", &device_ext.ext_resources)?;

        Ok(DeviceRecord {
            device_id,
            sku,
            device_name,
            version_hard,
            version_soft,
            device_ext: DeviceExt {
                last_device_data,
                device_settings,
                ext_resources,
                extra: device_ext.extra,
            },
            extra,
        })
    }
}

fn decode_field<T: DeserializeOwned>(
    device_id: &str,
    field: &'static str,
    raw: &str,
) -> Result<T, Error> {
    serde_json::from_str(raw).map_err(|source| Error::Decode {
        device_id: device_id.to_owned(),
        field,
        source,
    })
}

// ── Decoded device ───────────────────────────────────────────────────

/// A device with its `deviceExt` payload fully decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: String,
    /// Model code, e.g. `H5179`.
    pub sku: String,
    pub device_name: String,
    pub version_hard: Option<String>,
    pub version_soft: Option<String>,
    pub device_ext: DeviceExt,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceExt {
    pub last_device_data: LastDeviceData,
    pub device_settings: DeviceSettings,
    pub ext_resources: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Most recent telemetry reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastDeviceData {
    #[serde(default)]
    pub online: Option<bool>,
    /// Epoch milliseconds of the last upload.
    #[serde(default)]
    pub last_time: Option<i64>,
    /// Temperature in hundredths of a degree Celsius.
    #[serde(default)]
    pub tem: Option<i64>,
    /// Relative humidity in hundredths of a percent.
    #[serde(default)]
    pub hum: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Device-side settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    /// Battery level in percent.
    #[serde(default)]
    pub battery: Option<i64>,
    /// Reporting cadence in minutes.
    #[serde(default)]
    pub upload_rate: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Collection ───────────────────────────────────────────────────────

/// Devices from one poll, keyed by device id.
///
/// Ordered so that two collections with the same members compare equal and
/// iterate identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceCollection(BTreeMap<String, DeviceRecord>);

impl DeviceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its own device id, returning any record it replaced.
    pub fn insert(&mut self, record: DeviceRecord) -> Option<DeviceRecord> {
        self.0.insert(record.device_id.clone(), record)
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.0.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.0.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceRecord)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the records for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&DeviceRecord) -> bool) {
        self.0.retain(|_, record| keep(record));
    }
}

impl FromIterator<DeviceRecord> for DeviceCollection {
    fn from_iter<I: IntoIterator<Item = DeviceRecord>>(iter: I) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.insert(record);
        }
        collection
    }
}

impl IntoIterator for DeviceCollection {
    type Item = DeviceRecord;
    type IntoIter = std::collections::btree_map::IntoValues<String, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}
