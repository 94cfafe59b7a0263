// ── Sensor derivation ──
//
// Pure functions from a decoded `DeviceRecord` to the values a host exposes
// as entities. Telemetry is only trusted while the record is fresh; the
// online flag is reported raw.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter};

use govee_cloud_api::DeviceRecord;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Grace margin over the device's own upload cadence, as a ratio of tenths:
/// a reading stays fresh for 12/10 of `uploadRate`.
const GRACE_TENTHS: i64 = 12;

/// Whether the record's telemetry can be trusted at `now`.
///
/// Fresh iff the device reports itself online and its last upload is
/// younger than `uploadRate` minutes plus 20%. Any missing input, or an
/// overflow while computing the window, makes the record stale.
pub fn is_fresh(record: &DeviceRecord, now: DateTime<Utc>) -> bool {
    let data = &record.device_ext.last_device_data;
    if data.online != Some(true) {
        return false;
    }
    let (Some(last_time), Some(upload_rate)) =
        (data.last_time, record.device_ext.device_settings.upload_rate)
    else {
        return false;
    };

    // age < rate * 60_000 * 1.2, scaled by 10 to stay in integers.
    let age_scaled = now
        .timestamp_millis()
        .checked_sub(last_time)
        .and_then(|age| age.checked_mul(10));
    let window_scaled = upload_rate
        .checked_mul(MILLIS_PER_MINUTE)
        .and_then(|ms| ms.checked_mul(GRACE_TENTHS));

    match (age_scaled, window_scaled) {
        (Some(age), Some(window)) => age < window,
        _ => false,
    }
}

/// Temperature in °C, or `None` when stale or unreported.
pub fn temperature_celsius(record: &DeviceRecord, now: DateTime<Utc>) -> Option<f64> {
    if !is_fresh(record, now) {
        return None;
    }
    record
        .device_ext
        .last_device_data
        .tem
        .map(hundredths)
}

/// Relative humidity in %, or `None` when stale or unreported.
pub fn humidity_percent(record: &DeviceRecord, now: DateTime<Utc>) -> Option<f64> {
    if !is_fresh(record, now) {
        return None;
    }
    record
        .device_ext
        .last_device_data
        .hum
        .map(hundredths)
}

/// Battery level in %, or `None` when stale or unreported.
pub fn battery_percent(record: &DeviceRecord, now: DateTime<Utc>) -> Option<i64> {
    if !is_fresh(record, now) {
        return None;
    }
    record.device_ext.device_settings.battery
}

/// The device's own online flag. Not gated by freshness.
pub fn online_flag(record: &DeviceRecord) -> Option<bool> {
    record.device_ext.last_device_data.online
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn hundredths(centi: i64) -> f64 {
    centi as f64 / 100.0
}

// ── SensorKind ───────────────────────────────────────────────────

/// The entities derived from each supported device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Battery,
    Online,
}

/// A derived sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
}

impl SensorKind {
    /// Derive this sensor's value from `record`. `None` means "unavailable".
    pub fn derive(self, record: &DeviceRecord, now: DateTime<Utc>) -> Option<SensorValue> {
        match self {
            Self::Temperature => temperature_celsius(record, now).map(SensorValue::Float),
            Self::Humidity => humidity_percent(record, now).map(SensorValue::Float),
            Self::Battery => battery_percent(record, now).map(SensorValue::Integer),
            Self::Online => online_flag(record).map(SensorValue::Bool),
        }
    }

    /// Whether the value is withheld for stale records.
    pub fn requires_fresh_data(self) -> bool {
        !matches!(self, Self::Online)
    }

    /// Unit of measurement, if any.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::Temperature => Some("°C"),
            Self::Humidity | Self::Battery => Some("%"),
            Self::Online => None,
        }
    }

    /// Prefix of the entity unique id (`{prefix}{device_id}`).
    pub fn unique_id_prefix(self) -> &'static str {
        match self {
            Self::Temperature => "temp",
            Self::Humidity => "hum",
            Self::Battery => "bat",
            Self::Online => "online",
        }
    }
}

// ── DeviceReadings ───────────────────────────────────────────────

/// Every derived value for one device at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReadings {
    pub device_id: String,
    pub device_name: String,
    pub sku: String,
    pub fresh: bool,
    pub temperature_celsius: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub battery_percent: Option<i64>,
    pub online: Option<bool>,
}

impl DeviceReadings {
    pub fn from_record(record: &DeviceRecord, now: DateTime<Utc>) -> Self {
        Self {
            device_id: record.device_id.clone(),
            device_name: record.device_name.clone(),
            sku: record.sku.clone(),
            fresh: is_fresh(record, now),
            temperature_celsius: temperature_celsius(record, now),
            humidity_percent: humidity_percent(record, now),
            battery_percent: battery_percent(record, now),
            online: online_flag(record),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use govee_cloud_api::{DeviceExt, DeviceSettings, LastDeviceData};
    use serde_json::{Map, Value};
    use strum::IntoEnumIterator;

    use super::*;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    /// A record whose last upload happened `age_ms` before [`now`].
    pub(crate) fn record(sku: &str, online: bool, age_ms: i64, upload_rate: i64) -> DeviceRecord {
        DeviceRecord {
            device_id: format!("{sku}-dev"),
            sku: sku.into(),
            device_name: "Office".into(),
            version_hard: None,
            version_soft: Some("1.04.04".into()),
            device_ext: DeviceExt {
                last_device_data: LastDeviceData {
                    online: Some(online),
                    last_time: Some(now().timestamp_millis() - age_ms),
                    tem: Some(2350),
                    hum: Some(4512),
                    extra: Map::new(),
                },
                device_settings: DeviceSettings {
                    battery: Some(87),
                    upload_rate: Some(upload_rate),
                    extra: Map::new(),
                },
                ext_resources: Value::Null,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    #[test]
    fn offline_is_never_fresh() {
        for age in [0, 1_000, 60_000, 10_000_000] {
            assert!(!is_fresh(&record("H5179", false, age, 10), now()));
        }
    }

    #[test]
    fn zero_age_is_fresh_and_thirty_percent_over_is_stale() {
        for rate in [1, 5, 10, 60, 1440] {
            assert!(is_fresh(&record("H5179", true, 0, rate), now()));
            let over = rate * 60_000 * 13 / 10;
            assert!(!is_fresh(&record("H5179", true, over, rate), now()));
        }
    }

    #[test]
    fn grace_window_for_ten_minute_rate() {
        assert!(is_fresh(&record("H5179", true, 660_000, 10), now()));
        assert!(!is_fresh(&record("H5179", true, 780_000, 10), now()));
        // Exactly at the boundary is stale.
        assert!(!is_fresh(&record("H5179", true, 720_000, 10), now()));
        assert!(is_fresh(&record("H5179", true, 719_999, 10), now()));
    }

    #[test]
    fn missing_inputs_fail_closed() {
        let mut no_rate = record("H5179", true, 0, 10);
        no_rate.device_ext.device_settings.upload_rate = None;
        assert!(!is_fresh(&no_rate, now()));

        let mut no_time = record("H5179", true, 0, 10);
        no_time.device_ext.last_device_data.last_time = None;
        assert!(!is_fresh(&no_time, now()));

        let mut no_online = record("H5179", true, 0, 10);
        no_online.device_ext.last_device_data.online = None;
        assert!(!is_fresh(&no_online, now()));

        assert!(!is_fresh(&record("H5179", true, 0, 0), now()));
        assert!(!is_fresh(&record("H5179", true, 0, i64::MAX), now()));
    }

    #[test]
    fn derives_scaled_values_when_fresh() {
        let rec = record("H5179", true, 60_000, 10);
        assert_eq!(temperature_celsius(&rec, now()), Some(23.5));
        assert_eq!(humidity_percent(&rec, now()), Some(45.12));
        assert_eq!(battery_percent(&rec, now()), Some(87));
        assert_eq!(online_flag(&rec), Some(true));
    }

    #[test]
    fn offline_device_reports_flag_but_no_telemetry() {
        let rec = record("H5179", false, 0, 10);
        assert_eq!(online_flag(&rec), Some(false));
        assert_eq!(temperature_celsius(&rec, now()), None);
        assert_eq!(humidity_percent(&rec, now()), None);
        assert_eq!(battery_percent(&rec, now()), None);
    }

    #[test]
    fn stale_online_device_keeps_online_flag() {
        let rec = record("H5179", true, 3_600_000, 10);
        assert_eq!(SensorKind::Online.derive(&rec, now()), Some(SensorValue::Bool(true)));
        assert_eq!(SensorKind::Temperature.derive(&rec, now()), None);
    }

    #[test]
    fn only_online_skips_freshness_gate() {
        let gated: Vec<_> = SensorKind::iter()
            .filter(|k| k.requires_fresh_data())
            .collect();
        assert_eq!(
            gated,
            [SensorKind::Temperature, SensorKind::Humidity, SensorKind::Battery]
        );
    }

    #[test]
    fn readings_collect_every_kind() {
        let readings = DeviceReadings::from_record(&record("H5179", true, 0, 10), now());
        assert!(readings.fresh);
        assert_eq!(readings.temperature_celsius, Some(23.5));
        assert_eq!(readings.humidity_percent, Some(45.12));
        assert_eq!(readings.battery_percent, Some(87));
        assert_eq!(readings.online, Some(true));
    }
}
