//! Device model and polling layer between `govee-cloud-api` and a
//! home-automation host.
//!
//! - **[`Session`]** — caller-owned credentials and access token. Fetches
//!   the device list, logging in again and retrying once when the token
//!   appears to have gone stale.
//!
//! - **[`filter_supported`]** — drops devices whose model is not in the
//!   [`SupportedModels`] set before any telemetry is read.
//!
//! - **[`sensor`]** — pure derivations ([`is_fresh`], temperature, humidity,
//!   battery, online) selected per entity through [`SensorKind`].
//!
//! - **[`Poller`]** — runs the session on a fixed interval and publishes the
//!   latest [`Snapshot`] through a `tokio::sync::watch` channel.

pub mod config;
pub mod entity;
pub mod error;
pub mod filter;
pub mod poller;
pub mod sensor;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_POLL_INTERVAL, PollerConfig};
pub use entity::{DeviceInfo, SensorEntity, sensor_entities};
pub use error::CoreError;
pub use filter::{DEFAULT_SUPPORTED_SKUS, SupportedModels, filter_supported};
pub use poller::{Poller, Snapshot};
pub use sensor::{
    DeviceReadings, SensorKind, SensorValue, battery_percent, humidity_percent, is_fresh,
    online_flag, temperature_celsius,
};
pub use session::Session;

// Re-export the API types hosts need without a direct dependency.
pub use govee_cloud_api::{
    AccessToken, Credentials, DecodePolicy, DeviceCollection, DeviceRecord, TlsMode,
};
