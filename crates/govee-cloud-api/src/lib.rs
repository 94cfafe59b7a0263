// govee-cloud-api: Async Rust client for the Govee cloud account API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{AccessToken, Credentials};
pub use client::{CLIENT_ID, CloudClient, DEFAULT_BASE_URL, DecodePolicy};
pub use error::Error;
pub use models::{DeviceCollection, DeviceExt, DeviceRecord, DeviceSettings, LastDeviceData};
pub use transport::{TlsMode, TransportConfig};
