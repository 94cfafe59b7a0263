// ── Poller configuration ──
//
// Everything needed to build a `CloudClient` and drive polling. Built by
// `govee-cloud-config` from TOML, or directly by a host.

use std::time::Duration;

use url::Url;

use govee_cloud_api::transport::DEFAULT_TIMEOUT;
use govee_cloud_api::{CloudClient, Credentials, DecodePolicy, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::filter::SupportedModels;

/// How often the device list is fetched unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub credentials: Credentials,
    /// API host override; `None` means the production host.
    pub base_url: Option<Url>,
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Delay between background polls. Zero disables the background task.
    pub poll_interval: Duration,
    pub supported_models: SupportedModels,
    pub decode_policy: DecodePolicy,
}

impl PollerConfig {
    /// Defaults for everything but the credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: None,
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            supported_models: SupportedModels::default(),
            decode_policy: DecodePolicy::default(),
        }
    }

    pub(crate) fn build_client(&self) -> Result<CloudClient, CoreError> {
        let transport = TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        };
        let client = match &self.base_url {
            Some(url) => CloudClient::with_base_url(url.clone(), &transport)?,
            None => CloudClient::new(&transport)?,
        };
        Ok(client.with_decode_policy(self.decode_policy))
    }
}
