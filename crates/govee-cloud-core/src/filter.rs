// ── Supported-model filtering ──

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use govee_cloud_api::DeviceCollection;

/// The only model whose telemetry layout is known: the H5179 Wi-Fi
/// thermo-hygrometer.
pub const DEFAULT_SUPPORTED_SKUS: &[&str] = &["H5179"];

/// Set of model codes (`sku`) whose telemetry is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportedModels(BTreeSet<String>);

impl SupportedModels {
    pub fn new<I, S>(skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(skus.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.0.contains(sku)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for SupportedModels {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_SKUS.iter().copied())
    }
}

/// Drop every record whose `sku` is not supported, warning once per device.
pub fn filter_supported(
    mut collection: DeviceCollection,
    supported: &SupportedModels,
) -> DeviceCollection {
    collection.retain(|record| {
        let keep = supported.contains(&record.sku);
        if !keep {
            warn!(
                device_id = %record.device_id,
                "Not supported device: {}. Model: {}",
                record.device_name,
                record.sku
            );
        }
        keep
    });
    collection
}
