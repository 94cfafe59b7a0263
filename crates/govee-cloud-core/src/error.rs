// ── Core error types ──
//
// Errors surfaced to the host. The `From<govee_cloud_api::Error>` impl maps
// transport-layer failures into domain variants so consumers never match on
// HTTP details.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Malformed data for device {device_id}: {message}")]
    Decode { device_id: String, message: String },

    /// The device list failed again after logging in anew.
    #[error("Failed to get devices: {message}")]
    PollFailed { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Poller has no data yet")]
    NotStarted,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the failure came from the network layer timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<govee_cloud_api::Error> for CoreError {
    fn from(err: govee_cloud_api::Error) -> Self {
        if err.is_timeout() {
            return CoreError::Timeout {
                message: err.to_string(),
            };
        }
        match err {
            govee_cloud_api::Error::Authentication { message, source } => {
                CoreError::AuthenticationFailed {
                    message: with_source(message, source.as_ref()),
                }
            }
            govee_cloud_api::Error::Api {
                message,
                status,
                source,
            } => CoreError::Api {
                message: with_source(message, source.as_ref()),
                status,
            },
            govee_cloud_api::Error::Decode {
                device_id,
                field,
                source,
            } => CoreError::Decode {
                device_id,
                message: format!("{field}: {source}"),
            },
            govee_cloud_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            govee_cloud_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
        }
    }
}

fn with_source<E: std::fmt::Display>(message: String, source: Option<&E>) -> String {
    match source {
        Some(e) => format!("{message} ({e})"),
        None => message,
    }
}
