use thiserror::Error;

/// Top-level error type for the `govee-cloud-api` crate.
///
/// The vendor API has two calls, and each maps onto its own variant:
/// login failures are [`Authentication`](Self::Authentication), device-list
/// failures are [`Api`](Self::Api). Transport failures (connection refused,
/// timeout, TLS) are folded into whichever call they happened on, with the
/// `reqwest` error preserved as the source.
#[derive(Debug, Error)]
pub enum Error {
    // ── Login ───────────────────────────────────────────────────────
    /// Login failed: bad credentials, malformed response, or transport failure.
    ///
    /// `message` carries the raw response body when one was received.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    // ── Device list ─────────────────────────────────────────────────
    /// Device listing failed: token rejected, `devices` field missing,
    /// malformed response, or transport failure.
    #[error("Device list request failed: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// One of a device's JSON-encoded `deviceExt` fields failed to decode.
    #[error("Failed to decode `{field}` for device {device_id}: {source}")]
    Decode {
        device_id: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    // ── Construction ────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn api(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Api {
            message: message.into(),
            status,
            source: None,
        }
    }

    /// Returns `true` if the access token has probably stopped working and
    /// logging in again might resolve it.
    ///
    /// The API never reports token expiry explicitly, so every device-list
    /// failure is treated as a candidate.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Returns `true` if the underlying HTTP call timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Authentication {
                source: Some(e), ..
            }
            | Self::Api {
                source: Some(e), ..
            } => e.is_timeout(),
            _ => false,
        }
    }

    /// The HTTP status code, if the failure came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::Authentication {
                source: Some(e), ..
            } => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Truncate a response body for inclusion in an error message.
pub(crate) fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
