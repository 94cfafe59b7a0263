// Govee cloud HTTP client
//
// Wraps `reqwest::Client` with the two endpoints the integration needs:
// account login and device listing. The client is stateless with respect to
// the session: the access token is returned to the caller on login and
// passed back in on every listing.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AccessToken, Credentials};
use crate::error::{Error, preview};
use crate::models::{DeviceCollection, DeviceEnvelope, DeviceListResponse, LoginResponse};
use crate::transport::TransportConfig;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://app2.govee.com";

/// Client id the official app identifies itself with. The login body and
/// the device-list headers must both carry it.
pub const CLIENT_ID: &str = "b529ce1f1bd14ff29120b697bd308aa5";

const LOGIN_PATH: &str = "/account/rest/account/v1/login";
const DEVICE_LIST_PATH: &str = "/device/rest/devices/v1/list";

// Fingerprint headers expected by the device-list endpoint. Changing these
// can get requests rejected.
const APP_VERSION: &str = "4.7.0";
const CLIENT_TYPE: &str = "1";
const IOT_VERSION: &str = "0";

/// What to do when a single device envelope fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Drop the offending device, log a warning, keep the rest.
    #[default]
    SkipInvalid,
    /// Fail the whole listing with [`Error::Decode`].
    AbortBatch,
}

/// HTTP client for the Govee cloud account API.
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    decode_policy: DecodePolicy,
}

impl CloudClient {
    /// Create a client against the production API host.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(DEFAULT_BASE_URL)?;
        Self::with_base_url(base_url, transport)
    }

    /// Create a client against a custom host (proxies, mock servers).
    pub fn with_base_url(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            decode_policy: DecodePolicy::default(),
        }
    }

    /// Choose how malformed device envelopes are handled.
    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn decode_policy(&self) -> DecodePolicy {
        self.decode_policy
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Log in and return the account's access token.
    ///
    /// `POST /account/rest/account/v1/login`. Any failure, including
    /// transport errors and a response without `client.token`, is an
    /// [`Error::Authentication`]. No retry is attempted here.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, Error> {
        let url = self.endpoint(LOGIN_PATH)?;
        debug!(email = credentials.email(), "POST {}", url);

        let body = json!({
            "email": credentials.email(),
            "client": CLIENT_ID,
            "password": credentials.password().expose_secret(),
        });

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("login request for {} failed", credentials.email()),
                source: Some(e),
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Authentication {
            message: "failed to read login response".into(),
            source: Some(e),
        })?;

        if !status.is_success() {
            return Err(Error::authentication(format!(
                "login failed (HTTP {status}): {}",
                preview(&text)
            )));
        }

        let parsed: LoginResponse = serde_json::from_str(&text).map_err(|e| {
            Error::authentication(format!(
                "malformed login response ({e}): {}",
                preview(&text)
            ))
        })?;

        match parsed.client.and_then(|c| c.token) {
            Some(token) => {
                debug!("login successful");
                Ok(AccessToken::new(token))
            }
            None => Err(Error::authentication(format!(
                "no access token for user {}. Response: {}",
                credentials.email(),
                preview(&text)
            ))),
        }
    }

    // ── Device list ──────────────────────────────────────────────────

    /// Fetch every device on the account, with `deviceExt` decoded.
    ///
    /// `POST /device/rest/devices/v1/list` with an empty body. A response
    /// without a `devices` field usually means the token has expired; it is
    /// reported as [`Error::Api`] so the caller can log in again.
    pub async fn list_devices(&self, token: &AccessToken) -> Result<DeviceCollection, Error> {
        let url = self.endpoint(DEVICE_LIST_PATH)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .header("Appversion", APP_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .header("clientId", CLIENT_ID)
            .header("clientType", CLIENT_TYPE)
            .header("iotVersion", IOT_VERSION)
            .send()
            .await
            .map_err(|e| Error::Api {
                message: "device list request failed".into(),
                status: None,
                source: Some(e),
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Api {
            message: "failed to read device list response".into(),
            status: Some(status.as_u16()),
            source: Some(e),
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::api(
                format!("token rejected (HTTP {status})"),
                Some(status.as_u16()),
            ));
        }

        if !status.is_success() {
            return Err(Error::api(
                format!("HTTP {status}: {}", preview(&text)),
                Some(status.as_u16()),
            ));
        }

        let parsed: DeviceListResponse = serde_json::from_str(&text).map_err(|e| {
            Error::api(
                format!("malformed device list response ({e}): {}", preview(&text)),
                Some(status.as_u16()),
            )
        })?;

        let Some(devices) = parsed.devices else {
            return Err(Error::api(
                format!(
                    "response has no `devices` field, token may be expired: {}",
                    parsed.message.as_deref().unwrap_or_else(|| preview(&text))
                ),
                Some(status.as_u16()),
            ));
        };

        let mut collection = DeviceCollection::new();
        for raw in devices {
            match decode_device(raw) {
                Ok(record) => {
                    collection.insert(record);
                }
                Err(e) => match self.decode_policy {
                    DecodePolicy::AbortBatch => return Err(e),
                    DecodePolicy::SkipInvalid => {
                        warn!(error = %e, "skipping device with malformed data");
                    }
                },
            }
        }

        debug!(count = collection.len(), "device list decoded");
        Ok(collection)
    }
}

/// Decode one raw envelope value, attributing failures to its device id.
fn decode_device(raw: serde_json::Value) -> Result<crate::models::DeviceRecord, Error> {
    let device_id = raw
        .get("device")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("<unknown>")
        .to_owned();

    let envelope: DeviceEnvelope =
        serde_json::from_value(raw).map_err(|source| Error::Decode {
            device_id,
            field: "envelope",
            source,
        })?;

    envelope.decode()
}
