// ── Account session ──
//
// Caller-owned session state: the credentials and the current access token.
// `CloudClient` itself is stateless, so every call takes the token from here.
//
// The API never reports token expiry. A failed device listing is taken as a
// sign the token went stale: the session logs in once more and retries the
// listing exactly once. This is a heuristic; a listing that fails for other
// reasons also costs one extra login.

use tracing::{debug, warn};

use govee_cloud_api::{AccessToken, CloudClient, Credentials, DeviceCollection};

use crate::error::CoreError;

pub struct Session {
    client: CloudClient,
    credentials: Credentials,
    token: Option<AccessToken>,
}

impl Session {
    /// Create a session. No request is made until the first call.
    pub fn new(client: CloudClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            token: None,
        }
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether a token is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Log in and replace the held token.
    ///
    /// On failure the previous token is discarded.
    pub async fn authenticate(&mut self) -> Result<&AccessToken, CoreError> {
        self.token = None;
        let token = self.client.authenticate(&self.credentials).await?;
        debug!(email = self.credentials.email(), "obtained access token");
        Ok(self.token.insert(token))
    }

    /// Fetch the device list, logging in first if no token is held.
    ///
    /// A device-list failure triggers one fresh login and one retry. Login
    /// failures and decode failures are returned as-is.
    pub async fn fetch_devices(&mut self) -> Result<DeviceCollection, CoreError> {
        let token = match self.token.take() {
            Some(token) => token,
            None => self.authenticate().await?.clone(),
        };

        match self.client.list_devices(&token).await {
            Ok(devices) => {
                self.token = Some(token);
                Ok(devices)
            }
            Err(e) if e.is_auth_expired() => {
                warn!(error = %e, "Failed to get devices. Token may be expired.");
                let token = self.authenticate().await?.clone();
                self.client.list_devices(&token).await.map_err(|e| {
                    match CoreError::from(e) {
                        CoreError::Api { message, .. } => CoreError::PollFailed { message },
                        other => other,
                    }
                })
            }
            Err(e) => {
                self.token = Some(token);
                Err(e.into())
            }
        }
    }
}
