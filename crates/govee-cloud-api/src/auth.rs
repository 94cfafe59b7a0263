use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Account credentials for the Govee cloud.
///
/// Immutable once built. The password is kept in a [`SecretString`] so it
/// never shows up in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct Credentials {
    email: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    /// The account email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

/// Bearer token returned by the login endpoint.
///
/// Opaque and bound to one account session. The API gives no expiry
/// timestamp; a token is known to be invalid only when a later call fails.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token string, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}
