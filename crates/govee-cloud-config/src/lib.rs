//! Configuration for the Govee cloud poller.
//!
//! A TOML file (located via XDG / platform conventions) layered over
//! built-in defaults and under `GOVEE_<SECTION>_<KEY>` environment
//! overrides, credential resolution (env + plaintext), and translation to
//! `govee_cloud_core::PollerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use govee_cloud_core::{
    Credentials, DEFAULT_SUPPORTED_SKUS, DecodePolicy, PollerConfig, SupportedModels, TlsMode,
};

/// Environment variable consulted for the account email.
pub const EMAIL_ENV: &str = "GOVEE_EMAIL";
/// Environment variable consulted for the account password.
pub const PASSWORD_ENV: &str = "GOVEE_PASSWORD";
/// Prefix of environment overrides, e.g. `GOVEE_POLLING_INTERVAL_SECS`.
pub const ENV_PREFIX: &str = "GOVEE_";

const SECTIONS: [&str; 2] = ["account_", "polling_"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured (set it in the config file or ${env})")]
    NoCredentials { what: &'static str, env: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub account: Account,

    #[serde(default)]
    pub polling: Polling,
}

/// Govee account credentials.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Account {
    pub email: Option<String>,

    /// Plaintext password. Prefer `password_env`.
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Polling {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// API host override.
    pub base_url: Option<String>,

    /// Path to an extra CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_skus")]
    pub supported_skus: Vec<String>,

    /// Drop malformed devices instead of failing the whole poll.
    #[serde(default = "default_skip_invalid")]
    pub skip_invalid_devices: bool,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
            base_url: None,
            ca_cert: None,
            supported_skus: default_skus(),
            skip_invalid_devices: default_skip_invalid(),
        }
    }
}

fn default_interval() -> u64 {
    govee_cloud_core::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    30
}
fn default_skus() -> Vec<String> {
    DEFAULT_SUPPORTED_SKUS.iter().map(|s| (*s).to_owned()).collect()
}
fn default_skip_invalid() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "govee-cloud", "govee-cloud").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("govee-cloud");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` over built-in defaults, then apply
/// environment overrides. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(env_overrides());

    let config: Config = figment.extract()?;
    Ok(config)
}

/// `GOVEE_POLLING_INTERVAL_SECS` → `polling.interval_secs`. Only the first
/// underscore after the prefix separates section from key; variables outside
/// a section (`GOVEE_EMAIL`, `GOVEE_PASSWORD`) are left to credential
/// resolution.
fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX)
        .filter(|key| SECTIONS.iter().any(|section| key.starts_with(section)))
        .map(|key| key.as_str().replacen('_', ".", 1).into())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve credentials from the config and the process environment.
pub fn resolve_credentials(account: &Account) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(account, |name| std::env::var(name).ok())
}

/// Resolve credentials with an explicit environment lookup.
///
/// Email: config, then `$GOVEE_EMAIL`. Password: the variable named by
/// `password_env`, then `$GOVEE_PASSWORD`, then plaintext in config.
pub fn resolve_credentials_with(
    account: &Account,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, ConfigError> {
    let email = account
        .email
        .clone()
        .or_else(|| env(EMAIL_ENV))
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            what: "account email",
            env: EMAIL_ENV.into(),
        })?;

    // 1. password_env → env var lookup
    if let Some(pw) = account.password_env.as_deref().and_then(|name| env(name)) {
        return Ok(Credentials::new(email, SecretString::from(pw)));
    }

    // 2. Well-known env var
    if let Some(pw) = env(PASSWORD_ENV) {
        return Ok(Credentials::new(email, SecretString::from(pw)));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = account.password {
        return Ok(Credentials::new(email, SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        what: "account password",
        env: account
            .password_env
            .clone()
            .unwrap_or_else(|| PASSWORD_ENV.into()),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Validate the polling section and combine it with resolved credentials.
pub fn to_poller_config(
    polling: &Polling,
    credentials: Credentials,
) -> Result<PollerConfig, ConfigError> {
    if polling.interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "polling.interval_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if polling.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            field: "polling.timeout_secs".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if polling.supported_skus.is_empty() {
        return Err(ConfigError::Validation {
            field: "polling.supported_skus".into(),
            reason: "at least one model is required".into(),
        });
    }

    let base_url = polling
        .base_url
        .as_deref()
        .map(|raw| {
            raw.parse::<url::Url>().map_err(|_| ConfigError::Validation {
                field: "polling.base_url".into(),
                reason: format!("invalid URL: {raw}"),
            })
        })
        .transpose()?;

    let tls = polling
        .ca_cert
        .clone()
        .map_or(TlsMode::System, TlsMode::CustomCa);

    let decode_policy = if polling.skip_invalid_devices {
        DecodePolicy::SkipInvalid
    } else {
        DecodePolicy::AbortBatch
    };

    let mut config = PollerConfig::new(credentials);
    config.base_url = base_url;
    config.tls = tls;
    config.timeout = Duration::from_secs(polling.timeout_secs);
    config.poll_interval = Duration::from_secs(polling.interval_secs);
    config.supported_models = SupportedModels::new(polling.supported_skus.iter().cloned());
    config.decode_policy = decode_policy;
    Ok(config)
}

/// Resolve credentials and build a `PollerConfig` from a loaded Config.
pub fn resolve(config: &Config) -> Result<PollerConfig, ConfigError> {
    let credentials = resolve_credentials(&config.account)?;
    to_poller_config(&config.polling, credentials)
}
