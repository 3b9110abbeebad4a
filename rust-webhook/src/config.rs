//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. The signing secret is the only required
//! value: without it the service refuses to start rather than accept unverified
//! webhooks.

use std::env;
use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::warn;

/// Prefix the identity provider puts in front of the base64 key.
const SECRET_PREFIX: &str = "whsec_";

/// Errors that make the process unable to serve.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("signing secret is not valid base64 after the whsec_ prefix")]
    InvalidSecret,
}

/// Decoded webhook signing key.
///
/// Cloning is cheap enough for startup wiring; the key is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Parse a `whsec_<base64>` secret. The prefix is optional.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let encoded = raw.strip_prefix(SECRET_PREFIX).unwrap_or(raw);

        let key = STANDARD
            .decode(encoded)
            .map_err(|_| ConfigError::InvalidSecret)?;

        if key.is_empty() {
            return Err(ConfigError::InvalidSecret);
        }

        Ok(Self(key))
    }

    /// Build a secret from raw key bytes.
    pub fn from_bytes(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Key used to verify webhook signatures
    pub signing_secret: SigningSecret,

    /// Maximum distance in seconds between a webhook timestamp and now
    pub webhook_tolerance_secs: u64,

    /// Base URL of the user service; the in-memory store is used when unset
    pub user_store_url: Option<String>,

    /// Optional bearer token sent to the user service
    pub user_store_token: Option<String>,

    /// Upper bound on every user store call
    pub user_store_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_secret = lookup("CLERK_SIGNING_SECRET")
            .or_else(|| lookup("CLERK_WEBHOOK_SECRET"))
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingVar("CLERK_SIGNING_SECRET"))?;

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080),

            signing_secret: SigningSecret::parse(&raw_secret)?,

            webhook_tolerance_secs: parse_or(&lookup, "WEBHOOK_TOLERANCE_SECS", 300), // 5 minutes

            user_store_url: non_empty(lookup("USER_STORE_URL")),

            user_store_token: non_empty(lookup("USER_STORE_TOKEN")),

            user_store_timeout_ms: parse_or(&lookup, "USER_STORE_TIMEOUT_MS", 5000),
        })
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook_tolerance_secs)
    }

    pub fn user_store_timeout(&self) -> Duration {
        Duration::from_millis(self.user_store_timeout_ms)
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = match lookup(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
