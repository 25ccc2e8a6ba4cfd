//! Runtime configuration.
//!
//! Loaded from environment variables (a `.env` file is read by the binary
//! before this runs) with env > default priority. Secrets are held behind
//! `secrecy` so they never land in debug output or logs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Error, Result};

/// Application configuration, constructed once at startup and threaded
/// through all handlers via the application state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file. `None` selects the in-memory
    /// store (state is lost on restart, including the dedup records).
    pub database_path: Option<PathBuf>,

    /// Chat platform API base URL.
    pub chat_base_url: String,
    /// Channel access token for the chat platform.
    pub channel_access_token: SecretString,

    /// Completion API base URL (OpenAI-style `/chat/completions`).
    pub completion_base_url: String,
    /// Completion API key.
    pub completion_api_key: SecretString,
    /// Completion model identifier.
    pub completion_model: String,

    /// Completion call budget; the call queue spaces call starts by
    /// `ceil(60000 / requests_per_minute)` milliseconds.
    pub requests_per_minute: u32,
    /// Maximum throttling retries per completion call.
    pub max_retries: u32,
    /// Response cache time-to-live in seconds.
    pub cache_ttl_secs: u64,

    /// Timeout applied to outbound HTTP calls (chat + completion).
    pub request_timeout_secs: u64,
    /// Timeout applied to each persistent-store operation.
    pub persistence_timeout_secs: u64,

    /// Interval between broadcast report sweeps.
    pub broadcast_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("valid default bind address"),
            database_path: None,
            chat_base_url: "https://api.line.me".into(),
            channel_access_token: SecretString::from(String::new()),
            completion_base_url: "https://api.openai.com/v1".into(),
            completion_api_key: SecretString::from(String::new()),
            completion_model: "gpt-5-mini".into(),
            requests_per_minute: 3,
            max_retries: 3,
            cache_ttl_secs: 120,
            request_timeout_secs: 30,
            persistence_timeout_secs: 5,
            broadcast_interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// The two platform credentials are required; everything else falls
    /// back to the defaults above.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            bind_addr: parsed("BIND_ADDR", defaults.bind_addr)?,
            database_path: std::env::var("DATABASE_PATH").ok().map(PathBuf::from),
            chat_base_url: string_or("CHAT_BASE_URL", defaults.chat_base_url),
            channel_access_token: required_secret("CHANNEL_ACCESS_TOKEN")?,
            completion_base_url: string_or("COMPLETION_BASE_URL", defaults.completion_base_url),
            completion_api_key: required_secret("COMPLETION_API_KEY")?,
            completion_model: string_or("COMPLETION_MODEL", defaults.completion_model),
            requests_per_minute: parsed("REQUESTS_PER_MINUTE", defaults.requests_per_minute)?,
            max_retries: parsed("MAX_RETRIES", defaults.max_retries)?,
            cache_ttl_secs: parsed("CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            persistence_timeout_secs: parsed(
                "PERSISTENCE_TIMEOUT_SECS",
                defaults.persistence_timeout_secs,
            )?,
            broadcast_interval_secs: parsed(
                "BROADCAST_INTERVAL_SECS",
                defaults.broadcast_interval_secs,
            )?,
        };

        if config.requests_per_minute == 0 {
            return Err(Error::Config("REQUESTS_PER_MINUTE must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_secs(self.persistence_timeout_secs)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast_interval_secs)
    }
}

fn string_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn required_secret(key: &str) -> Result<SecretString> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
        _ => Err(Error::Config(format!("{key} must be set"))),
    }
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|err| Error::Config(format!("{key}={raw} is invalid: {err}"))),
        _ => Ok(default),
    }
}
