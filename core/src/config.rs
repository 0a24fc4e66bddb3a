//! Client configuration, injected at construction.
//!
//! # Design
//! The base URL is selected by environment: development points at the local
//! functions host, production must name its endpoint explicitly. Every knob
//! can also be set in code, which is what tests do.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_DEV_BASE_URL: &str = "http://localhost:7071/api";

pub const ENV_ENVIRONMENT: &str = "SERIESTRACK_ENV";
pub const ENV_API_URL: &str = "SERIESTRACK_API_URL";
pub const ENV_MAX_RETRIES: &str = "SERIESTRACK_MAX_RETRIES";
pub const ENV_BACKOFF_MS: &str = "SERIESTRACK_BACKOFF_MS";
pub const ENV_TIMEOUT_MS: &str = "SERIESTRACK_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown environment {0:?} (expected \"development\" or \"production\")")]
    UnknownEnvironment(String),

    #[error("SERIESTRACK_API_URL must be set in production")]
    MissingBaseUrl,

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub retry: RetryPolicy,
    /// Per-attempt deadline handed to the transport. `None` leaves it to
    /// the transport's own defaults.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEV_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            request_timeout: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, base_delay: Duration) -> Self {
        self.retry.base_delay = base_delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Read the configuration from `SERIESTRACK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup(ENV_ENVIRONMENT) {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };

        let base_url = match (lookup(ENV_API_URL), environment) {
            (Some(url), _) if !url.trim().is_empty() => url,
            (_, Environment::Development) => DEFAULT_DEV_BASE_URL.to_string(),
            (_, Environment::Production) => return Err(ConfigError::MissingBaseUrl),
        };

        let mut config = ClientConfig::new(base_url.trim());
        if let Some(retries) = parse_number(&lookup, ENV_MAX_RETRIES)? {
            config.retry.max_retries = u32::try_from(retries).map_err(|_| {
                ConfigError::InvalidNumber {
                    var: ENV_MAX_RETRIES,
                    value: retries.to_string(),
                }
            })?;
        }
        if let Some(ms) = parse_number(&lookup, ENV_BACKOFF_MS)? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_number(&lookup, ENV_TIMEOUT_MS)? {
            config.request_timeout = Some(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

fn parse_number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
