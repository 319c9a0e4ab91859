use crate::core::types::WebSocketConfig;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// API version used to select the converter; adapters pick their default when unset
    pub version: Option<String>,
    pub rest_base_url: Option<String>,
    pub ws_base_url: Option<String>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub websocket: WebSocketConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            version: None,
            rest_base_url: None,
            ws_base_url: None,
            timeout_seconds: 30,
            max_retries: 3,
            websocket: WebSocketConfig::default(),
        }
    }
}

impl ExchangeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables
    ///
    /// Recognised environment variables (all optional):
    /// - `{EXCHANGE}_API_VERSION` (e.g., `OKEX_API_VERSION`)
    /// - `{EXCHANGE}_REST_URL`
    /// - `{EXCHANGE}_WS_URL`
    /// - `{EXCHANGE}_TIMEOUT_SECONDS`
    /// - `{EXCHANGE}_MAX_RETRIES`
    /// - `{EXCHANGE}_AUTO_RECONNECT`
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let var = |name: &str| env::var(format!("{}_{}", prefix, name)).ok();

        let mut config = Self {
            version: var("API_VERSION"),
            rest_base_url: var("REST_URL"),
            ws_base_url: var("WS_URL"),
            ..Self::default()
        };

        if let Some(raw) = var("TIMEOUT_SECONDS") {
            config.timeout_seconds = parse_var(&prefix, "TIMEOUT_SECONDS", &raw)?;
        }
        if let Some(raw) = var("MAX_RETRIES") {
            config.max_retries = parse_var(&prefix, "MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = var("AUTO_RECONNECT") {
            config.websocket.auto_reconnect = parse_var(&prefix, "AUTO_RECONNECT", &raw)?;
        }

        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// This method first loads environment variables from a .env file (if it exists),
    /// then reads the configuration using the standard environment variable names.
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no .env file, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(exchange_prefix)
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set custom REST base URL (may contain a `{version}` placeholder)
    #[must_use]
    pub fn rest_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.rest_base_url = Some(base_url.into());
        self
    }

    /// Set custom WebSocket base URL (may contain a `{version}` placeholder)
    #[must_use]
    pub fn ws_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.ws_base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub const fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn websocket(mut self, websocket: WebSocketConfig) -> Self {
        self.websocket = websocket;
        self
    }
}

fn parse_var<T: std::str::FromStr>(prefix: &str, name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        ConfigError::InvalidConfiguration(format!("{}_{}='{}': {}", prefix, name, raw, e))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
