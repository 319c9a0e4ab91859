use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Bad or missing table entry, unregistered API version. Raised at setup.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Caller input rejected before any I/O.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Application-level error reported by the exchange itself.
    #[error("Platform error: {code} - {message}")]
    PlatformError { code: String, message: String },
}

impl ExchangeError {
    /// Whether the failure happened on the wire and may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }

    pub fn is_platform_error(&self) -> bool {
        matches!(self, Self::PlatformError { .. })
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(format!("HTTP request failed: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::TransportError(format!("WebSocket error: {}", err))
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(format!("JSON parsing error: {}", err))
    }
}

impl From<crate::core::config::ConfigError> for ExchangeError {
    fn from(err: crate::core::config::ConfigError) -> Self {
        Self::ConfigurationError(err.to_string())
    }
}
