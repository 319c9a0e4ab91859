use crate::core::client::{ConverterRegistry, PlatformRestClient, PlatformWsClient};
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClientBuilder, RestClientConfig, TungsteniteWs};
use crate::core::types::{Platform, WebSocketConfig};
use crate::exchanges::okex::{
    codec::OkexCodec, rest::rest_converter, ws::ws_converter, DEFAULT_VERSION, PLATFORM_ID,
};
use tracing::info;

const SUPPORTED_VERSIONS: [&str; 1] = ["1"];

/// Builder for OKEx clients
///
/// Wraps an `ExchangeConfig` with fluent setters; everything it sets can also
/// come from the environment via `ExchangeConfig::from_env("OKEX")`.
#[derive(Debug, Clone, Default)]
pub struct OkexBuilder {
    config: ExchangeConfig,
}

impl OkexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.config = self.config.version(version);
        self
    }

    pub fn with_rest_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.rest_base_url(base_url);
        self
    }

    pub fn with_ws_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config = self.config.ws_base_url(base_url);
        self
    }

    pub fn with_rest_timeout(mut self, timeout: u64) -> Self {
        self.config = self.config.timeout_seconds(timeout);
        self
    }

    pub fn with_rest_max_retries(mut self, retries: u32) -> Self {
        self.config = self.config.max_retries(retries);
        self
    }

    pub fn with_websocket(mut self, websocket: WebSocketConfig) -> Self {
        self.config = self.config.websocket(websocket);
        self
    }

    pub fn build_rest_client(self) -> Result<PlatformRestClient<ReqwestRest>, ExchangeError> {
        build_rest_client(self.config)
    }

    pub fn build_ws_client(
        self,
    ) -> Result<PlatformWsClient<TungsteniteWs, OkexCodec>, ExchangeError> {
        build_ws_client(self.config)
    }
}

fn selected_version(config: &ExchangeConfig) -> &str {
    config.version.as_deref().unwrap_or(DEFAULT_VERSION)
}

/// REST converters for every supported version, with the configured one selected
pub fn rest_converters(config: &ExchangeConfig) -> Result<ConverterRegistry, ExchangeError> {
    SUPPORTED_VERSIONS.iter().try_fold(
        ConverterRegistry::new(Platform::Okex, selected_version(config)),
        |registry, version| {
            Ok(registry.with_converter(rest_converter(version, config.rest_base_url.as_deref())?))
        },
    )
}

/// WebSocket converters for every supported version, with the configured one selected
pub fn ws_converters(config: &ExchangeConfig) -> Result<ConverterRegistry, ExchangeError> {
    SUPPORTED_VERSIONS.iter().try_fold(
        ConverterRegistry::new(Platform::Okex, selected_version(config)),
        |registry, version| {
            Ok(registry.with_converter(ws_converter(version, config.ws_base_url.as_deref())?))
        },
    )
}

/// REST client over reqwest
///
/// An unsupported `version` surfaces as `ConfigurationError` on the first call.
pub fn build_rest_client(
    config: ExchangeConfig,
) -> Result<PlatformRestClient<ReqwestRest>, ExchangeError> {
    let converters = rest_converters(&config)?;
    let base_url = converters
        .current()
        .map(|converter| converter.base_url())
        .unwrap_or_default();

    let rest_config =
        RestClientConfig::from_exchange_config(base_url, PLATFORM_ID.to_string(), &config);
    let rest = RestClientBuilder::new(rest_config).build()?;

    info!(version = %converters.selected(), "Built OKEx REST client");
    Ok(PlatformRestClient::new(rest, converters))
}

/// WebSocket client over tungstenite; not connected yet
pub fn build_ws_client(
    config: ExchangeConfig,
) -> Result<PlatformWsClient<TungsteniteWs, OkexCodec>, ExchangeError> {
    let converters = ws_converters(&config)?;
    let url = converters.current()?.base_url();
    let session = TungsteniteWs::new(url, PLATFORM_ID.to_string());

    info!(version = %converters.selected(), "Built OKEx WebSocket client");
    PlatformWsClient::new(session, OkexCodec::new(), &converters, config.websocket)
}
