use crate::core::{
    config::ExchangeConfig, errors::ExchangeError, traits::MarketDataSource, types::Platform,
};
use crate::exchanges::okex;

/// Factory for creating market data sources
pub struct ExchangeFactory;

impl ExchangeFactory {
    /// Every platform the factory can build
    pub fn platforms() -> Vec<Platform> {
        vec![Platform::Okex]
    }

    /// Create a REST source for the given platform
    ///
    /// Without a config the platform defaults apply (public endpoints, newest
    /// supported API version).
    pub fn create_source(
        platform: Platform,
        config: Option<ExchangeConfig>,
    ) -> Result<Box<dyn MarketDataSource>, ExchangeError> {
        let config = config.unwrap_or_default();
        match platform {
            Platform::Okex => Ok(Box::new(okex::build_rest_client(config)?)),
        }
    }

    /// Create a REST source configured from `{PLATFORM}_*` environment variables
    pub fn create_source_from_env(
        platform: Platform,
    ) -> Result<Box<dyn MarketDataSource>, ExchangeError> {
        #[cfg(feature = "env-file")]
        let config = ExchangeConfig::from_env_file(platform.as_str())?;
        #[cfg(not(feature = "env-file"))]
        let config = ExchangeConfig::from_env(platform.as_str())?;

        Self::create_source(platform, Some(config))
    }
}
