//! Uniform clients on top of the converter and the transport kernel.

pub mod observer;
pub mod rest;
pub mod subscription;
pub mod ws;

pub use observer::ObserverRegistry;
pub use rest::PlatformRestClient;
pub use subscription::Subscription;
pub use ws::{ConnectionState, DispatchStats, PlatformWsClient};

use crate::core::converter::Converter;
use crate::core::errors::ExchangeError;
use crate::core::types::Platform;
use std::collections::HashMap;
use std::sync::Arc;

/// One converter per API version plus the selected version
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    platform: Platform,
    converters: HashMap<String, Arc<Converter>>,
    selected: String,
}

impl ConverterRegistry {
    pub fn new(platform: Platform, selected: impl Into<String>) -> Self {
        Self {
            platform,
            converters: HashMap::new(),
            selected: selected.into(),
        }
    }

    /// Register a converter under its own version
    #[must_use]
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converters
            .insert(converter.version().to_string(), Arc::new(converter));
        self
    }

    #[must_use]
    pub fn select(mut self, version: impl Into<String>) -> Self {
        self.selected = version.into();
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }

    /// Converter for the selected version
    pub fn current(&self) -> Result<&Arc<Converter>, ExchangeError> {
        self.converters.get(&self.selected).ok_or_else(|| {
            ExchangeError::ConfigurationError(format!(
                "No {} converter registered for API version '{}'",
                self.platform, self.selected
            ))
        })
    }
}
