//! Table-driven market data client.
//!
//! Exchange REST and WebSocket protocols are normalised into one data model
//! (`Trade`, `Candle`, `ErrorInfo`) and one subscription protocol. Each venue
//! contributes declarative conversion tables; the generic `Converter`,
//! `PlatformRestClient` and `PlatformWsClient` do the rest.

pub mod core;
pub mod exchanges;
pub mod utils;

pub use core::client::{
    ConnectionState, ConverterRegistry, DispatchStats, PlatformRestClient, PlatformWsClient,
    Subscription,
};
pub use core::config::ExchangeConfig;
pub use core::{errors::ExchangeError, traits::MarketDataSource, types::*};
pub use exchanges::okex::OkexBuilder;
pub use utils::exchange_factory::ExchangeFactory;
