use crate::core::{
    errors::ExchangeError,
    types::{Candle, Interval, Params, Platform, Sorting, Trade},
};
use async_trait::async_trait;

/// Venue-independent historical market data
///
/// Application code holds a `Box<dyn MarketDataSource>` and never branches on
/// the platform.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Order the venue returns history in
    fn sorting(&self) -> Result<Sorting, ExchangeError>;

    /// Recent trades
    async fn fetch_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
        extra: Params,
    ) -> Result<Vec<Trade>, ExchangeError>;

    /// Trade history, optionally starting from a venue trade id
    async fn fetch_trades_history(
        &self,
        symbol: &str,
        from_item: Option<&str>,
        extra: Params,
    ) -> Result<Vec<Trade>, ExchangeError>;

    /// Candles; `from_time` is epoch milliseconds
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: Option<u32>,
        from_time: Option<i64>,
        extra: Params,
    ) -> Result<Vec<Candle>, ExchangeError>;
}
