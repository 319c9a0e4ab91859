use crate::core::client::ConverterRegistry;
use crate::core::converter::{Converter, DecodeContext, ObjectKind};
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::MarketDataSource;
use crate::core::types::{
    Candle, DomainObject, Endpoint, Interval, ParamName, ParamValue, Params, Platform, Sorting,
    Trade,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{instrument, trace};

/// Uniform REST surface over one platform
///
/// Each call is one encode → request → decode cycle through the converter of
/// the selected API version. Results keep the venue's order. Nothing is
/// retried here; transport retries live in the `RestClient`.
#[derive(Debug)]
pub struct PlatformRestClient<R: RestClient> {
    rest: R,
    converters: ConverterRegistry,
}

impl<R: RestClient> PlatformRestClient<R> {
    pub fn new(rest: R, converters: ConverterRegistry) -> Self {
        Self { rest, converters }
    }

    /// Switch the API version used by subsequent calls
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.converters = self.converters.select(version);
        self
    }

    pub fn version(&self) -> &str {
        self.converters.selected()
    }

    pub fn converter(&self) -> Result<&Arc<Converter>, ExchangeError> {
        self.converters.current()
    }

    pub fn rest(&self) -> &R {
        &self.rest
    }

    async fn request(
        &self,
        converter: &Converter,
        endpoint: Endpoint,
        params: &Params,
        ctx: &DecodeContext,
    ) -> Result<Vec<DomainObject>, ExchangeError> {
        let request = converter.encode_request(endpoint, params)?;
        let url = format!("{}{}", converter.base_url(), request.target);
        let query: Vec<(&str, &str)> = request
            .params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        let raw = self.rest.get(&url, &query).await?;
        trace!(endpoint = %endpoint, "Raw response: {}", raw);

        if let Some(error) = converter.detect_error(&raw) {
            return Err(error.into());
        }
        converter.decode_items(ObjectKind::for_endpoint(endpoint), &raw, ctx)
    }

    async fn trades(
        &self,
        endpoint: Endpoint,
        symbol: &str,
        params: Params,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let converter = self.converter()?;
        let items = self
            .request(converter, endpoint, &params, &DecodeContext::for_symbol(symbol))
            .await?;
        Ok(items.into_iter().filter_map(DomainObject::into_trade).collect())
    }
}

fn with_symbol(mut params: Params, symbol: &str) -> Params {
    params.insert(ParamName::Symbol, ParamValue::from(symbol));
    params
}

#[async_trait]
impl<R: RestClient> MarketDataSource for PlatformRestClient<R> {
    fn platform(&self) -> Platform {
        self.converters.platform()
    }

    fn sorting(&self) -> Result<Sorting, ExchangeError> {
        Ok(self.converter()?.sorting())
    }

    #[instrument(skip(self, extra), fields(platform = %self.platform(), symbol = %symbol))]
    async fn fetch_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
        extra: Params,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let mut params = with_symbol(extra, symbol);
        if let Some(limit) = limit {
            params.insert(ParamName::Limit, ParamValue::from(limit));
        }
        self.trades(Endpoint::Trade, symbol, params).await
    }

    #[instrument(skip(self, extra), fields(platform = %self.platform(), symbol = %symbol))]
    async fn fetch_trades_history(
        &self,
        symbol: &str,
        from_item: Option<&str>,
        extra: Params,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let mut params = with_symbol(extra, symbol);
        if let Some(from_item) = from_item {
            params.insert(ParamName::FromItem, ParamValue::from(from_item));
        }
        self.trades(Endpoint::TradeHistory, symbol, params).await
    }

    #[instrument(skip(self, extra), fields(platform = %self.platform(), symbol = %symbol, interval = %interval.as_code()))]
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: Option<u32>,
        from_time: Option<i64>,
        extra: Params,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let converter = self.converter()?;
        if !converter.supports_interval(interval) {
            return Err(ExchangeError::InvalidParameter(format!(
                "{} does not support interval {}",
                converter.platform(),
                interval.as_code()
            )));
        }

        let mut params = with_symbol(extra, symbol);
        params.insert(ParamName::Interval, ParamValue::from(interval));
        if let Some(limit) = limit {
            params.insert(ParamName::Limit, ParamValue::from(limit));
        }
        if let Some(from_time) = from_time {
            params.insert(ParamName::FromTime, ParamValue::from(from_time));
        }

        let ctx = DecodeContext::new(Some(symbol.to_string()), Some(interval));
        let items = self
            .request(converter, Endpoint::Candle, &params, &ctx)
            .await?;
        Ok(items.into_iter().filter_map(DomainObject::into_candle).collect())
    }
}
