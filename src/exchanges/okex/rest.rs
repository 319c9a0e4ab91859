use crate::core::converter::{
    ConversionTable, Converter, FieldLayout, ObjectKind, Protocol, TimeUnit,
};
use crate::core::errors::ExchangeError;
use crate::core::types::{Direction, Endpoint, ParamName, Platform, Sorting};
use crate::exchanges::okex::{candle_layout, with_intervals};
use std::sync::Arc;

pub const REST_BASE_URL: &str = "https://www.okex.com/api/v{version}/";

/// REST v1 translation table
pub fn rest_table_v1() -> Result<ConversionTable, ExchangeError> {
    let builder = ConversionTable::builder()
        .endpoint(Endpoint::TradeHistory, "trades.do")
        .endpoint(Endpoint::Trade, "trades.do")
        .endpoint(Endpoint::Candle, "kline.do")
        .param_name(ParamName::Timestamp, "timestamp")
        .param_name(ParamName::Symbol, "symbol")
        .param_name(ParamName::FromItem, "fromId")
        .param_name(ParamName::Interval, "type")
        .param_name(ParamName::Limit, "size")
        .param_name(ParamName::FromTime, "since")
        .value_for(ParamName::Direction, Direction::Buy, "buy")
        .value_for(ParamName::Direction, Direction::Sell, "sell")
        .layout(
            ObjectKind::Error,
            FieldLayout::keyed([
                ("code", ParamName::Code),
                ("error_code", ParamName::Code),
                ("msg", ParamName::Message),
            ]),
        )
        .layout(
            ObjectKind::Trade,
            FieldLayout::keyed([
                ("date", ParamName::Timestamp),
                ("price", ParamName::Price),
                ("amount", ParamName::Amount),
                ("tid", ParamName::ItemId),
                ("type", ParamName::Direction),
            ]),
        )
        .layout(ObjectKind::Candle, candle_layout())
        .event_type("trades.do", Endpoint::TradeHistory)
        .event_type("kline.do", Endpoint::Candle)
        .source_in_milliseconds(true)
        // trade "date" is epoch seconds, candles are milliseconds
        .time_unit_for(ObjectKind::Trade, TimeUnit::Seconds)
        .default_sorting(Sorting::Ascending);

    with_intervals(builder).build()
}

/// REST converter for `version`; `base_url` defaults to the public endpoint
pub fn rest_converter(version: &str, base_url: Option<&str>) -> Result<Converter, ExchangeError> {
    let table = match version {
        "1" => rest_table_v1()?,
        other => {
            return Err(ExchangeError::ConfigurationError(format!(
                "OKEx REST API version '{}' is not supported",
                other
            )))
        }
    };
    Ok(Converter::new(
        Platform::Okex,
        Protocol::Rest,
        version,
        base_url.unwrap_or(REST_BASE_URL),
        Arc::new(table),
    ))
}
