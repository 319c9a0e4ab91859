use crate::core::converter::{ConversionTable, Converter, FieldLayout, ObjectKind, Protocol};
use crate::core::errors::ExchangeError;
use crate::core::types::{Direction, Endpoint, ParamName, Platform, Sorting};
use crate::exchanges::okex::{candle_layout, with_intervals};
use std::sync::Arc;

pub const WS_BASE_URL: &str = "wss://real.okex.com:10440/ws/v{version}/";

/// Deal timestamps are `HH:MM:SS` in China Standard Time
const DEAL_TIME_OFFSET_SECS: i32 = 8 * 3600;

/// WebSocket v1 translation table
pub fn ws_table_v1() -> Result<ConversionTable, ExchangeError> {
    let trade_channel = "ok_sub_spot_{symbol}_deals";
    let candle_channel = "ok_sub_spot_{symbol}_kline_{interval}";

    let builder = ConversionTable::builder()
        .endpoint(Endpoint::Trade, trade_channel)
        .endpoint(Endpoint::Candle, candle_channel)
        .value_for(ParamName::Direction, Direction::Buy, "bid")
        .value_for(ParamName::Direction, Direction::Sell, "ask")
        .layout(
            ObjectKind::Error,
            FieldLayout::keyed([
                ("code", ParamName::Code),
                ("error_code", ParamName::Code),
                ("errorcode", ParamName::Code),
                ("msg", ParamName::Message),
            ]),
        )
        .layout(
            ObjectKind::Trade,
            FieldLayout::positional([
                ParamName::ItemId,
                ParamName::Price,
                ParamName::Amount,
                ParamName::Timestamp,
                ParamName::Direction,
            ]),
        )
        .layout(ObjectKind::Candle, candle_layout())
        .event_type(trade_channel, Endpoint::Trade)
        .event_type(candle_channel, Endpoint::Candle)
        .source_in_milliseconds(true)
        .time_of_day_offset_secs(DEAL_TIME_OFFSET_SECS)
        .default_sorting(Sorting::Ascending);

    with_intervals(builder).build()
}

/// WebSocket converter for `version`; `base_url` defaults to the public endpoint
pub fn ws_converter(version: &str, base_url: Option<&str>) -> Result<Converter, ExchangeError> {
    let table = match version {
        "1" => ws_table_v1()?,
        other => {
            return Err(ExchangeError::ConfigurationError(format!(
                "OKEx WebSocket API version '{}' is not supported",
                other
            )))
        }
    };
    Ok(Converter::new(
        Platform::Okex,
        Protocol::Ws,
        version,
        base_url.unwrap_or(WS_BASE_URL),
        Arc::new(table),
    ))
}
