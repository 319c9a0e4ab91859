pub mod builder;
pub mod codec;
pub mod rest;
pub mod ws;

pub use builder::{build_rest_client, build_ws_client, rest_converters, ws_converters, OkexBuilder};
pub use codec::OkexCodec;
pub use rest::{rest_converter, rest_table_v1, REST_BASE_URL};
pub use ws::{ws_converter, ws_table_v1, WS_BASE_URL};

use crate::core::converter::{ConversionTableBuilder, FieldLayout};
use crate::core::types::{Interval, ParamName};

pub const PLATFORM_ID: &str = "okex";
pub const DEFAULT_VERSION: &str = "1";

/// Interval codes shared by REST `type` and WS kline channels
const INTERVALS: [(Interval, &str); 12] = [
    (Interval::Min1, "1min"),
    (Interval::Min3, "3min"),
    (Interval::Min5, "5min"),
    (Interval::Min15, "15min"),
    (Interval::Min30, "30min"),
    (Interval::Hrs1, "1hour"),
    (Interval::Hrs2, "2hour"),
    (Interval::Hrs4, "4hour"),
    (Interval::Hrs6, "6hour"),
    (Interval::Hrs12, "12hour"),
    (Interval::Day1, "1day"),
    (Interval::Week1, "1week"),
];

fn with_intervals(builder: ConversionTableBuilder) -> ConversionTableBuilder {
    INTERVALS
        .iter()
        .fold(builder, |builder, (interval, code)| builder.value(*interval, *code))
}

/// `[timestamp, open, high, low, close, volume]`
fn candle_layout() -> FieldLayout {
    FieldLayout::positional([
        ParamName::Timestamp,
        ParamName::PriceOpen,
        ParamName::PriceHigh,
        ParamName::PriceLow,
        ParamName::PriceClose,
        ParamName::Amount,
    ])
}
