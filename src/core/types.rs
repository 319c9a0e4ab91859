use crate::core::errors::ExchangeError;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported trading platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Okex,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Okex => "okex",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "okex" => Ok(Self::Okex),
            other => Err(ExchangeError::ConfigurationError(format!(
                "Unknown platform '{}'",
                other
            ))),
        }
    }
}

/// Logical data stream or request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// Live (or most recent) trades
    Trade,
    TradeHistory,
    Candle,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trade => "trade",
            Self::TradeHistory => "trade_history",
            Self::Candle => "candle",
        };
        f.write_str(name)
    }
}

/// Canonical request/response field names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamName {
    Symbol,
    Limit,
    Sorting,
    Interval,
    Direction,
    OrderType,
    Level,
    FromItem,
    ToItem,
    FromTime,
    ToTime,
    Timestamp,
    ItemId,
    Price,
    Amount,
    PriceOpen,
    PriceHigh,
    PriceLow,
    PriceClose,
    Code,
    Message,
}

impl ParamName {
    pub const ALL: [Self; 21] = [
        Self::Symbol,
        Self::Limit,
        Self::Sorting,
        Self::Interval,
        Self::Direction,
        Self::OrderType,
        Self::Level,
        Self::FromItem,
        Self::ToItem,
        Self::FromTime,
        Self::ToTime,
        Self::Timestamp,
        Self::ItemId,
        Self::Price,
        Self::Amount,
        Self::PriceOpen,
        Self::PriceHigh,
        Self::PriceLow,
        Self::PriceClose,
        Self::Code,
        Self::Message,
    ];

    /// Canonical snake_case name, also used as the template placeholder name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::Limit => "limit",
            Self::Sorting => "sorting",
            Self::Interval => "interval",
            Self::Direction => "direction",
            Self::OrderType => "order_type",
            Self::Level => "level",
            Self::FromItem => "from_item",
            Self::ToItem => "to_item",
            Self::FromTime => "from_time",
            Self::ToTime => "to_time",
            Self::Timestamp => "timestamp",
            Self::ItemId => "item_id",
            Self::Price => "price",
            Self::Amount => "amount",
            Self::PriceOpen => "price_open",
            Self::PriceHigh => "price_high",
            Self::PriceLow => "price_low",
            Self::PriceClose => "price_close",
            Self::Code => "code",
            Self::Message => "message",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|param| param.as_str() == name)
    }

    /// Params carrying epoch timestamps (canonical milliseconds)
    pub fn is_time(&self) -> bool {
        matches!(self, Self::FromTime | Self::ToTime | Self::Timestamp)
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified candle interval enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Interval {
    Min1,
    Min3,
    Min5,
    Min15,
    Min30,
    Hrs1,
    Hrs2,
    Hrs4,
    Hrs6,
    Hrs8,
    Hrs12,
    Day1,
    Day3,
    Week1,
    Month1,
}

impl Interval {
    /// Short code, e.g. "1m", "4h", "1d", "1M"
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Min1 => "1m",
            Self::Min3 => "3m",
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Hrs1 => "1h",
            Self::Hrs2 => "2h",
            Self::Hrs4 => "4h",
            Self::Hrs6 => "6h",
            Self::Hrs8 => "8h",
            Self::Hrs12 => "12h",
            Self::Day1 => "1d",
            Self::Day3 => "3d",
            Self::Week1 => "1w",
            Self::Month1 => "1M",
        }
    }

    /// Get all intervals
    pub fn all() -> Vec<Self> {
        vec![
            Self::Min1,
            Self::Min3,
            Self::Min5,
            Self::Min15,
            Self::Min30,
            Self::Hrs1,
            Self::Hrs2,
            Self::Hrs4,
            Self::Hrs6,
            Self::Hrs8,
            Self::Hrs12,
            Self::Day1,
            Self::Day3,
            Self::Week1,
            Self::Month1,
        ]
    }
}

impl FromStr for Interval {
    type Err = ExchangeError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|interval| interval.as_code() == code)
            .ok_or_else(|| ExchangeError::InvalidParameter(format!("Unknown interval: {}", code)))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Self::Min1 => "1 minute",
            Self::Min3 => "3 minutes",
            Self::Min5 => "5 minutes",
            Self::Min15 => "15 minutes",
            Self::Min30 => "30 minutes",
            Self::Hrs1 => "1 hour",
            Self::Hrs2 => "2 hours",
            Self::Hrs4 => "4 hours",
            Self::Hrs6 => "6 hours",
            Self::Hrs8 => "8 hours",
            Self::Hrs12 => "12 hours",
            Self::Day1 => "1 day",
            Self::Day3 => "3 days",
            Self::Week1 => "1 week",
            Self::Month1 => "1 month",
        };
        write!(f, "{}", description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sorting {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// Enum-valued canonical values; the keys of an adapter's value lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalValue {
    Interval(Interval),
    Direction(Direction),
    Sorting(Sorting),
    OrderType(OrderType),
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval(interval) => write!(f, "{:?}", interval),
            Self::Direction(direction) => write!(f, "{:?}", direction),
            Self::Sorting(sorting) => write!(f, "{:?}", sorting),
            Self::OrderType(order_type) => write!(f, "{:?}", order_type),
        }
    }
}

impl From<Interval> for CanonicalValue {
    fn from(value: Interval) -> Self {
        Self::Interval(value)
    }
}

impl From<Direction> for CanonicalValue {
    fn from(value: Direction) -> Self {
        Self::Direction(value)
    }
}

impl From<Sorting> for CanonicalValue {
    fn from(value: Sorting) -> Self {
        Self::Sorting(value)
    }
}

impl From<OrderType> for CanonicalValue {
    fn from(value: OrderType) -> Self {
        Self::OrderType(value)
    }
}

/// A canonical parameter value as supplied by application code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Canonical(CanonicalValue),
}

impl ParamValue {
    pub fn as_canonical(&self) -> Option<CanonicalValue> {
        match self {
            Self::Canonical(value) => Some(*value),
            _ => None,
        }
    }

    /// Scalar values rendered as text; enum values need a lookup and return `None`
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Integer(number) => Some(number.to_string()),
            Self::Decimal(number) => Some(number.to_string()),
            Self::Canonical(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(number) => Some(*number),
            Self::Text(text) => text.parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<Decimal> for ParamValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<CanonicalValue> for ParamValue {
    fn from(value: CanonicalValue) -> Self {
        Self::Canonical(value)
    }
}

impl From<Interval> for ParamValue {
    fn from(value: Interval) -> Self {
        Self::Canonical(value.into())
    }
}

impl From<Direction> for ParamValue {
    fn from(value: Direction) -> Self {
        Self::Canonical(value.into())
    }
}

impl From<Sorting> for ParamValue {
    fn from(value: Sorting) -> Self {
        Self::Canonical(value.into())
    }
}

impl From<OrderType> for ParamValue {
    fn from(value: OrderType) -> Self {
        Self::Canonical(value.into())
    }
}

/// Ordered canonical parameter map
pub type Params = BTreeMap<ParamName, ParamValue>;

/// Type-safe price representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Price {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe quantity representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Quantity {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe volume representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Volume {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn millis_to_datetime(timestamp: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp).single()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub price: Price,
    pub amount: Option<Quantity>,
    pub item_id: Option<String>,
    pub direction: Option<Direction>,
}

impl Trade {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub interval: Option<Interval>,
    /// Epoch milliseconds of the candle open
    pub timestamp: i64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
}

impl Candle {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.timestamp)
    }
}

/// Canonical form of an exchange error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<ErrorInfo> for ExchangeError {
    fn from(info: ErrorInfo) -> Self {
        Self::PlatformError {
            code: info.code,
            message: info.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainObject {
    Trade(Trade),
    Candle(Candle),
    Error(ErrorInfo),
}

impl DomainObject {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Trade(trade) => Some(&trade.symbol),
            Self::Candle(candle) => Some(&candle.symbol),
            Self::Error(_) => None,
        }
    }

    pub fn into_trade(self) -> Option<Trade> {
        match self {
            Self::Trade(trade) => Some(trade),
            _ => None,
        }
    }

    pub fn into_candle(self) -> Option<Candle> {
        match self {
            Self::Candle(candle) => Some(candle),
            _ => None,
        }
    }
}

/// Connection-level WebSocket behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    /// `None` disables heartbeats even if the codec provides one
    pub heartbeat_interval_ms: Option<u64>,
    /// Buffer size of each observer channel
    pub observer_buffer: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1_000,
            heartbeat_interval_ms: Some(30_000),
            observer_buffer: 1_000,
        }
    }
}
