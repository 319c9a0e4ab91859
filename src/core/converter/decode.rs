use crate::core::converter::table::{ConversionTable, FieldLayout, ObjectKind};
use crate::core::converter::time::normalize_timestamp;
use crate::core::errors::ExchangeError;
use crate::core::types::{
    Candle, CanonicalValue, DomainObject, ErrorInfo, Interval, ParamName, Price,
    Quantity, Trade, Volume,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Values known from the request or channel rather than the payload itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeContext {
    pub symbol: Option<String>,
    pub interval: Option<Interval>,
}

impl DecodeContext {
    pub fn new(symbol: Option<String>, interval: Option<Interval>) -> Self {
        Self { symbol, interval }
    }

    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            interval: None,
        }
    }
}

/// Raw fields keyed by canonical name, collected through one layout
struct Fields<'a> {
    kind: ObjectKind,
    values: HashMap<ParamName, &'a Value>,
}

impl<'a> Fields<'a> {
    fn collect(kind: ObjectKind, layout: &FieldLayout, raw: &'a Value) -> Result<Self, ExchangeError> {
        let mut values = HashMap::new();
        match layout {
            FieldLayout::Keyed(map) => {
                let object = raw.as_object().ok_or_else(|| {
                    ExchangeError::DecodeError(format!("{:?} payload must be an object: {}", kind, raw))
                })?;
                for (key, param) in map {
                    if let Some(value) = object.get(key).filter(|value| !value.is_null()) {
                        values.entry(*param).or_insert(value);
                    }
                }
            }
            FieldLayout::Positional(order) => {
                let row = raw.as_array().ok_or_else(|| {
                    ExchangeError::DecodeError(format!("{:?} payload must be an array: {}", kind, raw))
                })?;
                if row.len() < order.len() {
                    return Err(ExchangeError::DecodeError(format!(
                        "{:?} row has {} fields, expected {}",
                        kind,
                        row.len(),
                        order.len()
                    )));
                }
                // trailing extras are ignored by zip
                for (param, value) in order.iter().zip(row) {
                    values.insert(*param, value);
                }
            }
        }
        Ok(Self { kind, values })
    }

    fn optional(&self, param: ParamName) -> Option<&'a Value> {
        self.values.get(&param).copied()
    }

    fn required(&self, param: ParamName) -> Result<&'a Value, ExchangeError> {
        self.optional(param).ok_or_else(|| {
            ExchangeError::DecodeError(format!("{:?} payload is missing '{}'", self.kind, param))
        })
    }

    fn decimal(&self, param: ParamName) -> Result<Decimal, ExchangeError> {
        parse_decimal(param, self.required(param)?)
    }

    fn optional_decimal(&self, param: ParamName) -> Result<Option<Decimal>, ExchangeError> {
        self.optional(param)
            .map(|value| parse_decimal(param, value))
            .transpose()
    }

    fn optional_text(&self, param: ParamName) -> Result<Option<String>, ExchangeError> {
        self.optional(param)
            .map(|value| parse_text(param, value))
            .transpose()
    }

    fn canonical(
        &self,
        table: &ConversionTable,
        param: ParamName,
    ) -> Result<Option<CanonicalValue>, ExchangeError> {
        let Some(text) = self.optional_text(param)? else {
            return Ok(None);
        };
        table
            .values()
            .decode(param, &text)
            .map(Some)
            .ok_or_else(|| ExchangeError::DecodeError(format!("Unknown {} value '{}'", param, text)))
    }

    fn timestamp(&self, table: &ConversionTable) -> Result<i64, ExchangeError> {
        normalize_timestamp(
            self.required(ParamName::Timestamp)?,
            table.source_time_unit(self.kind),
            table.time_of_day_offset(),
        )
    }

    fn symbol(&self, ctx: &DecodeContext) -> Result<String, ExchangeError> {
        match self.optional_text(ParamName::Symbol)? {
            Some(symbol) => Ok(symbol),
            None => ctx.symbol.clone().ok_or_else(|| {
                ExchangeError::DecodeError(format!("{:?} payload has no symbol", self.kind))
            }),
        }
    }
}

fn parse_decimal(param: ParamName, value: &Value) -> Result<Decimal, ExchangeError> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        other => {
            return Err(ExchangeError::DecodeError(format!(
                "'{}' must be numeric, got {}",
                param, other
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| ExchangeError::DecodeError(format!("'{}' is not a number ({}): {}", param, text, e)))
}

fn parse_text(param: ParamName, value: &Value) -> Result<String, ExchangeError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(ExchangeError::DecodeError(format!(
            "'{}' must be a scalar, got {}",
            param, other
        ))),
    }
}

/// Decode one payload into the canonical class `kind`
pub(crate) fn decode_object(
    table: &ConversionTable,
    kind: ObjectKind,
    raw: &Value,
    ctx: &DecodeContext,
) -> Result<DomainObject, ExchangeError> {
    let layout = table.layout(kind).ok_or_else(|| {
        ExchangeError::ConfigurationError(format!("No field layout declared for {:?}", kind))
    })?;
    let fields = Fields::collect(kind, layout, raw)?;

    match kind {
        ObjectKind::Trade => {
            let direction = match fields.canonical(table, ParamName::Direction)? {
                Some(CanonicalValue::Direction(direction)) => Some(direction),
                Some(other) => {
                    return Err(ExchangeError::DecodeError(format!(
                        "Expected a direction, got {}",
                        other
                    )))
                }
                None => None,
            };
            Ok(DomainObject::Trade(Trade {
                symbol: fields.symbol(ctx)?,
                timestamp: fields.timestamp(table)?,
                price: Price::new(fields.decimal(ParamName::Price)?),
                amount: fields.optional_decimal(ParamName::Amount)?.map(Quantity::new),
                item_id: fields.optional_text(ParamName::ItemId)?,
                direction,
            }))
        }
        ObjectKind::Candle => {
            let interval = match fields.canonical(table, ParamName::Interval)? {
                Some(CanonicalValue::Interval(interval)) => Some(interval),
                Some(other) => {
                    return Err(ExchangeError::DecodeError(format!(
                        "Expected an interval, got {}",
                        other
                    )))
                }
                None => ctx.interval,
            };
            Ok(DomainObject::Candle(Candle {
                symbol: fields.symbol(ctx)?,
                interval,
                timestamp: fields.timestamp(table)?,
                open: Price::new(fields.decimal(ParamName::PriceOpen)?),
                high: Price::new(fields.decimal(ParamName::PriceHigh)?),
                low: Price::new(fields.decimal(ParamName::PriceLow)?),
                close: Price::new(fields.decimal(ParamName::PriceClose)?),
                volume: Volume::new(fields.decimal(ParamName::Amount)?),
            }))
        }
        ObjectKind::Error => Ok(DomainObject::Error(ErrorInfo {
            code: parse_text(ParamName::Code, fields.required(ParamName::Code)?)?,
            message: fields.optional_text(ParamName::Message)?.unwrap_or_default(),
        })),
    }
}

/// Interval named by a captured channel segment
pub(crate) fn expect_interval(value: CanonicalValue) -> Option<Interval> {
    match value {
        CanonicalValue::Interval(interval) => Some(interval),
        _ => None,
    }
}
