use crate::core::errors::ExchangeError;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Unit an exchange uses for epoch timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    pub fn to_millis(self, value: Decimal) -> Result<i64, ExchangeError> {
        let millis = match self {
            Self::Seconds => value.checked_mul(Decimal::from(1000)).ok_or_else(|| {
                ExchangeError::DecodeError(format!("Timestamp out of range: {}", value))
            })?,
            Self::Milliseconds => value,
        };
        millis
            .trunc()
            .to_i64()
            .ok_or_else(|| ExchangeError::DecodeError(format!("Timestamp out of range: {}", value)))
    }

    pub fn from_millis(self, millis: i64) -> i64 {
        match self {
            Self::Seconds => millis.div_euclid(1000),
            Self::Milliseconds => millis,
        }
    }
}

/// Convert a raw timestamp field to epoch milliseconds
///
/// Accepts JSON numbers, numeric strings (fractional seconds allowed), RFC 3339
/// strings, and `HH:MM:SS` time-of-day stamps when `time_of_day_offset` is set.
pub fn normalize_timestamp(
    raw: &Value,
    unit: TimeUnit,
    time_of_day_offset: Option<FixedOffset>,
) -> Result<i64, ExchangeError> {
    match raw {
        Value::Number(number) => {
            let value = Decimal::from_str(&number.to_string()).map_err(|e| {
                ExchangeError::DecodeError(format!("Invalid timestamp {}: {}", number, e))
            })?;
            unit.to_millis(value)
        }
        Value::String(text) => {
            if let Ok(value) = Decimal::from_str(text.trim()) {
                return unit.to_millis(value);
            }
            if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
                return Ok(datetime.timestamp_millis());
            }
            if let Some(offset) = time_of_day_offset {
                if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M:%S") {
                    return Ok(resolve_time_of_day(time, offset, Utc::now()));
                }
            }
            Err(ExchangeError::DecodeError(format!(
                "Unrecognized timestamp format: {}",
                text
            )))
        }
        other => Err(ExchangeError::DecodeError(format!(
            "Timestamp must be a number or string, got {}",
            other
        ))),
    }
}

/// Most recent instant at or before `now` (plus a small clock skew allowance)
/// whose local time in `offset` equals `time`
fn resolve_time_of_day(time: NaiveTime, offset: FixedOffset, now: DateTime<Utc>) -> i64 {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive().and_time(time);
    let mut candidate = today.and_utc().timestamp_millis() - i64::from(offset.local_minus_utc()) * 1000;
    if candidate > now.timestamp_millis() + Duration::minutes(5).num_milliseconds() {
        candidate -= Duration::days(1).num_milliseconds();
    }
    candidate
}
