//! Table-driven translation between the canonical vocabulary and one
//! exchange's wire format.
//!
//! A [`Converter`] pairs a protocol and API version with an immutable
//! [`ConversionTable`]. Adapters only supply tables; encoding, decoding,
//! event identification and time normalisation all live here.

pub mod decode;
pub mod table;
pub mod template;
pub mod time;

pub use decode::DecodeContext;
pub use table::{ConversionTable, ConversionTableBuilder, FieldLayout, ObjectKind, ValueLookup};
pub use template::ChannelTemplate;
pub use time::{normalize_timestamp, TimeUnit};

use crate::core::errors::ExchangeError;
use crate::core::types::{
    DomainObject, Endpoint, ErrorInfo, Interval, ParamName, ParamValue, Params, Platform, Sorting,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Rest,
    Ws,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => f.write_str("rest"),
            Self::Ws => f.write_str("ws"),
        }
    }
}

/// A request ready for the transport: wire path or channel plus wire params
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    pub endpoint: Endpoint,
    pub target: String,
    pub params: Vec<(String, String)>,
}

/// Result of matching an inbound channel name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMatch {
    pub endpoint: Endpoint,
    pub symbol: Option<String>,
    pub interval: Option<Interval>,
}

impl EventMatch {
    pub fn context(&self) -> DecodeContext {
        DecodeContext::new(self.symbol.clone(), self.interval)
    }
}

#[derive(Debug, Clone)]
pub struct Converter {
    platform: Platform,
    protocol: Protocol,
    version: String,
    base_url: String,
    table: Arc<ConversionTable>,
}

impl Converter {
    /// `base_url` may contain a `{version}` placeholder
    pub fn new(
        platform: Platform,
        protocol: Protocol,
        version: impl Into<String>,
        base_url: impl Into<String>,
        table: Arc<ConversionTable>,
    ) -> Self {
        Self {
            platform,
            protocol,
            version: version.into(),
            base_url: base_url.into(),
            table,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn table(&self) -> &ConversionTable {
        &self.table
    }

    pub fn base_url(&self) -> String {
        self.base_url.replace("{version}", &self.version)
    }

    pub fn supports_interval(&self, interval: Interval) -> bool {
        self.table
            .values()
            .encode(ParamName::Interval, interval.into())
            .is_some()
    }

    /// Order the venue returns history in; results are never re-sorted
    pub fn sorting(&self) -> Sorting {
        self.table.default_sorting()
    }

    /// Wire representation of a single canonical value
    pub fn encode_value(&self, param: ParamName, value: &ParamValue) -> Result<String, ExchangeError> {
        if let ParamValue::Canonical(canonical) = value {
            return self
                .table
                .values()
                .encode(param, *canonical)
                .map(str::to_string)
                .ok_or_else(|| {
                    ExchangeError::InvalidParameter(format!(
                        "{} {} does not support {} for '{}'",
                        self.platform, self.protocol, canonical, param
                    ))
                });
        }
        if param.is_time() {
            if let Some(millis) = value.as_integer() {
                return Ok(self.table.send_time_unit().from_millis(millis).to_string());
            }
        }
        value.as_text().ok_or_else(|| {
            ExchangeError::InvalidParameter(format!("Cannot encode '{}' value {:?}", param, value))
        })
    }

    fn render_target(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> Result<(String, BTreeSet<ParamName>), ExchangeError> {
        let template = self.table.endpoint_template(endpoint).ok_or_else(|| {
            ExchangeError::ConfigurationError(format!(
                "{} {} has no wire name for endpoint {}",
                self.platform, self.protocol, endpoint
            ))
        })?;

        let mut consumed = BTreeSet::new();
        let mut values = HashMap::new();
        for name in template.placeholders() {
            let Some(param) = ParamName::from_name(name) else {
                continue;
            };
            // a missing value is reported by render below
            if let Some(value) = params.get(&param) {
                values.insert(name, self.encode_value(param, value)?);
                consumed.insert(param);
            }
        }
        Ok((template.render(&values)?, consumed))
    }

    /// Translate canonical params into a wire request for `endpoint`
    ///
    /// Placeholder params are consumed by the template; the rest are renamed
    /// through the name lookup. Params without a wire name are passed through
    /// under their canonical name when the table tolerates extras, and dropped
    /// otherwise.
    pub fn encode_request(
        &self,
        endpoint: Endpoint,
        params: &Params,
    ) -> Result<EncodedRequest, ExchangeError> {
        let (target, consumed) = self.render_target(endpoint, params)?;

        let mut wire_params = Vec::with_capacity(params.len());
        for (param, value) in params {
            if consumed.contains(param) {
                continue;
            }
            let key = match self.table.wire_name(*param) {
                Some(key) => key,
                None if self.table.tolerates_extra_params() => param.as_str(),
                None => {
                    debug!(
                        platform = %self.platform,
                        endpoint = %endpoint,
                        param = %param,
                        "Dropping param without wire name"
                    );
                    continue;
                }
            };
            wire_params.push((key.to_string(), self.encode_value(*param, value)?));
        }

        Ok(EncodedRequest {
            endpoint,
            target,
            params: wire_params,
        })
    }

    /// Channel name for a streaming subscription
    ///
    /// There is no default symbol: a template needing `{symbol}` fails with
    /// `ConfigurationError` when `symbol` is `None`.
    pub fn generate_subscription(
        &self,
        endpoint: Endpoint,
        symbol: Option<&str>,
        params: &Params,
    ) -> Result<String, ExchangeError> {
        let mut params = params.clone();
        if let Some(symbol) = symbol {
            params.insert(ParamName::Symbol, ParamValue::from(symbol));
        }
        self.render_target(endpoint, &params).map(|(target, _)| target)
    }

    pub fn decode_payload(
        &self,
        kind: ObjectKind,
        raw: &Value,
        ctx: &DecodeContext,
    ) -> Result<DomainObject, ExchangeError> {
        decode::decode_object(&self.table, kind, raw, ctx)
    }

    /// Decode a response body holding one item or a list of items
    pub fn decode_items(
        &self,
        kind: ObjectKind,
        raw: &Value,
        ctx: &DecodeContext,
    ) -> Result<Vec<DomainObject>, ExchangeError> {
        let single_row = matches!(self.table.layout(kind), Some(FieldLayout::Positional(_)))
            && raw
                .as_array()
                .and_then(|row| row.first())
                .is_some_and(|first| !first.is_array() && !first.is_object());

        match raw {
            Value::Array(items) if !single_row => items
                .iter()
                .map(|item| self.decode_payload(kind, item, ctx))
                .collect(),
            _ => Ok(vec![self.decode_payload(kind, raw, ctx)?]),
        }
    }

    /// Error envelope carried by `raw`, if any
    pub fn detect_error(&self, raw: &Value) -> Option<ErrorInfo> {
        let object = raw.as_object()?;
        let layout = self.table.layout(ObjectKind::Error)?;
        let has_code = layout
            .wire_keys_for(ParamName::Code)
            .iter()
            .any(|key| object.get(*key).is_some_and(|value| !value.is_null()));
        if !has_code {
            return None;
        }
        match self.decode_payload(ObjectKind::Error, raw, &DecodeContext::default()) {
            Ok(DomainObject::Error(info)) => Some(info),
            _ => None,
        }
    }

    /// Match an inbound channel or event name against the declared event types
    ///
    /// `None` means the event is not recognised by this table.
    pub fn identify_event(&self, name: &str) -> Option<EventMatch> {
        self.table
            .event_types()
            .iter()
            .find_map(|(template, endpoint)| {
                let captured = template.captures(name)?;
                let interval = match captured.get(ParamName::Interval.as_str()) {
                    Some(wire) => Some(
                        self.table
                            .values()
                            .decode(ParamName::Interval, wire)
                            .and_then(decode::expect_interval)?,
                    ),
                    None => None,
                };
                Some(EventMatch {
                    endpoint: *endpoint,
                    symbol: captured.get(ParamName::Symbol.as_str()).cloned(),
                    interval,
                })
            })
    }
}
