use crate::core::converter::template::ChannelTemplate;
use crate::core::converter::time::TimeUnit;
use crate::core::errors::ExchangeError;
use crate::core::types::{CanonicalValue, Direction, Endpoint, Interval, ParamName, Sorting};
use chrono::FixedOffset;
use std::collections::HashMap;

/// Canonical class a payload decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Trade,
    Candle,
    Error,
}

impl ObjectKind {
    /// Class produced by an endpoint
    pub fn for_endpoint(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Trade | Endpoint::TradeHistory => Self::Trade,
            Endpoint::Candle => Self::Candle,
        }
    }

    /// Fields the decoder cannot do without
    pub fn required_params(self) -> &'static [ParamName] {
        match self {
            Self::Trade => &[ParamName::Timestamp, ParamName::Price],
            Self::Candle => &[
                ParamName::Timestamp,
                ParamName::PriceOpen,
                ParamName::PriceHigh,
                ParamName::PriceLow,
                ParamName::PriceClose,
                ParamName::Amount,
            ],
            Self::Error => &[ParamName::Code],
        }
    }
}

/// How the fields of one canonical class are laid out on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLayout {
    /// Object payloads: wire key → canonical field
    Keyed(Vec<(String, ParamName)>),
    /// Array payloads: canonical field per position
    Positional(Vec<ParamName>),
}

impl FieldLayout {
    pub fn keyed<K: Into<String>>(fields: impl IntoIterator<Item = (K, ParamName)>) -> Self {
        Self::Keyed(fields.into_iter().map(|(key, param)| (key.into(), param)).collect())
    }

    pub fn positional(fields: impl IntoIterator<Item = ParamName>) -> Self {
        Self::Positional(fields.into_iter().collect())
    }

    pub fn contains(&self, param: ParamName) -> bool {
        match self {
            Self::Keyed(fields) => fields.iter().any(|(_, p)| *p == param),
            Self::Positional(fields) => fields.contains(&param),
        }
    }

    /// Wire keys mapped to `param` (keyed layouts only)
    pub fn wire_keys_for(&self, param: ParamName) -> Vec<&str> {
        match self {
            Self::Keyed(fields) => fields
                .iter()
                .filter(|(_, p)| *p == param)
                .map(|(key, _)| key.as_str())
                .collect(),
            Self::Positional(_) => Vec::new(),
        }
    }
}

/// Two-level value translation: per-ParamName sub-maps first, then the flat map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueLookup {
    flat: HashMap<CanonicalValue, String>,
    by_param: HashMap<ParamName, HashMap<CanonicalValue, String>>,
}

impl ValueLookup {
    pub fn encode(&self, param: ParamName, value: CanonicalValue) -> Option<&str> {
        self.by_param
            .get(&param)
            .and_then(|values| values.get(&value))
            .or_else(|| self.flat.get(&value))
            .map(String::as_str)
    }

    /// Reverse lookup of a wire value for the given field
    pub fn decode(&self, param: ParamName, wire: &str) -> Option<CanonicalValue> {
        let scoped = self.by_param.get(&param).and_then(|values| {
            values
                .iter()
                .find(|(_, w)| w.as_str() == wire)
                .map(|(value, _)| *value)
        });
        scoped.or_else(|| {
            self.flat
                .iter()
                .filter(|(value, _)| value_matches_param(param, **value))
                .find(|(_, w)| w.as_str() == wire)
                .map(|(value, _)| *value)
        })
    }

    pub fn intervals(&self) -> Vec<Interval> {
        let mut intervals: Vec<Interval> = self
            .flat
            .keys()
            .chain(self.by_param.values().flat_map(|values| values.keys()))
            .filter_map(|value| match value {
                CanonicalValue::Interval(interval) => Some(*interval),
                _ => None,
            })
            .collect();
        intervals.sort();
        intervals.dedup();
        intervals
    }
}

fn value_matches_param(param: ParamName, value: CanonicalValue) -> bool {
    matches!(
        (param, value),
        (ParamName::Interval, CanonicalValue::Interval(_))
            | (ParamName::Direction, CanonicalValue::Direction(_))
            | (ParamName::Sorting, CanonicalValue::Sorting(_))
            | (ParamName::OrderType, CanonicalValue::OrderType(_))
    )
}

/// Immutable per-adapter translation tables
#[derive(Debug, Clone)]
pub struct ConversionTable {
    pub(crate) endpoint_lookup: HashMap<Endpoint, ChannelTemplate>,
    pub(crate) param_name_lookup: HashMap<ParamName, String>,
    pub(crate) param_value_lookup: ValueLookup,
    pub(crate) param_lookup_by_class: HashMap<ObjectKind, FieldLayout>,
    pub(crate) endpoint_by_event_type: Vec<(ChannelTemplate, Endpoint)>,
    pub(crate) source_time_unit: TimeUnit,
    pub(crate) time_unit_overrides: HashMap<ObjectKind, TimeUnit>,
    pub(crate) send_time_unit: TimeUnit,
    pub(crate) time_of_day_offset: Option<FixedOffset>,
    pub(crate) default_sorting: Sorting,
    pub(crate) tolerates_extra_params: bool,
}

impl ConversionTable {
    pub fn builder() -> ConversionTableBuilder {
        ConversionTableBuilder::default()
    }

    pub fn endpoint_template(&self, endpoint: Endpoint) -> Option<&ChannelTemplate> {
        self.endpoint_lookup.get(&endpoint)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.endpoint_lookup.keys().copied()
    }

    pub fn wire_name(&self, param: ParamName) -> Option<&str> {
        self.param_name_lookup.get(&param).map(String::as_str)
    }

    pub fn values(&self) -> &ValueLookup {
        &self.param_value_lookup
    }

    pub fn layout(&self, kind: ObjectKind) -> Option<&FieldLayout> {
        self.param_lookup_by_class.get(&kind)
    }

    pub fn event_types(&self) -> &[(ChannelTemplate, Endpoint)] {
        &self.endpoint_by_event_type
    }

    /// Unit timestamps of the given class arrive in
    pub fn source_time_unit(&self, kind: ObjectKind) -> TimeUnit {
        self.time_unit_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.source_time_unit)
    }

    pub fn send_time_unit(&self) -> TimeUnit {
        self.send_time_unit
    }

    pub fn time_of_day_offset(&self) -> Option<FixedOffset> {
        self.time_of_day_offset
    }

    pub fn default_sorting(&self) -> Sorting {
        self.default_sorting
    }

    pub fn tolerates_extra_params(&self) -> bool {
        self.tolerates_extra_params
    }
}

/// Collects adapter tables; `build` validates them and fails fast
#[derive(Debug)]
pub struct ConversionTableBuilder {
    endpoints: Vec<(Endpoint, String)>,
    param_names: HashMap<ParamName, String>,
    values: ValueLookup,
    layouts: HashMap<ObjectKind, FieldLayout>,
    event_types: Vec<(String, Endpoint)>,
    source_time_unit: TimeUnit,
    time_unit_overrides: HashMap<ObjectKind, TimeUnit>,
    send_time_unit: Option<TimeUnit>,
    time_of_day_offset_secs: Option<i32>,
    default_sorting: Sorting,
    tolerates_extra_params: bool,
}

impl Default for ConversionTableBuilder {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            param_names: HashMap::new(),
            values: ValueLookup::default(),
            layouts: HashMap::new(),
            event_types: Vec::new(),
            source_time_unit: TimeUnit::Milliseconds,
            time_unit_overrides: HashMap::new(),
            send_time_unit: None,
            time_of_day_offset_secs: None,
            default_sorting: Sorting::Ascending,
            tolerates_extra_params: false,
        }
    }
}

impl ConversionTableBuilder {
    pub fn endpoint(mut self, endpoint: Endpoint, template: impl Into<String>) -> Self {
        self.endpoints.push((endpoint, template.into()));
        self
    }

    pub fn param_name(mut self, param: ParamName, wire: impl Into<String>) -> Self {
        self.param_names.insert(param, wire.into());
        self
    }

    /// Flat value mapping, used for any field without its own sub-map
    pub fn value(mut self, value: impl Into<CanonicalValue>, wire: impl Into<String>) -> Self {
        self.values.flat.insert(value.into(), wire.into());
        self
    }

    /// Value mapping scoped to one field, e.g. DIRECTION's buy/sell codes
    pub fn value_for(
        mut self,
        param: ParamName,
        value: impl Into<CanonicalValue>,
        wire: impl Into<String>,
    ) -> Self {
        self.values
            .by_param
            .entry(param)
            .or_default()
            .insert(value.into(), wire.into());
        self
    }

    pub fn layout(mut self, kind: ObjectKind, layout: FieldLayout) -> Self {
        self.layouts.insert(kind, layout);
        self
    }

    pub fn event_type(mut self, template: impl Into<String>, endpoint: Endpoint) -> Self {
        self.event_types.push((template.into(), endpoint));
        self
    }

    /// Unit timestamps arrive in unless overridden per class
    pub fn source_in_milliseconds(mut self, in_milliseconds: bool) -> Self {
        self.source_time_unit = if in_milliseconds {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        };
        self
    }

    pub fn time_unit_for(mut self, kind: ObjectKind, unit: TimeUnit) -> Self {
        self.time_unit_overrides.insert(kind, unit);
        self
    }

    /// Unit outbound time params are sent in; defaults to the source unit
    pub fn send_time_unit(mut self, unit: TimeUnit) -> Self {
        self.send_time_unit = Some(unit);
        self
    }

    /// UTC offset used to anchor `HH:MM:SS` stamps
    pub fn time_of_day_offset_secs(mut self, offset_secs: i32) -> Self {
        self.time_of_day_offset_secs = Some(offset_secs);
        self
    }

    pub fn default_sorting(mut self, sorting: Sorting) -> Self {
        self.default_sorting = sorting;
        self
    }

    pub fn tolerate_extra_params(mut self, tolerate: bool) -> Self {
        self.tolerates_extra_params = tolerate;
        self
    }

    pub fn build(self) -> Result<ConversionTable, ExchangeError> {
        let mut endpoint_lookup = HashMap::new();
        for (endpoint, raw) in &self.endpoints {
            let template = ChannelTemplate::parse(raw)?;
            check_placeholders(&template)?;
            if endpoint_lookup.insert(*endpoint, template).is_some() {
                return Err(config_error(format!("Endpoint {} mapped twice", endpoint)));
            }
        }

        let mut endpoint_by_event_type = Vec::with_capacity(self.event_types.len());
        for (raw, endpoint) in &self.event_types {
            let template = ChannelTemplate::parse(raw)?;
            check_placeholders(&template)?;
            endpoint_by_event_type.push((template, *endpoint));
        }

        let time_of_day_offset = match self.time_of_day_offset_secs {
            Some(secs) => Some(FixedOffset::east_opt(secs).ok_or_else(|| {
                config_error(format!("Invalid time-of-day offset: {} seconds", secs))
            })?),
            None => None,
        };

        let table = ConversionTable {
            endpoint_lookup,
            param_name_lookup: self.param_names,
            param_value_lookup: self.values,
            param_lookup_by_class: self.layouts,
            endpoint_by_event_type,
            source_time_unit: self.source_time_unit,
            time_unit_overrides: self.time_unit_overrides,
            send_time_unit: self.send_time_unit.unwrap_or(self.source_time_unit),
            time_of_day_offset,
            default_sorting: self.default_sorting,
            tolerates_extra_params: self.tolerates_extra_params,
        };
        validate(&table)?;
        Ok(table)
    }
}

fn config_error(message: String) -> ExchangeError {
    ExchangeError::ConfigurationError(message)
}

fn check_placeholders(template: &ChannelTemplate) -> Result<(), ExchangeError> {
    for name in template.placeholders() {
        if ParamName::from_name(name).is_none() {
            return Err(config_error(format!(
                "Unknown placeholder '{{{}}}' in '{}'",
                name, template
            )));
        }
    }
    Ok(())
}

fn validate(table: &ConversionTable) -> Result<(), ExchangeError> {
    let error_layout = table
        .layout(ObjectKind::Error)
        .ok_or_else(|| config_error("Missing Error field layout".to_string()))?;
    if !matches!(error_layout, FieldLayout::Keyed(_)) {
        return Err(config_error("Error layout must be keyed".to_string()));
    }

    for (kind, layout) in &table.param_lookup_by_class {
        for param in kind.required_params() {
            if !layout.contains(*param) {
                return Err(config_error(format!(
                    "{:?} layout is missing required field '{}'",
                    kind, param
                )));
            }
        }
    }

    for (endpoint, template) in &table.endpoint_lookup {
        let kind = ObjectKind::for_endpoint(*endpoint);
        if table.layout(kind).is_none() {
            return Err(config_error(format!(
                "Endpoint {} produces {:?} but no layout is declared",
                endpoint, kind
            )));
        }
        if *endpoint == Endpoint::Candle && table.param_value_lookup.intervals().is_empty() {
            return Err(config_error(
                "Candle endpoint declared without any interval values".to_string(),
            ));
        }
        if template.has_placeholder(ParamName::Interval.as_str())
            && table.param_value_lookup.intervals().is_empty()
        {
            return Err(config_error(format!(
                "Template '{}' needs interval values",
                template
            )));
        }
    }

    if table
        .layout(ObjectKind::Trade)
        .is_some_and(|layout| layout.contains(ParamName::Direction))
    {
        for direction in [Direction::Buy, Direction::Sell] {
            if table
                .param_value_lookup
                .encode(ParamName::Direction, direction.into())
                .is_none()
            {
                return Err(config_error(format!(
                    "Trade layout decodes direction but {:?} has no wire value",
                    direction
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConversionTableBuilder {
        ConversionTable::builder()
            .layout(
                ObjectKind::Error,
                FieldLayout::keyed([("code", ParamName::Code), ("msg", ParamName::Message)]),
            )
            .layout(
                ObjectKind::Trade,
                FieldLayout::keyed([("ts", ParamName::Timestamp), ("p", ParamName::Price)]),
            )
    }

    #[test]
    fn test_minimal_table_builds() {
        let table = minimal().endpoint(Endpoint::Trade, "trades").build().unwrap();
        assert!(table.endpoint_template(Endpoint::Trade).is_some());
        assert_eq!(table.send_time_unit(), TimeUnit::Milliseconds);
        assert_eq!(table.default_sorting(), Sorting::Ascending);
    }

    #[test]
    fn test_missing_error_layout_fails_fast() {
        let err = ConversionTable::builder().build().unwrap_err();
        assert!(matches!(err, ExchangeError::ConfigurationError(_)));
    }

    #[test]
    fn test_endpoint_without_layout_fails_fast() {
        let err = minimal()
            .endpoint(Endpoint::Candle, "kline")
            .value(Interval::Min1, "1min")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Candle"));
    }

    #[test]
    fn test_candle_endpoint_requires_intervals() {
        let err = minimal()
            .endpoint(Endpoint::Candle, "kline")
            .layout(
                ObjectKind::Candle,
                FieldLayout::positional([
                    ParamName::Timestamp,
                    ParamName::PriceOpen,
                    ParamName::PriceHigh,
                    ParamName::PriceLow,
                    ParamName::PriceClose,
                    ParamName::Amount,
                ]),
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_trade_layout_requires_price() {
        let err = minimal()
            .layout(
                ObjectKind::Trade,
                FieldLayout::keyed([("ts", ParamName::Timestamp)]),
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_direction_needs_both_sides() {
        let err = minimal()
            .layout(
                ObjectKind::Trade,
                FieldLayout::keyed([
                    ("ts", ParamName::Timestamp),
                    ("p", ParamName::Price),
                    ("side", ParamName::Direction),
                ]),
            )
            .value_for(ParamName::Direction, Direction::Buy, "buy")
            .build()
            .unwrap_err();
        assert!(matches!(err, ExchangeError::ConfigurationError(_)));
    }

    #[test]
    fn test_unknown_placeholder_fails_fast() {
        let err = minimal()
            .endpoint(Endpoint::Trade, "sub_{market}")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("market"));
    }

    #[test]
    fn test_value_lookup_prefers_scoped_map() {
        let table = minimal()
            .value(Direction::Buy, "b")
            .value_for(ParamName::Direction, Direction::Buy, "buy")
            .build()
            .unwrap();
        let values = table.values();
        assert_eq!(values.encode(ParamName::Direction, Direction::Buy.into()), Some("buy"));
        // flat fallback for other fields
        assert_eq!(values.encode(ParamName::Sorting, Direction::Buy.into()), Some("b"));
        assert_eq!(
            values.decode(ParamName::Direction, "buy"),
            Some(CanonicalValue::Direction(Direction::Buy))
        );
    }

    #[test]
    fn test_flat_decode_is_scoped_to_field_type() {
        let table = minimal()
            .value(Interval::Min1, "1")
            .value(Sorting::Descending, "1")
            .build()
            .unwrap();
        assert_eq!(
            table.values().decode(ParamName::Interval, "1"),
            Some(CanonicalValue::Interval(Interval::Min1))
        );
        assert_eq!(
            table.values().decode(ParamName::Sorting, "1"),
            Some(CanonicalValue::Sorting(Sorting::Descending))
        );
    }

    #[test]
    fn test_time_unit_override() {
        let table = minimal()
            .source_in_milliseconds(true)
            .time_unit_for(ObjectKind::Trade, TimeUnit::Seconds)
            .build()
            .unwrap();
        assert_eq!(table.source_time_unit(ObjectKind::Trade), TimeUnit::Seconds);
        assert_eq!(table.source_time_unit(ObjectKind::Candle), TimeUnit::Milliseconds);
    }
}
