use crate::core::errors::ExchangeError;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A wire name with `{name}` placeholders, e.g. `ok_sub_spot_{symbol}_kline_{interval}`
///
/// Templates are rendered when building requests and subscriptions, and
/// matched against inbound channel names to recover the placeholder values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl ChannelTemplate {
    pub fn parse(raw: &str) -> Result<Self, ExchangeError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        if inner == '{' {
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed || name.is_empty() {
                        return Err(ExchangeError::ConfigurationError(format!(
                            "Malformed placeholder in template '{}'",
                            raw
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    if matches!(segments.last(), Some(Segment::Placeholder(_))) {
                        return Err(ExchangeError::ConfigurationError(format!(
                            "Adjacent placeholders cannot be matched in template '{}'",
                            raw
                        )));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => {
                    return Err(ExchangeError::ConfigurationError(format!(
                        "Unbalanced '}}' in template '{}'",
                        raw
                    )));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|placeholder| placeholder == name)
    }

    /// Substitute every placeholder; a missing value is a configuration error
    pub fn render(&self, values: &HashMap<&str, String>) -> Result<String, ExchangeError> {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values.get(name.as_str()).ok_or_else(|| {
                        ExchangeError::ConfigurationError(format!(
                            "Missing value for '{{{}}}' in '{}'",
                            name, self.raw
                        ))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Match a concrete name, returning the captured placeholder values
    pub fn captures(&self, name: &str) -> Option<HashMap<String, String>> {
        let mut captured = HashMap::new();
        if match_segments(&self.segments, name, &mut captured) {
            Some(captured)
        } else {
            None
        }
    }
}

impl fmt::Display for ChannelTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn match_segments(
    segments: &[Segment],
    input: &str,
    captured: &mut HashMap<String, String>,
) -> bool {
    match segments.split_first() {
        None => input.is_empty(),
        Some((Segment::Literal(text), rest)) => input
            .strip_prefix(text.as_str())
            .is_some_and(|remaining| match_segments(rest, remaining, captured)),
        Some((Segment::Placeholder(name), rest)) => {
            match rest.first() {
                // trailing placeholder takes the remainder
                None => {
                    if input.is_empty() {
                        return false;
                    }
                    captured.insert(name.clone(), input.to_string());
                    true
                }
                Some(Segment::Literal(next)) => {
                    // try every occurrence of the following literal, shortest capture first
                    for (index, _) in input.match_indices(next.as_str()) {
                        if index == 0 {
                            continue;
                        }
                        let mut attempt = captured.clone();
                        attempt.insert(name.clone(), input[..index].to_string());
                        if match_segments(rest, &input[index..], &mut attempt) {
                            *captured = attempt;
                            return true;
                        }
                    }
                    false
                }
                // rejected at parse time
                Some(Segment::Placeholder(_)) => false,
            }
        }
    }
}
