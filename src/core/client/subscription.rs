use crate::core::types::{Endpoint, Interval};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A live stream identity; duplicates collapse in the active set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: Endpoint,
    pub symbol: Option<String>,
    pub interval: Option<Interval>,
}

impl Subscription {
    pub fn new(endpoint: Endpoint, symbol: Option<String>, interval: Option<Interval>) -> Self {
        Self {
            endpoint,
            symbol,
            interval,
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)?;
        if let Some(symbol) = &self.symbol {
            write!(f, ":{}", symbol)?;
        }
        if let Some(interval) = &self.interval {
            write!(f, ":{}", interval.as_code())?;
        }
        Ok(())
    }
}
