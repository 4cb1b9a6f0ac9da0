//! Live feed types

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Live feed errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Frame was not a JSON object of prices
    #[error("malformed feed message: {0}")]
    MalformedMessage(String),
    /// No tokio runtime to run the connection on
    #[error("live feed needs a running tokio runtime")]
    NoRuntime,
}

/// Connection status of the live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// One pushed price update: lowercase key to decimal price string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LiveTick {
    prices: HashMap<String, String>,
}

impl LiveTick {
    /// Parse a raw feed frame
    ///
    /// String values are kept as-is and numeric values are kept in their
    /// textual form; other values are skipped. Keys are lowercased.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FeedError::MalformedMessage(e.to_string()))?;

        let Value::Object(map) = value else {
            return Err(FeedError::MalformedMessage(
                "expected a JSON object".to_string(),
            ));
        };

        let prices = map
            .into_iter()
            .filter_map(|(key, value)| {
                let price = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((key.to_lowercase(), price))
            })
            .collect();

        Ok(Self { prices })
    }

    /// Build a tick from key/price pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prices: pairs
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Raw price string for `key` (matched case-insensitively)
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.prices.get(key) {
            Some(price) => Some(price.as_str()),
            None => self.prices.get(&key.to_lowercase()).map(String::as_str),
        }
    }

    /// Parsed price for `key`, if present and a valid decimal
    pub fn price(&self, key: &str) -> Option<Decimal> {
        let raw = self.get(key)?;
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prices.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
