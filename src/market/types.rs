//! Market data types

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// REST market-data errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, body read)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// Body did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One asset row of a market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Provider identifier (e.g. "bitcoin")
    pub id: String,
    /// Ticker symbol (e.g. "btc")
    pub symbol: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Current price in USD
    #[serde(default, deserialize_with = "non_negative_decimal")]
    pub current_price: Decimal,
    /// Percent change shown next to the price
    #[serde(default, deserialize_with = "nullable_decimal")]
    pub price_change_percentage_24h: Decimal,
    /// 7-day price series, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparkline_in_7d: Option<Sparkline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,
    /// Implied price 24h ago, derived when the snapshot is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<Decimal>,
}

impl Asset {
    /// Create an asset with just the fields the price table needs
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        current_price: Decimal,
        price_change_percentage_24h: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            current_price,
            price_change_percentage_24h,
            sparkline_in_7d: None,
            image: None,
            market_cap_rank: None,
            reference_price: None,
        }
    }

    /// Price implied 24h ago by the current price and 24h change
    ///
    /// `None` when the change is -100% (the open cannot be recovered).
    pub fn implied_open(&self) -> Option<Decimal> {
        let factor = Decimal::ONE + self.price_change_percentage_24h / Decimal::ONE_HUNDRED;
        self.current_price.checked_div(factor)
    }
}

/// 7-day price series as returned by the markets endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<Decimal>,
}

/// A full point-in-time ordered list of assets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub assets: Vec<Asset>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from a raw markets response
    ///
    /// Later rows repeating an already seen id are dropped so ids stay unique.
    pub fn from_value(value: Value, captured_at: DateTime<Utc>) -> Result<Self, FetchError> {
        let rows: Vec<Asset> = serde_json::from_value(value)
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

        let mut seen = HashSet::with_capacity(rows.len());
        let mut assets = Vec::with_capacity(rows.len());
        for mut asset in rows {
            if !seen.insert(asset.id.clone()) {
                tracing::warn!(id = %asset.id, "Duplicate asset id in snapshot, dropping");
                continue;
            }
            asset.reference_price = asset.implied_open();
            assets.push(asset);
        }

        Ok(Self {
            assets,
            captured_at,
        })
    }

    /// Find an asset by id
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// One point of an asset's daily price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Raw `market_chart` response body
#[derive(Debug, Deserialize)]
pub(crate) struct MarketChart {
    pub prices: Vec<(i64, Decimal)>,
}

impl MarketChart {
    pub(crate) fn into_points(self) -> Result<Vec<PricePoint>, FetchError> {
        self.prices
            .into_iter()
            .map(|(ts, price)| {
                let timestamp = Utc.timestamp_millis_opt(ts).single().ok_or_else(|| {
                    FetchError::InvalidResponse(format!("timestamp out of range: {}", ts))
                })?;
                Ok(PricePoint { timestamp, price })
            })
            .collect()
    }
}

/// Query parameters for the markets endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketsQuery {
    /// Number of assets to request
    pub per_page: u32,
    /// Include the 7-day sparkline
    pub sparkline: bool,
}

impl Default for MarketsQuery {
    fn default() -> Self {
        Self {
            per_page: 50,
            sparkline: false,
        }
    }
}

impl MarketsQuery {
    pub fn new(per_page: u32, sparkline: bool) -> Self {
        Self {
            per_page,
            sparkline,
        }
    }

    /// Query string pairs, in the order the provider documents them
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.per_page.to_string()),
            ("sparkline", self.sparkline.to_string()),
            ("price_change_percentage", "24h".to_string()),
        ]
    }
}

fn nullable_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_negative_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(nullable_decimal(deserializer)?.max(Decimal::ZERO))
}
