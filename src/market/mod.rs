//! Market data module
//!
//! REST snapshots of the top assets by market cap, plus per-asset history

mod coingecko;
mod types;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig, COINGECKO_API_URL};
pub use types::{Asset, FetchError, MarketsQuery, PricePoint, Snapshot, Sparkline};

use async_trait::async_trait;
use serde_json::Value;

/// Source of REST market data
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the raw markets response (an array of asset records)
    async fn fetch_markets(&self, query: &MarketsQuery) -> Result<Value, FetchError>;

    /// Fetch the 30-day daily price history of one asset
    async fn fetch_price_history(&self, id: &str) -> Result<Vec<PricePoint>, FetchError>;
}
