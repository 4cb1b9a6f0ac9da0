//! CoinGecko REST client
//!
//! Fetches the top assets by market cap and per-asset daily price history
//! from the public CoinGecko v3 API.

use super::types::MarketChart;
use super::{FetchError, MarketDataSource, MarketsQuery, PricePoint};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Days of history requested for the price chart
const HISTORY_DAYS: u32 = 30;

/// Configuration for the CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the CoinGecko markets API
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    client: Client,
}

impl CoinGeckoClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(CoinGeckoConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: CoinGeckoConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tickerwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn check_status(response: Response) -> Result<Response, FetchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(FetchError::Status { status, body })
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_markets(&self, query: &MarketsQuery) -> Result<Value, FetchError> {
        let url = format!("{}/coins/markets", self.config.base_url);

        tracing::debug!(url = %url, per_page = query.per_page, "Fetching market snapshot");

        let response = self.client.get(&url).query(&query.params()).send().await?;
        let response = Self::check_status(response).await?;
        let body: Value = response.json().await?;

        if !body.is_array() {
            return Err(FetchError::InvalidResponse(
                "markets response is not an array".to_string(),
            ));
        }

        Ok(body)
    }

    async fn fetch_price_history(&self, id: &str) -> Result<Vec<PricePoint>, FetchError> {
        let url = format!("{}/coins/{}/market_chart", self.config.base_url, id);

        tracing::debug!(url = %url, "Fetching price history");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("days", HISTORY_DAYS.to_string()),
                ("interval", "daily".to_string()),
            ])
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let chart: MarketChart = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
        chart.into_points()
    }
}
