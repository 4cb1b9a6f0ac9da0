//! Configuration types for tickerwatch

use crate::board::BoardOptions;
use crate::feed::{feed_url, COINCAP_WS_URL, DEFAULT_FEED_ASSETS};
use crate::market::{CoinGeckoConfig, MarketsQuery, COINGECKO_API_URL};
use crate::reconcile::ChangeBasis;
use crate::telemetry::LogFormat;
use crate::ws::{ReconnectConfig, WsConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// REST snapshot API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Assets requested per snapshot
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Request the 7-day sparkline with each asset
    #[serde(default)]
    pub sparkline: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    COINGECKO_API_URL.to_string()
}
fn default_per_page() -> u32 {
    50
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            per_page: default_per_page(),
            sparkline: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> CoinGeckoConfig {
        CoinGeckoConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn markets_query(&self) -> MarketsQuery {
        MarketsQuery::new(self.per_page, self.sparkline)
    }
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Key prefix; entries are stored as `{domain}Data` / `{domain}DataTimestamp`
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Max age of a cached snapshot (milliseconds)
    #[serde(default = "default_freshness_ms")]
    pub freshness_ms: u64,

    /// Backing file; in-memory storage when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_domain() -> String {
    "crypto".to_string()
}
fn default_freshness_ms() -> u64 {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            freshness_ms: default_freshness_ms(),
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_millis(self.freshness_ms)
    }
}

/// Live feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Full stream URL including the asset list
    #[serde(default = "default_feed_url")]
    pub url: String,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Cap on the reconnect delay; defaults to the base delay
    #[serde(default)]
    pub max_reconnect_delay_ms: Option<u64>,

    /// Delay growth per failed attempt (1.0 = fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default)]
    pub jitter_factor: f64,

    /// Consecutive failed attempts before giving up (0 = never)
    #[serde(default)]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

fn default_feed_url() -> String {
    feed_url(COINCAP_WS_URL, DEFAULT_FEED_ASSETS)
}
fn default_reconnect_delay_ms() -> u64 {
    5000
}
fn default_backoff_multiplier() -> f64 {
    1.0
}
fn default_ping_interval_secs() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_delay_ms: None,
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: 0.0,
            max_reconnect_attempts: 0,
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

impl FeedConfig {
    pub fn reconnect_config(&self) -> ReconnectConfig {
        let initial_delay = Duration::from_millis(self.reconnect_delay_ms);
        let max_delay = self
            .max_reconnect_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(initial_delay)
            .max(initial_delay);

        ReconnectConfig {
            initial_delay,
            max_delay,
            multiplier: self.backoff_multiplier.max(1.0),
            jitter_factor: self.jitter_factor.clamp(0.0, 1.0),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    pub fn ws_config(&self) -> WsConfig {
        WsConfig::new(&self.url)
            .reconnect(self.reconnect_config())
            .ping_interval(Duration::from_secs(self.ping_interval_secs))
    }
}

/// Price board configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub change_basis: ChangeBasis,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this port when set
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid
    pub fn load_or_default(path: impl AsRef<std::path::Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: Could not load config from {}: {}", path.display(), e);
            eprintln!("Using default configuration");
            Self::default()
        })
    }

    /// Board settings derived from the api, cache and board sections
    pub fn board_options(&self) -> BoardOptions {
        BoardOptions {
            query: self.api.markets_query(),
            cache_key: self.cache.domain.clone(),
            freshness: self.cache.freshness(),
            basis: self.board.change_basis,
        }
    }
}
