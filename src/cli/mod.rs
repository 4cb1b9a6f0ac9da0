//! CLI interface for tickerwatch
//!
//! Provides subcommands for:
//! - `watch`: Live price board until interrupted
//! - `snapshot`: Print the current market snapshot once
//! - `convert`: Convert an amount between two assets
//! - `history`: Print 30 days of daily prices for one asset
//! - `config`: Show the effective configuration

mod convert;
mod history;
mod snapshot;
mod table;
mod watch;

pub use convert::ConvertArgs;
pub use history::HistoryArgs;
pub use snapshot::SnapshotArgs;
pub use watch::WatchArgs;

use crate::board::{BoardOptions, PriceBoard};
use crate::cache::{CacheStore, FileStore, MemoryStore, SnapshotCache};
use crate::config::Config;
use crate::market::CoinGeckoClient;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "tickerwatch")]
#[command(about = "Live cryptocurrency price board backed by a cached REST snapshot and a streaming feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Keep the snapshot cache in memory even if a cache path is configured
    #[arg(long, global = true)]
    pub no_persist: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Live price board
    Watch(WatchArgs),
    /// Print the market snapshot once
    Snapshot(SnapshotArgs),
    /// Convert an amount between two assets
    Convert(ConvertArgs),
    /// Print daily price history for an asset
    History(HistoryArgs),
    /// Show configuration
    Config,
}

/// Snapshot cache over the configured API and storage
pub(crate) fn snapshot_cache(config: &Config) -> anyhow::Result<Arc<SnapshotCache>> {
    let client = CoinGeckoClient::with_config(config.api.client_config())?;
    let store: Arc<dyn CacheStore> = match &config.cache.path {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };
    Ok(Arc::new(SnapshotCache::new(Arc::new(client), store)))
}

/// Price board wired to the configured cache
pub(crate) fn price_board(config: &Config, options: BoardOptions) -> anyhow::Result<PriceBoard> {
    Ok(PriceBoard::new(snapshot_cache(config)?, options))
}
