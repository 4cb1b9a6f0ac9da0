//! Live price feed module
//!
//! One shared streaming connection to the CoinCap price feed, fanned out to
//! any number of subscribers.

mod client;
mod types;

pub use client::{LiveFeedClient, Subscription};
pub use types::{ConnectionState, FeedError, LiveTick};

/// CoinCap streaming prices endpoint
pub const COINCAP_WS_URL: &str = "wss://ws.coincap.io/prices";

/// Assets streamed by default
pub const DEFAULT_FEED_ASSETS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "tether",
    "solana",
    "cardano",
    "ripple",
    "polkadot",
    "dogecoin",
    "avalanche",
    "chainlink",
];

/// Build the feed URL for a set of asset ids
pub fn feed_url(base: &str, assets: &[impl AsRef<str>]) -> String {
    let assets: Vec<&str> = assets.iter().map(AsRef::as_ref).collect();
    format!("{}?assets={}", base, assets.join(","))
}
