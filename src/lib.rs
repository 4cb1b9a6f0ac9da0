//! tickerwatch: live cryptocurrency price board
//!
//! This library provides the core components for:
//! - Compressed snapshot payloads (zlib deflate + base64)
//! - A read-through snapshot cache over the CoinGecko markets API
//! - One shared, self-reconnecting CoinCap price stream with fan-out
//! - Pure reconciliation of live ticks into the last snapshot
//! - A price board that sequences refreshes and applies ticks
//! - Asset-to-asset conversion and 30-day price history

pub mod board;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod convert;
pub mod feed;
pub mod market;
pub mod reconcile;
pub mod telemetry;
pub mod ws;
