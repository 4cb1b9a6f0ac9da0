//! Read-through snapshot cache

use super::{CacheEntry, CacheStore, Clock, SystemClock};
use crate::codec;
use crate::market::{FetchError, MarketDataSource, MarketsQuery, Snapshot};
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Freshness window used by the price table
pub const DEFAULT_FRESHNESS: Duration = Duration::from_millis(1000);

/// Where a snapshot returned by [`SnapshotCache`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// A fresh stored entry
    Cache,
    /// A new fetch, now written to the store
    Network,
}

/// Serves recent snapshots from storage and refetches stale ones
pub struct SnapshotCache {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl SnapshotCache {
    /// Create a cache over `source` that persists into `store`
    pub fn new(source: Arc<dyn MarketDataSource>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            source,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (tests drive time by hand)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn source(&self) -> &Arc<dyn MarketDataSource> {
        &self.source
    }

    /// Return the snapshot stored under `cache_key` if younger than
    /// `freshness`, otherwise fetch, store and return a new one
    pub async fn fetch_snapshot(
        &self,
        query: &MarketsQuery,
        cache_key: &str,
        freshness: Duration,
    ) -> Result<Snapshot, FetchError> {
        self.fetch_snapshot_with_origin(query, cache_key, freshness)
            .await
            .map(|(snapshot, _)| snapshot)
    }

    /// Like [`fetch_snapshot`](Self::fetch_snapshot), also reporting whether
    /// the store was written
    pub async fn fetch_snapshot_with_origin(
        &self,
        query: &MarketsQuery,
        cache_key: &str,
        freshness: Duration,
    ) -> Result<(Snapshot, SnapshotOrigin), FetchError> {
        let window_ms = i64::try_from(freshness.as_millis()).unwrap_or(i64::MAX);

        if let Some(snapshot) = self.lookup(cache_key, window_ms) {
            telemetry::increment(CounterMetric::CacheHits);
            tracing::debug!(cache_key, assets = snapshot.len(), "Snapshot served from cache");
            return Ok((snapshot, SnapshotOrigin::Cache));
        }
        telemetry::increment(CounterMetric::CacheMisses);

        let started = Instant::now();
        let body = self.source.fetch_markets(query).await.map_err(|e| {
            tracing::warn!(cache_key, error = %e, "Snapshot fetch failed");
            e
        })?;
        telemetry::record_latency(LatencyMetric::SnapshotFetch, started.elapsed());

        let captured_at_ms = self.clock.now_ms();
        let snapshot = Snapshot::from_value(body.clone(), to_datetime(captured_at_ms))?;

        let entry = CacheEntry::new(codec::encode(&body), captured_at_ms);
        if let Err(e) = self.store.set(cache_key, entry) {
            tracing::warn!(cache_key, error = %e, "Failed to persist snapshot");
        }

        tracing::debug!(cache_key, assets = snapshot.len(), "Snapshot fetched");
        Ok((snapshot, SnapshotOrigin::Network))
    }

    /// Drop the stored entry for `cache_key`
    pub fn invalidate(&self, cache_key: &str) {
        if let Err(e) = self.store.remove(cache_key) {
            tracing::warn!(cache_key, error = %e, "Failed to invalidate snapshot");
        }
    }

    fn lookup(&self, cache_key: &str, window_ms: i64) -> Option<Snapshot> {
        let entry = self.store.get(cache_key)?;
        if !entry.is_fresh(self.clock.now_ms(), window_ms) {
            return None;
        }

        let value = match codec::decode(&entry.payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Cached snapshot corrupt, refetching");
                return None;
            }
        };

        match Snapshot::from_value(value, to_datetime(entry.captured_at_ms)) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Cached snapshot unreadable, refetching");
                None
            }
        }
    }
}

fn to_datetime(ms: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}
