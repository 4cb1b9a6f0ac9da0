//! Price board
//!
//! The consumer side of the pipeline: seeds a price table from a cached
//! snapshot, then keeps it current with live ticks.

use crate::cache::{SnapshotCache, SnapshotOrigin, DEFAULT_FRESHNESS};
use crate::feed::{LiveFeedClient, LiveTick, Subscription};
use crate::market::{Asset, FetchError, MarketsQuery};
use crate::reconcile::{reconcile_counted, ChangeBasis};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// What the board shows
#[derive(Debug, Clone, PartialEq)]
pub enum BoardState {
    /// No snapshot has been applied yet
    Loading,
    Ready(BoardView),
}

impl BoardState {
    pub fn view(&self) -> Option<&BoardView> {
        match self {
            BoardState::Loading => None,
            BoardState::Ready(view) => Some(view),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, BoardState::Loading)
    }
}

/// A consistent version of the price table
#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub assets: Vec<Asset>,
    /// Increases with every applied snapshot or tick
    pub version: u64,
    /// Capture time of the snapshot the table was seeded from
    pub snapshot_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot applied to the board
    Applied { assets: usize },
    /// A newer request was issued while this one was in flight
    Superseded,
}

/// Board settings
#[derive(Debug, Clone)]
pub struct BoardOptions {
    pub query: MarketsQuery,
    /// Storage key for the snapshot cache
    pub cache_key: String,
    pub freshness: Duration,
    pub basis: ChangeBasis,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            query: MarketsQuery::default(),
            cache_key: "crypto".to_string(),
            freshness: DEFAULT_FRESHNESS,
            basis: ChangeBasis::default(),
        }
    }
}

struct BoardInner {
    cache: Arc<SnapshotCache>,
    options: BoardOptions,
    /// Sequence number of the most recently issued refresh
    issued: AtomicU64,
    state: watch::Sender<BoardState>,
}

impl BoardInner {
    fn apply_tick(&self, tick: &LiveTick) {
        let basis = self.options.basis;
        self.state.send_if_modified(|state| {
            let BoardState::Ready(view) = state else {
                return false;
            };
            let (assets, updated) = reconcile_counted(&view.assets, tick, basis);
            if updated == 0 {
                return false;
            }
            view.assets = assets;
            view.version += 1;
            view.updated_at = Utc::now();
            true
        });
    }
}

/// Price table fed by snapshots and live ticks
#[derive(Clone)]
pub struct PriceBoard {
    inner: Arc<BoardInner>,
}

impl PriceBoard {
    pub fn new(cache: Arc<SnapshotCache>, options: BoardOptions) -> Self {
        let (state, _) = watch::channel(BoardState::Loading);
        Self {
            inner: Arc::new(BoardInner {
                cache,
                options,
                issued: AtomicU64::new(0),
                state,
            }),
        }
    }

    pub fn options(&self) -> &BoardOptions {
        &self.inner.options
    }

    /// Fetch a snapshot (from cache or network) and reseed the table
    ///
    /// A response is only applied if no newer refresh was issued while it
    /// was in flight. On error the board keeps whatever it was showing.
    pub async fn refresh(&self) -> Result<RefreshOutcome, FetchError> {
        let inner = &self.inner;
        let seq = inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let options = &inner.options;

        let (snapshot, origin) = inner
            .cache
            .fetch_snapshot_with_origin(&options.query, &options.cache_key, options.freshness)
            .await?;

        let count = snapshot.len();
        let applied = inner.state.send_if_modified(|state| {
            if inner.issued.load(Ordering::SeqCst) != seq {
                return false;
            }
            let version = state.view().map_or(0, |v| v.version) + 1;
            *state = BoardState::Ready(BoardView {
                assets: snapshot.assets,
                version,
                snapshot_at: snapshot.captured_at,
                updated_at: Utc::now(),
            });
            true
        });

        if !applied {
            telemetry::increment(CounterMetric::StaleSnapshots);
            tracing::debug!(seq, ?origin, "Discarding superseded snapshot response");
            // A fetched stale body may have been written over the newer one
            if origin == SnapshotOrigin::Network {
                inner.cache.invalidate(&options.cache_key);
            }
            return Ok(RefreshOutcome::Superseded);
        }

        telemetry::set_gauge(GaugeMetric::BoardAssets, count as f64);
        tracing::info!(seq, assets = count, "Price board seeded from snapshot");
        Ok(RefreshOutcome::Applied { assets: count })
    }

    /// Start applying live ticks from `feed`
    pub fn attach(&self, feed: &LiveFeedClient) -> Subscription {
        let inner = Arc::clone(&self.inner);
        feed.subscribe(move |tick| inner.apply_tick(tick))
    }

    /// Apply one tick directly
    pub fn apply_tick(&self, tick: &LiveTick) {
        self.inner.apply_tick(tick);
    }

    pub fn state(&self) -> BoardState {
        self.inner.state.borrow().clone()
    }

    /// Current assets, once a snapshot has been applied
    pub fn assets(&self) -> Option<Vec<Asset>> {
        self.inner.state.borrow().view().map(|v| v.assets.clone())
    }

    /// Watch every new version of the board
    pub fn changes(&self) -> watch::Receiver<BoardState> {
        self.inner.state.subscribe()
    }
}
