//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Snapshot served from storage
    CacheHits,
    /// Snapshot fetched from the API
    CacheMisses,
    /// Live tick dispatched to subscribers
    Ticks,
    /// Feed frame that failed to parse
    MalformedFrames,
    /// Feed reconnection attempt
    Reconnects,
    /// Subscriber handler that panicked
    HandlerPanics,
    /// Snapshot response discarded as superseded
    StaleSnapshots,
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::CacheHits => "tickerwatch_cache_hits_total",
            CounterMetric::CacheMisses => "tickerwatch_cache_misses_total",
            CounterMetric::Ticks => "tickerwatch_ticks_total",
            CounterMetric::MalformedFrames => "tickerwatch_malformed_frames_total",
            CounterMetric::Reconnects => "tickerwatch_reconnects_total",
            CounterMetric::HandlerPanics => "tickerwatch_handler_panics_total",
            CounterMetric::StaleSnapshots => "tickerwatch_stale_snapshots_total",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// 1 while the live feed is connected
    FeedConnected,
    /// Assets on the price board
    BoardAssets,
}

impl GaugeMetric {
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::FeedConnected => "tickerwatch_feed_connected",
            GaugeMetric::BoardAssets => "tickerwatch_board_assets",
        }
    }
}

/// Latency metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMetric {
    /// REST markets request
    SnapshotFetch,
}

impl LatencyMetric {
    pub fn name(self) -> &'static str {
        match self {
            LatencyMetric::SnapshotFetch => "tickerwatch_snapshot_fetch_latency_ms",
        }
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
}

/// Install the Prometheus recorder and serve it on `0.0.0.0:{port}`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
