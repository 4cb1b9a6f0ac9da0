//! WebSocket client with automatic reconnection

use super::backoff::ReconnectPolicy;
use super::transport::{FrameSource, Transport, TungsteniteTransport};
use super::types::{WsConfig, WsError, WsMessage};
use crate::telemetry::{self, CounterMetric};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Reusable WebSocket client that keeps a connection open for as long as
/// someone is listening
pub struct WsClient {
    config: WsConfig,
    transport: Arc<dyn Transport>,
}

/// Receiving end of a running connection loop
///
/// Dropping it stops the loop.
pub struct WsConnection {
    rx: mpsc::Receiver<WsMessage>,
    task: JoinHandle<()>,
}

impl WsConnection {
    /// Next event from the connection loop; `None` once it has stopped
    pub async fn recv(&mut self) -> Option<WsMessage> {
        self.rx.recv().await
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum SessionEnd {
    /// Peer closed or the connection failed; try again
    Dropped,
    /// Nobody is listening anymore
    ReceiverGone,
}

impl WsClient {
    /// Create a client over a real socket
    pub fn new(config: WsConfig) -> Self {
        let transport = Arc::new(TungsteniteTransport::new(config.ping_interval));
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: WsConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Start the connection loop
    ///
    /// Spawns a background task that opens the connection, forwards text
    /// frames, and reopens the connection after every close or error using
    /// the configured delay policy. Connection status changes are reported
    /// in-band (`Connecting`, `Connected`, `Disconnected`, `Reconnecting`).
    pub fn connect(&self) -> WsConnection {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();
        let transport = Arc::clone(&self.transport);

        let task = tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, transport, tx).await {
                tracing::error!(error = %e, "WebSocket connection loop stopped");
            }
        });

        WsConnection { rx, task }
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        transport: Arc<dyn Transport>,
        tx: mpsc::Sender<WsMessage>,
    ) -> Result<(), WsError> {
        let mut policy = ReconnectPolicy::new(config.reconnect.clone());
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);
            if tx.send(WsMessage::Connecting { attempt }).await.is_err() {
                return Ok(());
            }

            match transport.open(&config.url).await {
                Ok(source) => {
                    policy.reset();
                    tracing::info!(url = %config.url, "WebSocket connected");
                    if tx.send(WsMessage::Connected).await.is_err() {
                        return Ok(());
                    }
                    if let SessionEnd::ReceiverGone = Self::stream_frames(source, &tx).await {
                        tracing::debug!("Receiver dropped, closing connection");
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "WebSocket connection failed");
                }
            }

            if tx.send(WsMessage::Disconnected).await.is_err() {
                return Ok(());
            }

            let Some(delay) = policy.next_delay() else {
                tracing::error!("Max reconnection attempts reached");
                let _ = tx.send(WsMessage::GaveUp).await;
                return Err(WsError::MaxReconnectsExceeded);
            };

            telemetry::increment(CounterMetric::Reconnects);
            tracing::warn!(
                attempt = policy.attempt_count(),
                delay_ms = delay.as_millis() as u64,
                "WebSocket disconnected, reconnecting..."
            );

            if tx
                .send(WsMessage::Reconnecting {
                    attempt: policy.attempt_count(),
                    delay,
                })
                .await
                .is_err()
            {
                return Ok(());
            }

            sleep(delay).await;
        }
    }

    /// Forward frames until the connection ends
    async fn stream_frames(
        mut source: Box<dyn FrameSource>,
        tx: &mpsc::Sender<WsMessage>,
    ) -> SessionEnd {
        loop {
            match source.next_frame().await {
                Some(Ok(text)) => {
                    if tx.send(WsMessage::Text(text)).await.is_err() {
                        return SessionEnd::ReceiverGone;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket connection error");
                    return SessionEnd::Dropped;
                }
                None => {
                    tracing::info!("WebSocket connection closed by peer");
                    return SessionEnd::Dropped;
                }
            }
        }
    }
}
