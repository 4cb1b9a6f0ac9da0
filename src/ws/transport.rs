//! Connection transports
//!
//! The connection loop only needs "open a URL" and "give me the next text
//! frame"; [`TungsteniteTransport`] provides both over a real socket.

use super::types::WsError;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Opens connections
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, WsError>;
}

/// An open connection yielding text frames
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame; `None` once the peer closed cleanly
    async fn next_frame(&mut self) -> Option<Result<String, WsError>>;
}

/// tokio-tungstenite transport with ping keepalive
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    ping_interval: Duration,
}

impl TungsteniteTransport {
    pub fn new(ping_interval: Duration) -> Self {
        Self {
            ping_interval: ping_interval.max(Duration::from_secs(1)),
        }
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, WsError> {
        tracing::info!(url = %url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        let (write, read) = ws_stream.split();

        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Ok(Box::new(TungsteniteSource {
            write,
            read,
            ping,
            waiting_for_pong: false,
        }))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TungsteniteSource {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    ping: Interval,
    waiting_for_pong: bool,
}

#[async_trait]
impl FrameSource for TungsteniteSource {
    async fn next_frame(&mut self) -> Option<Result<String, WsError>> {
        loop {
            tokio::select! {
                msg = self.read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                            Ok(text) => return Some(Ok(text)),
                            Err(_) => tracing::debug!("Dropping non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = self.write.send(Message::Pong(data)).await {
                                return Some(Err(WsError::SendFailed(e.to_string())));
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return None;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Some(Err(WsError::ConnectionFailed(e.to_string())));
                        }
                        None => {
                            return Some(Err(WsError::ConnectionFailed(
                                "Stream ended unexpectedly".into(),
                            )));
                        }
                    }
                }

                _ = self.ping.tick() => {
                    if self.waiting_for_pong {
                        return Some(Err(WsError::ConnectionFailed("Pong timeout".into())));
                    }
                    if let Err(e) = self.write.send(Message::Ping(Vec::new())).await {
                        return Some(Err(WsError::SendFailed(e.to_string())));
                    }
                    self.waiting_for_pong = true;
                }
            }
        }
    }
}
