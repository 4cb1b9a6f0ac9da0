//! WebSocket types and configuration

use super::backoff::ReconnectConfig;
use std::time::Duration;
use thiserror::Error;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Delay policy between connection attempts
    pub reconnect: ReconnectConfig,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect: ReconnectConfig::default(),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum consecutive failed attempts (0 = infinite)
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.reconnect.max_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.reconnect.initial_delay = d;
        self
    }

    /// Set maximum reconnection delay
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.reconnect.max_delay = d;
        self
    }

    /// Replace the whole reconnection policy
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Events emitted by the connection loop
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// Text frame
    Text(String),
    /// Opening a connection
    Connecting { attempt: u32 },
    /// Connection established
    Connected,
    /// Connection closed or failed to open
    Disconnected,
    /// Waiting `delay` before the next attempt
    Reconnecting { attempt: u32, delay: Duration },
    /// Attempts exhausted; the loop has stopped
    GaveUp,
}

/// WebSocket errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WsError {
    /// Connection failed or dropped
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Maximum reconnection attempts exceeded
    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
}
