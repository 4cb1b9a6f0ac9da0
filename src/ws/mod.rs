//! WebSocket client library
//!
//! Provides a reusable WebSocket client with automatic reconnection,
//! ping/pong handling, and configurable backoff.

mod backoff;
mod client;
mod transport;
mod types;

pub use backoff::{ReconnectConfig, ReconnectPolicy};
pub use client::{WsClient, WsConnection};
pub use transport::{FrameSource, Transport, TungsteniteTransport};
pub use types::{WsConfig, WsError, WsMessage};
