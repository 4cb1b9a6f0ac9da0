//! Shared live price feed with subscriber fan-out

use super::types::{ConnectionState, FeedError, LiveTick};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use crate::ws::{Transport, WsClient, WsConfig, WsConnection, WsMessage};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

type Handler = Arc<dyn Fn(&LiveTick) + Send + Sync>;

/// State shared between the client, its dispatch task and subscriptions
struct Shared {
    handlers: Mutex<BTreeMap<u64, Handler>>,
    next_id: AtomicU64,
    state: watch::Sender<ConnectionState>,
    /// Bumped on every disconnect so a cancelled task cannot publish state
    generation: AtomicU64,
}

impl Shared {
    fn handlers(&self) -> MutexGuard<'_, BTreeMap<u64, Handler>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, generation: u64, state: ConnectionState) {
        if self.generation.load(Ordering::SeqCst) == generation {
            let connected = if state == ConnectionState::Connected { 1.0 } else { 0.0 };
            telemetry::set_gauge(GaugeMetric::FeedConnected, connected);
            self.state.send_replace(state);
        }
    }

    /// Deliver a tick to every handler registered when dispatch started
    fn dispatch(&self, tick: &LiveTick) {
        let handlers: Vec<Handler> = self.handlers().values().cloned().collect();
        telemetry::increment(CounterMetric::Ticks);

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(tick))).is_err() {
                telemetry::increment(CounterMetric::HandlerPanics);
                tracing::warn!("Tick handler panicked; continuing with remaining subscribers");
            }
        }
    }
}

/// One process-wide connection to the streaming price feed
///
/// The connection opens on the first [`subscribe`](Self::subscribe) (or an
/// explicit [`connect`](Self::connect)) and is reopened after every drop.
/// Subscribers live in the client, so they survive reconnects untouched.
pub struct LiveFeedClient {
    ws: WsClient,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveFeedClient {
    /// Create a client over a real socket
    pub fn new(config: WsConfig) -> Self {
        Self::from_ws(WsClient::new(config))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: WsConfig, transport: Arc<dyn Transport>) -> Self {
        Self::from_ws(WsClient::with_transport(config, transport))
    }

    fn from_ws(ws: WsClient) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            ws,
            shared: Arc::new(Shared {
                handlers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                state,
                generation: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        self.ws.url()
    }

    /// Start the connection if it is not already running
    pub fn connect(&self) -> Result<(), FeedError> {
        let mut task = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        tracing::info!(url = %self.ws.url(), "Starting live feed");
        let connection = self.ws.connect();
        let shared = Arc::clone(&self.shared);
        let generation = shared.generation.load(Ordering::SeqCst);
        *task = Some(runtime.spawn(Self::run_message_loop(connection, shared, generation)));
        Ok(())
    }

    /// Register `handler` for every inbound tick
    ///
    /// The returned [`Subscription`] releases the handler when
    /// [`unsubscribe`](Subscription::unsubscribe) is called or it is dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&LiveTick) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.handlers().insert(id, Arc::new(handler));
        tracing::debug!(subscription = id, "Live feed subscriber added");

        if let Err(e) = self.connect() {
            tracing::warn!(error = %e, "Live feed not started");
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
            released: AtomicBool::new(false),
        }
    }

    /// Close the connection and drop every subscriber
    pub fn disconnect(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.lock().unwrap_or_else(|p| p.into_inner()).take() {
            task.abort();
        }
        self.shared.handlers().clear();
        self.shared.state.send_replace(ConnectionState::Disconnected);
        tracing::info!("Live feed disconnected");
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch connection state transitions
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.handlers().len()
    }

    /// Consume connection events, fanning text frames out to subscribers
    async fn run_message_loop(mut connection: WsConnection, shared: Arc<Shared>, generation: u64) {
        while let Some(msg) = connection.recv().await {
            match msg {
                WsMessage::Text(text) => match LiveTick::parse(&text) {
                    Ok(tick) => shared.dispatch(&tick),
                    Err(e) => {
                        telemetry::increment(CounterMetric::MalformedFrames);
                        tracing::debug!(error = %e, "Dropping malformed feed frame");
                    }
                },
                WsMessage::Connecting { attempt } => {
                    tracing::debug!(attempt, "Live feed connecting");
                    shared.set_state(generation, ConnectionState::Connecting);
                }
                WsMessage::Connected => {
                    tracing::info!("Live feed connected");
                    shared.set_state(generation, ConnectionState::Connected);
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Live feed disconnected");
                    shared.set_state(generation, ConnectionState::Disconnected);
                }
                WsMessage::Reconnecting { attempt, delay } => {
                    tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Live feed reconnect scheduled");
                }
                WsMessage::GaveUp => break,
            }
        }
        shared.set_state(generation, ConnectionState::Disconnected);
    }
}

impl Drop for LiveFeedClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|p| p.into_inner()).take() {
            task.abort();
        }
    }
}

/// A consumer's registration with the live feed
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
    released: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving ticks; calling it again is a no-op
    pub fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.handlers().remove(&self.id);
            tracing::debug!(subscription = self.id, "Live feed subscriber removed");
        }
    }

    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
