//! Watch command implementation

use super::table::render_assets;
use crate::board::{BoardState, PriceBoard};
use crate::config::Config;
use crate::feed::{ConnectionState, LiveFeedClient};
use clap::Args;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Rows to display (0 = all)
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Refetch the snapshot every N seconds (0 = only at startup)
    #[arg(long, default_value_t = 0)]
    pub refresh_secs: u64,

    /// Skip the live feed and show the snapshot only
    #[arg(long)]
    pub no_feed: bool,
}

impl WatchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let board = super::price_board(config, config.board_options())?;
        let mut changes = board.changes();

        if let Err(e) = board.refresh().await {
            tracing::error!(error = %e, "Initial snapshot failed");
        }

        let feed = (!self.no_feed).then(|| LiveFeedClient::new(config.feed.ws_config()));
        let _subscription = feed.as_ref().map(|feed| board.attach(feed));
        let mut feed_state = feed.as_ref().map(|feed| feed.state_changes());

        // interval() panics on a zero period
        let period = Duration::from_secs(self.refresh_secs.max(1));
        let mut refresh = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        render(&changes.borrow_and_update(), self.limit);
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, shutting down");
                    break;
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    render(&changes.borrow_and_update(), self.limit);
                }
                _ = refresh.tick(), if self.refresh_secs > 0 => {
                    if in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
                        tracing::debug!("Previous snapshot refresh still running, skipping tick");
                        continue;
                    }
                    in_flight = Some(spawn_refresh(board.clone()));
                }
                state = next_state(&mut feed_state), if feed_state.is_some() => {
                    match state {
                        Some(state) => tracing::info!(%state, "Live feed state"),
                        None => feed_state = None,
                    }
                }
            }
        }

        if let Some(task) = in_flight {
            task.abort();
        }
        if let Some(feed) = feed {
            feed.disconnect();
        }
        Ok(())
    }
}

/// Run a snapshot refresh off the caller's task
fn spawn_refresh(board: PriceBoard) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = board.refresh().await {
            tracing::warn!(error = %e, "Snapshot refresh failed, keeping last prices");
        }
    })
}

async fn next_state(
    rx: &mut Option<tokio::sync::watch::Receiver<ConnectionState>>,
) -> Option<ConnectionState> {
    let rx = rx.as_mut()?;
    rx.changed().await.ok()?;
    let state = *rx.borrow_and_update();
    Some(state)
}

fn render(state: &BoardState, limit: usize) {
    match state {
        BoardState::Loading => println!("Loading prices..."),
        BoardState::Ready(view) => {
            println!(
                "\nv{}  updated {}",
                view.version,
                view.updated_at.format("%H:%M:%S")
            );
            print!("{}", render_assets(&view.assets, limit));
        }
    }
}
