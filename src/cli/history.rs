//! History command implementation

use super::table::render_history;
use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Asset id (e.g. "bitcoin")
    pub id: String,

    /// Print the points as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let cache = super::snapshot_cache(config)?;
        let points = cache.source().fetch_price_history(&self.id).await?;
        tracing::debug!(id = %self.id, points = points.len(), "Fetched price history");

        if self.json {
            println!("{}", serde_json::to_string_pretty(&points)?);
        } else {
            print!("{}", render_history(&points));
        }
        Ok(())
    }
}
