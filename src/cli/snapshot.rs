//! Snapshot command implementation

use super::table::render_assets;
use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Rows to display (0 = all)
    #[arg(short, long, default_value_t = 0)]
    pub limit: usize,

    /// Print the assets as JSON
    #[arg(long)]
    pub json: bool,
}

impl SnapshotArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let board = super::price_board(config, config.board_options())?;
        board.refresh().await?;

        let assets = board.assets().unwrap_or_default();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&assets)?);
        } else {
            print!("{}", render_assets(&assets, self.limit));
        }
        Ok(())
    }
}
