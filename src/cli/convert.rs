//! Convert command implementation

use super::table::format_price;
use crate::board::BoardOptions;
use crate::config::Config;
use crate::convert::{convert, find_asset, parse_amount};
use crate::market::MarketsQuery;
use clap::Args;

/// Cache domain used by the converter
const CONVERTER_DOMAIN: &str = "converter";
/// Assets offered by the converter
const CONVERTER_PER_PAGE: u32 = 30;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Amount to convert
    pub amount: String,
    /// Source asset id or symbol
    pub from: String,
    /// Target asset id or symbol
    pub to: String,
}

impl ConvertArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let amount = parse_amount(&self.amount)?;

        let options = BoardOptions {
            query: MarketsQuery::new(CONVERTER_PER_PAGE, true),
            cache_key: CONVERTER_DOMAIN.to_string(),
            ..config.board_options()
        };
        let board = super::price_board(config, options)?;
        board.refresh().await?;
        let assets = board.assets().unwrap_or_default();

        let value = convert(&assets, amount, &self.from, &self.to)?;
        // convert() has already resolved both keys
        let from = find_asset(&assets, &self.from).map_or(self.from.as_str(), |a| a.symbol.as_str());
        let to = find_asset(&assets, &self.to).map_or(self.to.as_str(), |a| a.symbol.as_str());

        println!(
            "{} {} = {} {}",
            amount,
            from.to_uppercase(),
            value,
            to.to_uppercase()
        );
        if let Some(asset) = find_asset(&assets, &self.from) {
            println!(
                "1 {} = ${}",
                asset.symbol.to_uppercase(),
                format_price(asset.current_price)
            );
        }
        Ok(())
    }
}
