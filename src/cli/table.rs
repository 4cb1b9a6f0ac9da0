//! Plain-text table rendering

use crate::market::{Asset, PricePoint};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

/// Render the first `limit` assets (all when `limit` is 0)
pub(crate) fn render_assets(assets: &[Asset], limit: usize) -> String {
    let take = if limit == 0 { assets.len() } else { limit };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<8} {:<20} {:>16} {:>9}",
        "#", "SYMBOL", "NAME", "PRICE (USD)", "24H %"
    );

    for (i, asset) in assets.iter().take(take).enumerate() {
        let rank = asset.market_cap_rank.map_or(i as u32 + 1, |r| r);
        let _ = writeln!(
            out,
            "{:>4}  {:<8} {:<20} {:>16} {:>9}",
            rank,
            asset.symbol.to_uppercase(),
            truncate(&asset.name, 20),
            format_price(asset.current_price),
            format_change(asset.price_change_percentage_24h),
        );
    }
    out
}

pub(crate) fn render_history(points: &[PricePoint]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>16}", "DATE", "PRICE (USD)");
    for point in points {
        let _ = writeln!(
            out,
            "{:<12} {:>16}",
            point.timestamp.format("%Y-%m-%d"),
            format_price(point.price)
        );
    }
    out
}

/// Two decimals at or above one dollar, up to eight below
pub(crate) fn format_price(price: Decimal) -> String {
    let dp = if price >= Decimal::ONE { 2 } else { 8 };
    price
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .to_string()
}

pub(crate) fn format_change(change: Decimal) -> String {
    let rounded = change.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{:.2}%", rounded)
    } else {
        format!("+{:.2}%", rounded.abs())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).chain(['~']).collect()
    }
}
