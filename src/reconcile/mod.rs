//! Price reconciliation
//!
//! Merges live ticks into the last known asset list. Every function here is
//! pure: the same list and tick always produce the same result.

use crate::feed::LiveTick;
use crate::market::Asset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference price the displayed percent change is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeBasis {
    /// Change since the previous in-memory price. Repeated ticks drift away
    /// from the provider's 24h figure.
    #[default]
    PreviousPrice,
    /// Change since the price implied 24h ago by the snapshot
    DayOpen,
}

/// Merge `tick` into `current` using [`ChangeBasis::PreviousPrice`]
pub fn reconcile(current: &[Asset], tick: &LiveTick) -> Vec<Asset> {
    reconcile_with(current, tick, ChangeBasis::PreviousPrice)
}

/// Merge `tick` into `current`
///
/// Order is preserved and no asset is ever added. Assets the tick does not
/// mention (or quotes with an unusable price) pass through unchanged.
pub fn reconcile_with(current: &[Asset], tick: &LiveTick, basis: ChangeBasis) -> Vec<Asset> {
    reconcile_counted(current, tick, basis).0
}

/// Like [`reconcile_with`], also returning how many assets were repriced
pub fn reconcile_counted(
    current: &[Asset],
    tick: &LiveTick,
    basis: ChangeBasis,
) -> (Vec<Asset>, usize) {
    let mut updated = 0;
    let next = current
        .iter()
        .map(|asset| match apply_tick(asset, tick, basis) {
            Some(next) => {
                updated += 1;
                next
            }
            None => asset.clone(),
        })
        .collect();
    (next, updated)
}

/// Reprice one asset, or `None` if the tick has nothing usable for it
pub fn apply_tick(asset: &Asset, tick: &LiveTick, basis: ChangeBasis) -> Option<Asset> {
    let price = tick_price(asset, tick)?;

    let base = match basis {
        ChangeBasis::PreviousPrice => asset.current_price,
        ChangeBasis::DayOpen => asset.reference_price.unwrap_or(asset.current_price),
    };

    let mut next = asset.clone();
    next.current_price = price;
    if let Some(change) = percent_change(base, price) {
        next.price_change_percentage_24h = change;
    }
    Some(next)
}

/// Look the asset up by lowercase symbol, then by id
fn tick_price(asset: &Asset, tick: &LiveTick) -> Option<Decimal> {
    tick.price(&asset.symbol.to_lowercase())
        .or_else(|| tick.price(&asset.id.to_lowercase()))
        .filter(|p| !p.is_sign_negative())
}

/// `(to - from) / from * 100`; `None` when `from` is zero or on overflow
fn percent_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from.is_zero() {
        return None;
    }
    to.checked_sub(from)?
        .checked_div(from)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
