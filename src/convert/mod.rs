//! Currency conversion between listed assets

use crate::market::Asset;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places of a conversion result
pub const CONVERSION_SCALE: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("conversion overflowed")]
    Overflow,
}

/// Find an asset by id, falling back to a case-insensitive symbol match
pub fn find_asset<'a>(assets: &'a [Asset], key: &str) -> Option<&'a Asset> {
    assets
        .iter()
        .find(|a| a.id == key)
        .or_else(|| assets.iter().find(|a| a.symbol.eq_ignore_ascii_case(key)))
}

/// Parse a user-entered amount. Empty input counts as zero.
pub fn parse_amount(input: &str) -> Result<Decimal, ConvertError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let amount = Decimal::from_str(input)
        .or_else(|_| Decimal::from_scientific(input))
        .map_err(|_| ConvertError::InvalidAmount(input.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConvertError::InvalidAmount(input.to_string()));
    }
    Ok(amount)
}

/// Convert `amount` of `from` into units of `to`
///
/// Result is `amount * from_price / to_price` rounded to
/// [`CONVERSION_SCALE`] places. Either price being zero yields zero.
pub fn convert(
    assets: &[Asset],
    amount: Decimal,
    from: &str,
    to: &str,
) -> Result<Decimal, ConvertError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConvertError::InvalidAmount(amount.to_string()));
    }
    let from_asset =
        find_asset(assets, from).ok_or_else(|| ConvertError::UnknownAsset(from.to_string()))?;
    let to_asset =
        find_asset(assets, to).ok_or_else(|| ConvertError::UnknownAsset(to.to_string()))?;

    let from_price = from_asset.current_price;
    let to_price = to_asset.current_price;
    if from_price.is_zero() || to_price.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let value = amount
        .checked_mul(from_price)
        .and_then(|v| v.checked_div(to_price))
        .ok_or(ConvertError::Overflow)?;
    Ok(value.round_dp(CONVERSION_SCALE).normalize())
}
