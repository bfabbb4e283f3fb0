//! Precision-safe numeric transforms shared by all providers.
//!
//! Providers hand us decimal strings. Everything here stays in
//! [`rust_decimal::Decimal`] so that a percentage rounded to two places is the
//! same on every run, with no binary float in between.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::MarketDataError;

/// Number of decimal places used for percentage fields.
pub const PERCENT_SCALE: u32 = 2;

/// Parse a decimal string, ignoring surrounding whitespace.
pub fn parse_decimal(value: &str) -> Result<Decimal, MarketDataError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed).map_err(|_| MarketDataError::InvalidNumber(trimmed.to_string()))
}

/// Round to two places (half away from zero) and render with exactly two
/// decimals.
pub fn round2(value: Decimal) -> String {
    let mut rounded =
        value.round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(PERCENT_SCALE);
    rounded.to_string()
}

/// Normalize a percentage string to two decimals.
///
/// Accepts a trailing `%` (`"-1.8652%"` becomes `"-1.87"`).
pub fn fixed2(value: &str) -> Result<String, MarketDataError> {
    let cleaned = value.trim().trim_end_matches('%');
    parse_decimal(cleaned).map(round2)
}

/// `round2((estimated - last_confirmed) / last_confirmed * 100)`.
pub fn percent_change(estimated: &str, last_confirmed: &str) -> Result<String, MarketDataError> {
    let estimated = parse_decimal(estimated)?;
    let last = parse_decimal(last_confirmed)?;

    if last.is_zero() {
        return Err(MarketDataError::InvalidNumber(last_confirmed.trim().to_string()));
    }

    let percent = (estimated - last)
        .checked_div(last)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| MarketDataError::InvalidNumber(last_confirmed.trim().to_string()))?;

    Ok(round2(percent))
}

/// Validate a decimal string and return it unchanged (trimmed).
///
/// Providers publish net values with their own number of places; the record
/// keeps them as published.
pub fn decimal_string(value: &str) -> Result<String, MarketDataError> {
    parse_decimal(value)?;
    Ok(value.trim().to_string())
}
