//! Conversions between human-entered Kofi amounts and on-chain integer units.

use crate::error::{KofiError, Result};

/// Kofi uses 8 decimal places on chain.
pub const KOFI_DECIMALS: u32 = 8;

const UNIT: u64 = 10u64.pow(KOFI_DECIMALS);

/// Convert a decimal string such as `"1.11"` into on-chain units.
///
/// Fractional digits beyond 8 places are truncated.
pub fn parse_amount(value: &str) -> Result<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(KofiError::InvalidAmount("amount is empty".to_string()));
    }

    let mut parts = value.split('.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(KofiError::InvalidAmount(format!("{} has more than one decimal point", value)));
    }

    if whole.is_empty() && fraction.is_empty() {
        return Err(KofiError::InvalidAmount(format!("{} has no digits", value)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(KofiError::InvalidAmount(format!("{} is not a non-negative decimal", value)));
    }

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(UNIT))
            .ok_or_else(|| KofiError::InvalidAmount(format!("{} is too large", value)))?
    };

    let mut fraction: String = fraction.chars().take(KOFI_DECIMALS as usize).collect();
    while fraction.len() < KOFI_DECIMALS as usize {
        fraction.push('0');
    }
    let fraction_units: u64 = fraction
        .parse()
        .map_err(|_| KofiError::InvalidAmount(format!("{} is not a valid amount", value)))?;

    whole_units
        .checked_add(fraction_units)
        .ok_or_else(|| KofiError::InvalidAmount(format!("{} is too large", value)))
}

/// Render on-chain units with two fractional digits, the way balances are displayed.
pub fn format_amount(units: u64) -> String {
    let whole = units / UNIT;
    let fraction = units % UNIT;
    let fraction = format!("{:08}", fraction);
    format!("{}.{}", whole, &fraction[..2])
}
