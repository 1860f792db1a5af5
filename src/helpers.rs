use alloy::primitives::{
    utils::{format_units, parse_units},
    U256,
};

use crate::{consts::BPS_DENOMINATOR, prelude::*, Error};

/// Parse a human decimal string ("0.006") into base units with `decimals` places.
///
/// Negative and empty inputs are rejected.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(Error::InvalidAmount(amount.to_string()));
    }
    parse_units(trimmed, decimals)
        .map(|units| units.get_absolute())
        .map_err(|_| Error::InvalidAmount(amount.to_string()))
}

/// Format base units back into a human decimal string.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// `amount × bps / 10_000`, truncating.
pub fn apply_bps(amount: U256, bps: u16) -> U256 {
    amount.saturating_mul(U256::from(bps)) / U256::from(BPS_DENOMINATOR)
}

/// Shorten an address for log lines: 0x1234…abcd
pub fn short_address(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
