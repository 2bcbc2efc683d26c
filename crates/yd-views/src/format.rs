use alloy_primitives::Address;
use yd_api_types::TokenAmount;

/// `0x1234...abcd` form of a checksummed address.
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn with_symbol(amount: &TokenAmount, symbol: &str) -> String {
    format!("{amount} {symbol}")
}

pub fn fixed_with_symbol(amount: &TokenAmount, places: usize, symbol: &str) -> String {
    format!("{} {symbol}", amount.format_fixed(places))
}
