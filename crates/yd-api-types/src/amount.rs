use alloy_primitives::U256;
use alloy_primitives::utils::{ParseUnits, format_units, parse_units};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places of every amount that crosses the contract boundary
/// (platform token and native asset alike).
pub const TOKEN_DECIMALS: usize = 18;

/// Whole-token digits that always fit in a `U256` once scaled by 10^18.
const MAX_WHOLE_DIGITS: usize = 59;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,
    #[error("'{0}' is not a decimal number")]
    Malformed(String),
    #[error("at most {TOKEN_DECIMALS} decimal places are supported")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Fixed-point amount stored as a count of 10^-18 units.
///
/// Parsing from user text happens once at the form boundary; every layer
/// below carries the scaled integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TokenAmount(U256);

fn unit() -> U256 {
    U256::from(10u128.pow(TOKEN_DECIMALS as u32))
}

impl TokenAmount {
    pub const ZERO: Self = Self(U256::ZERO);

    pub fn from_base_units(value: U256) -> Self {
        Self(value)
    }

    /// Whole tokens, e.g. `from_tokens(100)` is 100.0.
    pub fn from_tokens(whole: u64) -> Self {
        Self(U256::from(whole) * unit())
    }

    pub fn base_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
            return Err(AmountError::Malformed(raw.to_owned()));
        }
        if frac.len() > TOKEN_DECIMALS {
            return Err(AmountError::TooPrecise);
        }
        if whole.trim_start_matches('0').len() > MAX_WHOLE_DIGITS {
            return Err(AmountError::Overflow);
        }

        match parse_units(raw, "ether") {
            Ok(ParseUnits::U256(units)) => Ok(Self(units)),
            Ok(ParseUnits::I256(_)) => Err(AmountError::Malformed(raw.to_owned())),
            Err(_) => Err(AmountError::Overflow),
        }
    }

    /// Parse and require a strictly positive value.
    pub fn parse_positive(input: &str) -> Result<Self, AmountError> {
        let amount = Self::parse(input)?;
        if amount.is_zero() {
            return Err(AmountError::NotPositive);
        }
        Ok(amount)
    }

    /// `self * mul / div`, `None` on overflow or a zero divisor.
    pub fn mul_div(&self, mul: U256, div: U256) -> Option<Self> {
        if div.is_zero() {
            return None;
        }
        self.0.checked_mul(mul).map(|product| Self(product / div))
    }

    /// Cost in base units when buying `self` tokens at `price` base units per token.
    pub fn cost_at(&self, price: U256) -> Option<U256> {
        self.mul_div(price, unit()).map(|cost| cost.0)
    }

    /// Render with exactly `places` decimals (truncated).
    pub fn format_fixed(&self, places: usize) -> String {
        let (whole, frac) = self.split();
        if places == 0 {
            return whole;
        }
        let places = places.min(TOKEN_DECIMALS);
        let frac = frac.get(..places).unwrap_or(&frac);
        format!("{whole}.{frac:0<places$}")
    }

    /// Whole part and the 18-digit zero-padded fraction.
    fn split(&self) -> (String, String) {
        let Ok(formatted) = format_units(self.0, "ether") else {
            let frac = (self.0 % unit()).to_string();
            return ((self.0 / unit()).to_string(), format!("{frac:0>TOKEN_DECIMALS$}"));
        };
        match formatted.split_once('.') {
            Some((whole, frac)) => (whole.to_owned(), format!("{frac:0<TOKEN_DECIMALS$}")),
            None => (formatted, "0".repeat(TOKEN_DECIMALS)),
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, frac) = self.split();
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{frac}")
        }
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<TokenAmount> for String {
    fn from(value: TokenAmount) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
