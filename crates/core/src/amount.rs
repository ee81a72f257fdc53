//! Fixed-point decimal amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional decimal digits an amount carries.
pub const DECIMALS: u32 = 8;

/// Base units in one whole coin.
pub const UNITS_PER_COIN: i64 = 10i64.pow(DECIMALS);

/// Errors that can occur while parsing an amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("malformed amount: {0:?}")]
    Malformed(String),

    #[error("amount has more than 8 fractional digits")]
    TooPrecise,

    #[error("amount out of range")]
    Overflow,
}

/// A signed decimal amount with eight fractional digits.
///
/// Negative values are representable so that admission checks can reject them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Amount(i64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Create an amount from raw base units.
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Create an amount of whole coins.
    pub fn whole(coins: i64) -> Result<Self, AmountError> {
        coins
            .checked_mul(UNITS_PER_COIN)
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Parse a decimal string such as `"5"`, `"-0.5"` or `"0.01"`.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        let well_formed = !(int_part.is_empty() && frac_part.is_empty())
            && int_part.bytes().all(|b| b.is_ascii_digit())
            && frac_part.bytes().all(|b| b.is_ascii_digit())
            && !(digits.contains('.') && frac_part.is_empty());
        if !well_formed {
            return Err(AmountError::Malformed(s.to_string()));
        }
        if frac_part.len() > DECIMALS as usize {
            return Err(AmountError::TooPrecise);
        }

        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| AmountError::Overflow)?
        };
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            let scale = 10i64.pow(DECIMALS - frac_part.len() as u32);
            frac_part.parse::<i64>().map_err(|_| AmountError::Overflow)? * scale
        };

        let units = whole
            .checked_mul(UNITS_PER_COIN)
            .and_then(|w| w.checked_add(frac))
            .ok_or(AmountError::Overflow)?;

        Ok(Self(if negative { -units } else { units }))
    }

    /// Raw base units.
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Check whether the amount is below zero.
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_coin = UNITS_PER_COIN as u64;
        let whole = abs / per_coin;
        let frac = abs % per_coin;

        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let frac = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({self})")
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}
