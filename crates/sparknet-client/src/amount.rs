//! Fixed-point token amounts.
//!
//! Amounts are stored as stroops (1 unit = 10^7 stroops) and converted to a
//! decimal string only for display. All conversions are integer arithmetic.

use crate::error::{Result, SparkError};
use crate::{DECIMALS, STROOPS_PER_UNIT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An amount of the payment token, in stroops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount {
    stroops: u128,
}

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self { stroops: 0 };

    /// Create an amount from stroops.
    #[must_use]
    pub const fn from_stroops(stroops: u128) -> Self {
        Self { stroops }
    }

    /// Create an amount from whole units.
    ///
    /// # Errors
    ///
    /// Returns error on overflow.
    pub fn from_units(units: u128) -> Result<Self> {
        units
            .checked_mul(STROOPS_PER_UNIT)
            .map(Self::from_stroops)
            .ok_or_else(|| SparkError::invalid_amount(format!("{units} units overflows")))
    }

    /// Get the amount in stroops.
    #[must_use]
    pub const fn stroops(&self) -> u128 {
        self.stroops
    }

    /// Check if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.stroops == 0
    }

    /// Checked multiplication by a count (e.g. hours).
    #[must_use]
    pub const fn checked_mul(&self, factor: u64) -> Option<Self> {
        match self.stroops.checked_mul(factor as u128) {
            Some(stroops) => Some(Self { stroops }),
            None => None,
        }
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(&self, other: Self) -> Option<Self> {
        match self.stroops.checked_add(other.stroops) {
            Some(stroops) => Some(Self { stroops }),
            None => None,
        }
    }

    /// Convert to a signed amount, as token contracts expect.
    ///
    /// # Errors
    ///
    /// Returns error if the amount exceeds `i128::MAX`.
    pub fn to_i128(&self) -> Result<i128> {
        i128::try_from(self.stroops)
            .map_err(|_| SparkError::invalid_amount(format!("{} stroops exceeds i128", self.stroops)))
    }

    /// Exact decimal representation with trailing fractional zeros stripped.
    ///
    /// `0` → `"0"`, `10_000_000` → `"1"`, `12_345_678` → `"1.2345678"`.
    #[must_use]
    pub fn to_decimal_string(&self) -> String {
        let whole = self.stroops / STROOPS_PER_UNIT;
        let frac = self.stroops % STROOPS_PER_UNIT;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:0width$}", width = DECIMALS as usize);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }

    /// Parse a decimal string such as `"2.5"` into stroops.
    ///
    /// At most seven fractional digits are accepted; no rounding is applied.
    ///
    /// # Errors
    ///
    /// Returns error on empty input, signs, non-digits, excess precision, or overflow.
    pub fn parse_decimal(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(SparkError::invalid_amount("empty amount"));
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(SparkError::invalid_amount(format!("not a number: {input}")));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(SparkError::invalid_amount(format!("not a number: {input}")));
        }
        if frac.len() > DECIMALS as usize {
            return Err(SparkError::invalid_amount(format!(
                "{input} has more than {DECIMALS} decimal places"
            )));
        }

        let overflow = || SparkError::invalid_amount(format!("{input} is too large"));
        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_stroops: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
            padded.parse().map_err(|_| overflow())?
        };

        whole_units
            .checked_mul(STROOPS_PER_UNIT)
            .and_then(|w| w.checked_add(frac_stroops))
            .map(Self::from_stroops)
            .ok_or_else(overflow)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} XLM", self.to_decimal_string())
    }
}

impl FromStr for Amount {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_decimal(s)
    }
}

impl From<u128> for Amount {
    fn from(stroops: u128) -> Self {
        Self::from_stroops(stroops)
    }
}
