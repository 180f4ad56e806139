//! Token amounts, coins and transfers.
//!
//! Amounts are fixed point: one whole token is `10^DECIMALS` base units and
//! every amount on the wire is an `i64` count of base units.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AccAddress;

/// Number of fractional digits in a whole token.
pub const DECIMALS: u32 = 8;

const SCALE: i64 = 10i64.pow(DECIMALS);

/// A positive token amount in base units.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Wrap a raw base-unit count.
    pub fn from_base_units(units: i64) -> Result<Self, AmountError> {
        if units <= 0 {
            return Err(AmountError::NotPositive);
        }
        Ok(Self(units))
    }

    /// Raw base-unit count.
    pub fn base_units(&self) -> i64 {
        self.0
    }

    /// Whole-token value as a float, for display only.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Parse a decimal token amount (e.g. `"344.74"` or `"1.5e-3"`).
    ///
    /// Conversion works on the decimal text, so `344.74` becomes exactly
    /// `34_474_000_000` units. Digits past the eighth fractional place are
    /// truncated.
    pub fn from_decimal_str(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        let invalid = || AmountError::Invalid(s.to_string());

        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(idx) => {
                let exp: i32 = s[idx + 1..].parse().map_err(|_| invalid())?;
                (&s[..idx], exp)
            }
            None => (s, 0),
        };

        if mantissa.starts_with('-') {
            return Err(AmountError::NotPositive);
        }
        let mantissa = mantissa.strip_prefix('+').unwrap_or(mantissa);

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        // value = digits * 10^-(frac_len - exponent); base units shift by DECIMALS.
        let shift = DECIMALS as i64 - (frac_part.len() as i64 - exponent as i64);
        let digits = format!("{}{}", int_part, frac_part);
        let digits = digits.trim_start_matches('0');

        let kept = if shift >= 0 {
            // i64::MAX has 19 digits
            if digits.len() as i64 + shift > 19 {
                return Err(AmountError::Overflow);
            }
            format!("{}{}", digits, "0".repeat(shift as usize))
        } else {
            let drop = (-shift) as usize;
            if drop >= digits.len() {
                String::new()
            } else {
                digits[..digits.len() - drop].to_string()
            }
        };

        if kept.is_empty() {
            return Err(AmountError::NotPositive);
        }
        let units: i64 = kept.parse().map_err(|_| AmountError::Overflow)?;
        Self::from_base_units(units)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:08}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

/// Errors converting token amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Amount must be positive")]
    NotPositive,

    #[error("Amount overflows 64-bit base units")]
    Overflow,
}

/// A quantity of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: i64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: i64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// A normalized coin list: sorted by denomination with no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Build a normalized list, merging equal denominations.
    ///
    /// Returns `None` if merging overflows.
    pub fn new(coins: impl IntoIterator<Item = Coin>) -> Option<Self> {
        let mut list: Vec<Coin> = Vec::new();
        for coin in coins {
            match list.iter_mut().find(|c| c.denom == coin.denom) {
                Some(existing) => existing.amount = existing.amount.checked_add(coin.amount)?,
                None => list.push(coin),
            }
        }
        list.sort_by(|a, b| a.denom.cmp(&b.denom));
        Some(Self(list))
    }

    /// Amount of `denom`, or zero.
    pub fn amount_of(&self, denom: &str) -> i64 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Coin> {
        self.0
    }
}

/// One recipient and what they receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub to: AccAddress,
    pub coins: Coins,
}

impl Transfer {
    /// Transfer of a single denomination.
    pub fn single(to: AccAddress, denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            to,
            coins: Coins(vec![Coin::new(denom, amount.base_units())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_is_exact() {
        // 2671.72 * 1e8 in binary floating point truncates to 267171999999
        let amount = Amount::from_decimal_str("2671.72").unwrap();
        assert_eq!(amount.base_units(), 267_172_000_000);
        let amount = Amount::from_decimal_str("344.74").unwrap();
        assert_eq!(amount.base_units(), 34_474_000_000);
    }

    #[test]
    fn test_integer_and_long_fraction() {
        assert_eq!(
            Amount::from_decimal_str("1292").unwrap().base_units(),
            129_200_000_000
        );
        // Beyond eight places is truncated
        assert_eq!(
            Amount::from_decimal_str("1206.5900000000001")
                .unwrap()
                .base_units(),
            120_659_000_000
        );
        assert_eq!(
            Amount::from_decimal_str("0.123456789").unwrap().base_units(),
            12_345_678
        );
    }

    #[test]
    fn test_exponent_forms() {
        assert_eq!(Amount::from_decimal_str("1e-5").unwrap().base_units(), 1_000);
        assert_eq!(
            Amount::from_decimal_str("2.5E2").unwrap().base_units(),
            25_000_000_000
        );
    }

    #[test]
    fn test_rejects_non_positive_and_garbage() {
        assert_eq!(Amount::from_decimal_str("0"), Err(AmountError::NotPositive));
        assert_eq!(
            Amount::from_decimal_str("0.000000001"),
            Err(AmountError::NotPositive)
        );
        assert_eq!(Amount::from_decimal_str("-1"), Err(AmountError::NotPositive));
        assert!(matches!(
            Amount::from_decimal_str("12a"),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            Amount::from_decimal_str("."),
            Err(AmountError::Invalid(_))
        ));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            Amount::from_decimal_str("100000000000"),
            Err(AmountError::Overflow)
        );
        assert!(Amount::from_decimal_str("92233720368").is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_base_units(34_474_000_000).unwrap().to_string(), "344.74");
        assert_eq!(Amount::from_base_units(100_000_000).unwrap().to_string(), "1");
        assert_eq!(Amount::from_base_units(1).unwrap().to_string(), "0.00000001");
    }

    #[test]
    fn test_coins_normalize() {
        let coins = Coins::new([
            Coin::new("XYZ-1", 5),
            Coin::new("BNB", 1),
            Coin::new("XYZ-1", 7),
        ])
        .unwrap();
        assert_eq!(
            coins.as_slice(),
            &[Coin::new("BNB", 1), Coin::new("XYZ-1", 12)]
        );
        assert_eq!(coins.amount_of("XYZ-1"), 12);
        assert_eq!(coins.amount_of("NONE"), 0);
    }

    #[test]
    fn test_coins_overflow() {
        assert!(Coins::new([Coin::new("A", i64::MAX), Coin::new("A", 1)]).is_none());
    }
}
