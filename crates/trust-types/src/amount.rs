use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of decimal places carried by an [`Amount`].
pub const DECIMALS: u32 = 8;

const SCALE: i64 = 10i64.pow(DECIMALS);

/// Signed fixed-point value with eight decimal places.
///
/// Stored as an integer count of 10⁻⁸ units. Rendering always carries an
/// explicit sign for non-zero values (`+50.00000000`, `-0.15000000`); the
/// sign is derived from the value and never stored separately.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Whole-number constructor; fails if the value does not fit.
    pub fn from_whole(whole: i64) -> Result<Self, TypeError> {
        whole
            .checked_mul(SCALE)
            .map(Self)
            .ok_or(TypeError::AmountOverflow)
    }

    pub const fn units(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Render without the leading `+` (the portal's balance readout).
    pub fn unsigned_string(self) -> String {
        let magnitude = self.0.unsigned_abs();
        let whole = magnitude / SCALE as u64;
        let frac = magnitude % SCALE as u64;
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}{whole}.{frac:08}")
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({self})")
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            f.write_str("+")?;
        }
        f.write_str(&self.unsigned_string())
    }
}

impl FromStr for Amount {
    type Err = TypeError;

    /// Accepts `50`, `+50.0`, `-0.15`, `0.00041822`; at most eight decimals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > DECIMALS as usize {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| TypeError::AmountOverflow)?
        };
        let frac_units: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<8}");
            padded.parse().map_err(|_| invalid())?
        };

        let units = whole_units
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or(TypeError::AmountOverflow)?;
        Ok(Self(if negative { -units } else { units }))
    }
}

impl TryFrom<String> for Amount {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_signed_decimals() {
        assert_eq!("+50.00000000".parse::<Amount>().unwrap(), Amount::from_units(5_000_000_000));
        assert_eq!("-0.15".parse::<Amount>().unwrap(), Amount::from_units(-15_000_000));
        assert_eq!("0.00041822".parse::<Amount>().unwrap(), Amount::from_units(41_822));
        assert_eq!("7".parse::<Amount>().unwrap(), Amount::from_whole(7).unwrap());
        assert_eq!(".5".parse::<Amount>().unwrap(), Amount::from_units(50_000_000));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "-", "abc", "1.2.3", "0.000000001", "1e5", "--1"] {
            assert!(bad.parse::<Amount>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(
            "999999999999999999".parse::<Amount>().unwrap_err(),
            TypeError::AmountOverflow
        );
    }

    #[test]
    fn display_carries_sign() {
        assert_eq!(Amount::from_units(5_000_000_000).to_string(), "+50.00000000");
        assert_eq!(Amount::from_units(-15_000_000).to_string(), "-0.15000000");
        assert_eq!(Amount::ZERO.to_string(), "0.00000000");
    }

    #[test]
    fn unsigned_string_drops_plus() {
        let balance = Amount::from_whole(1_798_306).unwrap();
        assert_eq!(balance.unsigned_string(), "1798306.00000000");
    }

    #[test]
    fn arithmetic_is_checked() {
        let a = Amount::from_units(i64::MAX);
        assert!(a.checked_add(Amount::from_units(1)).is_none());
        assert_eq!(-Amount::from_units(5), Amount::from_units(-5));
    }

    #[test]
    fn serde_uses_signed_string() {
        let json = serde_json::to_string(&Amount::from_units(-15_000_000)).unwrap();
        assert_eq!(json, "\"-0.15000000\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::from_units(-15_000_000));
    }

    proptest! {
        #[test]
        fn display_parses_back(units in (i64::MIN + 1)..=i64::MAX) {
            let amount = Amount::from_units(units);
            let parsed: Amount = amount.to_string().parse().unwrap();
            prop_assert_eq!(parsed, amount);
        }
    }
}
