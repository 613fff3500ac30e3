//! The winc credit unit.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::bigint::{self, AmountError, Rounding};

/// An arbitrary-precision signed winc amount.
///
/// Winc is the ledger's internal credit unit. Balances and adjustment
/// deltas are signed; chargebacks may legitimately drive a balance
/// negative, so no clamping happens at this level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Winc(BigInt);

impl Winc {
    /// Zero winc.
    pub fn zero() -> Self {
        Self(BigInt::from(0))
    }

    /// Sum of this amount and `other`.
    pub fn plus(&self, other: &Winc) -> Winc {
        Winc(&self.0 + &other.0)
    }

    /// This amount minus `other`.
    pub fn minus(&self, other: &Winc) -> Winc {
        Winc(&self.0 - &other.0)
    }

    /// Multiply by a decimal, truncating the magnitude toward zero.
    pub fn times(&self, multiplier: Decimal) -> Winc {
        Winc(bigint::mul_decimal_trunc(&self.0, multiplier))
    }

    /// Divide by a decimal with the requested rounding direction.
    ///
    /// The ledger's conventional direction is [`Rounding::Up`], away from
    /// zero.
    pub fn divided_by(&self, divisor: Decimal, rounding: Rounding) -> Result<Winc, AmountError> {
        Ok(Winc(bigint::div_decimal(&self.0, divisor, rounding)?))
    }

    /// A decimal magnitude truncated to an integer winc amount.
    ///
    /// Used for `add`-operator adjustments whose magnitudes are configured
    /// as decimals.
    pub fn from_decimal_trunc(value: Decimal) -> Winc {
        Winc(bigint::decimal_to_integer_trunc(value))
    }

    /// Whether this amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0 == BigInt::from(0)
    }

    /// Whether this amount is a non-zero positive integer.
    pub fn is_positive(&self) -> bool {
        self.0 > BigInt::from(0)
    }

    /// Whether this amount is a non-zero negative integer.
    pub fn is_negative(&self) -> bool {
        self.0 < BigInt::from(0)
    }

    /// The additive inverse.
    pub fn negated(&self) -> Winc {
        Winc(-&self.0)
    }

    /// The larger of two amounts.
    pub fn max(self, other: Winc) -> Winc {
        std::cmp::max(self, other)
    }

    /// Signed difference `left - right`.
    pub fn difference(left: &Winc, right: &Winc) -> Winc {
        left.minus(right)
    }
}

impl FromStr for Winc {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Winc(bigint::parse_integer(s)?))
    }
}

impl From<u64> for Winc {
    fn from(value: u64) -> Self {
        Winc(BigInt::from(value))
    }
}

impl From<i64> for Winc {
    fn from(value: i64) -> Self {
        Winc(BigInt::from(value))
    }
}

impl From<u128> for Winc {
    fn from(value: u128) -> Self {
        Winc(BigInt::from(value))
    }
}

impl fmt::Display for Winc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Winc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Winc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn winc(s: &str) -> Winc {
        s.parse().unwrap()
    }

    #[test]
    fn test_constructor_rejects_non_integers() {
        for input in ["1.5", "", "five", "1e10", "+3", "0.000001"] {
            assert!(input.parse::<Winc>().is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(winc("100").plus(&winc("37")), winc("137"));
        assert_eq!(winc("100").minus(&winc("137")), winc("-37"));
        assert_eq!(winc("10").times(dec!(0.8)), winc("8"));
        assert_eq!(
            winc("10").divided_by(dec!(3), Rounding::Up).unwrap(),
            winc("4")
        );
        assert_eq!(
            winc("10").divided_by(dec!(3), Rounding::Down).unwrap(),
            winc("3")
        );
    }

    #[test]
    fn test_predicates() {
        assert!(winc("0").is_zero());
        assert!(winc("5").is_positive());
        assert!(!winc("0").is_positive());
        assert!(winc("-5").is_negative());
        assert!(!winc("-5").is_positive());
    }

    #[test]
    fn test_max_and_difference() {
        assert_eq!(winc("3").max(winc("9")), winc("9"));
        assert_eq!(Winc::difference(&winc("3"), &winc("9")), winc("-6"));
        assert_eq!(Winc::difference(&winc("9"), &winc("3")), winc("6"));
    }

    #[test]
    fn test_serde_decimal_string_form() {
        let w = winc("-123456789012345678901234567890");
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, "\"-123456789012345678901234567890\"");
        assert_eq!(serde_json::from_str::<Winc>(&json).unwrap(), w);
        assert!(serde_json::from_str::<Winc>("\"1.5\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_plus_minus_round_trip(a in any::<i128>(), b in any::<i128>()) {
            let w = winc(&a.to_string());
            let x = winc(&b.to_string());
            prop_assert_eq!(w.plus(&x).minus(&x), w);
        }

        #[test]
        fn prop_times_one_is_identity(a in any::<i128>()) {
            let w = winc(&a.to_string());
            prop_assert_eq!(w.times(dec!(1)), w.clone());
            prop_assert_eq!(w.times(dec!(-1)).times(dec!(-1)), w);
        }

        #[test]
        fn prop_display_parse_round_trip(a in any::<i128>()) {
            let w = winc(&a.to_string());
            prop_assert_eq!(w.to_string().parse::<Winc>().unwrap(), w);
        }
    }
}
