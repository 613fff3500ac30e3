//! Fiat payment amounts in a currency's minor unit.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::bigint::{self, AmountError, Rounding};

/// An arbitrary-precision signed fiat amount in the currency's minor unit
/// (e.g. cents for USD).
///
/// The currency code itself is carried separately and passed through
/// opaquely; this type only does the integer arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PaymentAmount(BigInt);

impl PaymentAmount {
    /// Zero.
    pub fn zero() -> Self {
        Self(BigInt::from(0))
    }

    /// Sum of this amount and `other`.
    pub fn plus(&self, other: &PaymentAmount) -> PaymentAmount {
        PaymentAmount(&self.0 + &other.0)
    }

    /// This amount minus `other`.
    pub fn minus(&self, other: &PaymentAmount) -> PaymentAmount {
        PaymentAmount(&self.0 - &other.0)
    }

    /// Multiply by a decimal, truncating the magnitude toward zero.
    pub fn times(&self, multiplier: Decimal) -> PaymentAmount {
        PaymentAmount(bigint::mul_decimal_trunc(&self.0, multiplier))
    }

    /// Divide by a decimal with the requested rounding direction.
    pub fn divided_by(
        &self,
        divisor: Decimal,
        rounding: Rounding,
    ) -> Result<PaymentAmount, AmountError> {
        Ok(PaymentAmount(bigint::div_decimal(&self.0, divisor, rounding)?))
    }

    /// A decimal magnitude truncated to an integer minor-unit amount.
    ///
    /// Used for `add`-operator adjustments whose magnitudes are configured
    /// as decimals.
    pub fn from_decimal_trunc(value: Decimal) -> PaymentAmount {
        PaymentAmount(bigint::decimal_to_integer_trunc(value))
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
    pub fn negated(&self) -> PaymentAmount {
        PaymentAmount(-&self.0)
    }

    /// The larger of two amounts.
    pub fn max(self, other: PaymentAmount) -> PaymentAmount {
        std::cmp::max(self, other)
    }

    /// Signed difference `left - right`.
    pub fn difference(left: &PaymentAmount, right: &PaymentAmount) -> PaymentAmount {
        left.minus(right)
    }
}

impl FromStr for PaymentAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PaymentAmount(bigint::parse_integer(s)?))
    }
}

impl From<u64> for PaymentAmount {
    fn from(value: u64) -> Self {
        PaymentAmount(BigInt::from(value))
    }
}

impl From<i64> for PaymentAmount {
    fn from(value: i64) -> Self {
        PaymentAmount(BigInt::from(value))
    }
}

impl fmt::Display for PaymentAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for PaymentAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PaymentAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(s: &str) -> PaymentAmount {
        s.parse().unwrap()
    }

    #[test]
    fn test_constructor_rejects_non_integers() {
        for input in ["10.00", "", "$5", "1_000", "+1"] {
            assert!(input.parse::<PaymentAmount>().is_err());
        }
    }

    #[test]
    fn test_discount_arithmetic() {
        // A 20% discount on 10 minor units: delta = 10 * (0.8 - 1) = -2.
        let gross = amount("10");
        let delta = gross.times(dec!(0.8) - dec!(1));
        assert_eq!(delta, amount("-2"));
        assert_eq!(gross.plus(&delta), amount("8"));
    }

    #[test]
    fn test_comparisons() {
        assert!(amount("10100") < amount("10731"));
        assert_eq!(amount("0"), PaymentAmount::zero());
        assert!(amount("-3").is_negative());
    }

    #[test]
    fn test_from_decimal_trunc() {
        assert_eq!(PaymentAmount::from_decimal_trunc(dec!(2.9)), amount("2"));
        assert_eq!(PaymentAmount::from_decimal_trunc(dec!(-2.9)), amount("-2"));
    }
}
