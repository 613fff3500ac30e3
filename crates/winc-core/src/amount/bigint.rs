//! Shared big-integer parsing and decimal-operator arithmetic.
//!
//! The ledger multiplies integer amounts by decimal operator magnitudes
//! (subsidies, fees, promo discounts). Multiplication always truncates the
//! magnitude toward zero; division lets the caller pick the rounding
//! direction.

use num_bigint::{BigInt, Sign};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by amount construction and arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input is not a plain base-10 integer string.
    #[error("invalid integer amount: {0:?}")]
    InvalidAmount(String),

    /// Division by a zero decimal.
    #[error("division by zero")]
    DivisionByZero,
}

/// Rounding direction for division.
///
/// `Up` rounds away from zero, `Down` rounds toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// Round the magnitude away from zero (the ledger default).
    #[default]
    Up,
    /// Round the magnitude toward zero.
    Down,
}

/// Parse a base-10 integer string with an optional leading minus.
///
/// Decimal points, exponents, signs other than a single leading `-`,
/// whitespace, and empty input are all rejected.
pub(crate) fn parse_integer(input: &str) -> Result<BigInt, AmountError> {
    let digits = input.strip_prefix('-').unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::InvalidAmount(input.to_string()));
    }
    BigInt::parse_bytes(input.as_bytes(), 10)
        .ok_or_else(|| AmountError::InvalidAmount(input.to_string()))
}

/// Multiply an integer by a decimal, truncating the result toward zero.
pub(crate) fn mul_decimal_trunc(value: &BigInt, multiplier: Decimal) -> BigInt {
    let mantissa = BigInt::from(multiplier.mantissa());
    // BigInt division truncates toward zero, which is exactly the
    // round-down-in-magnitude the ledger requires.
    (value * mantissa) / pow_ten(multiplier.scale())
}

/// Divide an integer by a decimal with the requested rounding direction.
pub(crate) fn div_decimal(
    value: &BigInt,
    divisor: Decimal,
    rounding: Rounding,
) -> Result<BigInt, AmountError> {
    if divisor.is_zero() {
        return Err(AmountError::DivisionByZero);
    }
    let mantissa = BigInt::from(divisor.mantissa());
    let scaled = value * pow_ten(divisor.scale());
    let quotient = &scaled / &mantissa;
    let remainder = &scaled % &mantissa;
    if remainder.sign() == Sign::NoSign || rounding == Rounding::Down {
        return Ok(quotient);
    }
    // Step the magnitude away from zero. The true quotient's sign follows
    // the operand signs even when the truncated quotient is zero.
    let negative = (scaled.sign() == Sign::Minus) != (mantissa.sign() == Sign::Minus);
    Ok(if negative {
        quotient - BigInt::from(1)
    } else {
        quotient + BigInt::from(1)
    })
}

/// Truncate a decimal to an integer, toward zero.
pub(crate) fn decimal_to_integer_trunc(value: Decimal) -> BigInt {
    BigInt::from(value.mantissa()) / pow_ten(value.scale())
}

/// `10^exp` as a big integer.
fn pow_ten(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn test_parse_accepts_plain_integers() {
        assert_eq!(parse_integer("0").unwrap(), big(0));
        assert_eq!(parse_integer("1337").unwrap(), big(1337));
        assert_eq!(parse_integer("-42").unwrap(), big(-42));
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        for input in ["", "-", "1.5", "0.0", "1e3", "+5", " 7", "7 ", "abc", "0x10", "--1"] {
            assert!(
                parse_integer(input).is_err(),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_mul_truncates_toward_zero() {
        assert_eq!(mul_decimal_trunc(&big(10), dec!(0.8)), big(8));
        assert_eq!(mul_decimal_trunc(&big(7), dec!(0.5)), big(3));
        assert_eq!(mul_decimal_trunc(&big(-7), dec!(0.5)), big(-3));
        assert_eq!(mul_decimal_trunc(&big(7), dec!(-0.5)), big(-3));
    }

    #[test]
    fn test_div_rounds_up_away_from_zero() {
        assert_eq!(div_decimal(&big(7), dec!(2), Rounding::Up).unwrap(), big(4));
        assert_eq!(
            div_decimal(&big(-7), dec!(2), Rounding::Up).unwrap(),
            big(-4)
        );
        assert_eq!(
            div_decimal(&big(1), dec!(3), Rounding::Up).unwrap(),
            big(1)
        );
    }

    #[test]
    fn test_div_rounds_down_toward_zero() {
        assert_eq!(
            div_decimal(&big(7), dec!(2), Rounding::Down).unwrap(),
            big(3)
        );
        assert_eq!(
            div_decimal(&big(-7), dec!(2), Rounding::Down).unwrap(),
            big(-3)
        );
    }

    #[test]
    fn test_div_exact_ignores_rounding() {
        assert_eq!(div_decimal(&big(8), dec!(2), Rounding::Up).unwrap(), big(4));
        assert_eq!(
            div_decimal(&big(10), dec!(2.5), Rounding::Down).unwrap(),
            big(4)
        );
    }

    #[test]
    fn test_div_by_zero_errors() {
        assert_eq!(
            div_decimal(&big(1), dec!(0), Rounding::Up),
            Err(AmountError::DivisionByZero)
        );
    }

    #[test]
    fn test_decimal_truncation() {
        assert_eq!(decimal_to_integer_trunc(dec!(2.9)), big(2));
        assert_eq!(decimal_to_integer_trunc(dec!(-2.9)), big(-2));
        assert_eq!(decimal_to_integer_trunc(dec!(500)), big(500));
    }
}
