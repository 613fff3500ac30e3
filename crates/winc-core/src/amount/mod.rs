//! Arbitrary-precision monetary value types.
//!
//! Balances, credits, and fiat amounts never pass through floating point.
//! Both [`Winc`] and [`PaymentAmount`] wrap a signed big integer and
//! serialize as plain decimal strings.

mod bigint;
mod payment;
mod winc;

pub use bigint::{AmountError, Rounding};
pub use payment::PaymentAmount;
pub use winc::Winc;
