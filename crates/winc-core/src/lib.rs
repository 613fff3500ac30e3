//! # winc-core
//!
//! Core domain models and rules for the winc credit ledger:
//! - Arbitrary-precision value types for winc and fiat payment amounts
//! - Account, quote, receipt, gift, reservation, and audit models
//! - Adjustment catalogs with promo-code eligibility and discount composition
//! - The chain-gateway seam used by the pending-transaction poller
//! - A clock seam so lifecycle rules stay testable at fixed instants

pub mod adjustments;
pub mod amount;
pub mod gateway;
pub mod models;
pub mod time;

pub use adjustments::*;
pub use amount::*;
pub use gateway::*;
pub use models::*;
pub use time::*;
