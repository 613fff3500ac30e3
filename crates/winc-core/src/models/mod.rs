//! Domain models for the credit ledger.
//!
//! One module per entity family: users, top-up quotes and their receipt
//! lifecycle, gifts, balance reservations, adjustments and their catalogs,
//! the audit log, and chain-settled payment transactions.

pub mod adjustment;
pub mod audit;
pub mod catalog;
pub mod crypto;
pub mod gift;
pub mod quote;
pub mod reservation;
pub mod user;

pub use adjustment::*;
pub use audit::*;
pub use catalog::*;
pub use crypto::*;
pub use gift::*;
pub use quote::*;
pub use reservation::*;
pub use user::*;
