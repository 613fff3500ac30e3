//! # winc-store
//!
//! The PostgreSQL ledger store. This crate owns every write to ledger
//! state and enforces the transaction discipline the balances depend on:
//! - Every mutation runs inside `BEGIN … COMMIT` on the writer pool
//! - The user row is locked with `SELECT … FOR UPDATE` before any
//!   read-modify-write of a balance
//! - Exactly one audit row accompanies every balance change, in the same
//!   transaction
//! - Serialization failures retry at the transaction boundary; everything
//!   else surfaces as a typed error
//!
//! Reads inside a mutating transaction always see the writer connection;
//! standalone read-only lookups may use the reader pool.

mod audit;
mod catalogs;
mod crypto;
mod error;
mod gifts;
mod quotes;
mod reservations;
mod store;
mod users;

pub use catalogs::WincUsedQuery;
pub use crypto::NewCreditedTransactionParams;
pub use error::{StoreError, StoreResult};
pub use gifts::{GiftRedemption, RedeemGiftParams};
pub use quotes::{BypassedPaymentReceiptParams, CreateChargebackParams, CreatePaymentReceiptParams};
pub use reservations::ReserveBalanceParams;
pub use store::LedgerStore;
