//! # winc-runtime
//!
//! Lifecycle services over the ledger store:
//! - [`TopUpService`]: quote composition and provider-event handling
//! - [`UploadService`]: subsidy composition, reservations, and refunds
//! - [`CryptoCreditService`]: chain-funded credits with exclusion rules
//! - [`PendingTxPoller`]: the periodic job advancing pending transactions

pub mod crypto;
pub mod poller;
pub mod topup;
pub mod uploads;

pub use crypto::*;
pub use poller::*;
pub use topup::*;
pub use uploads::*;
