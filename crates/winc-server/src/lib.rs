//! # winc-server
//!
//! The HTTP adapter over the in-process ledger API, plus the server
//! binary. The facade proper (request signing, provider checkout
//! sessions, price oracles) stays outside this workspace; this adapter
//! binds health, balance, reserve/refund, gift redemption, and the Stripe
//! webhook.

pub mod gateway;
pub mod pricing;
pub mod rest;

pub use rest::{build_router, AppState};
