//! # winc-config
//!
//! Configuration schema, environment parsing, and validation for the winc
//! credit ledger.

pub mod schema;
pub mod validation;

pub use schema::*;
pub use validation::*;
