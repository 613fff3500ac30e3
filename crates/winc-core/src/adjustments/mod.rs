//! The adjustment engine.
//!
//! Composition turns an ordered set of active catalogs into applied
//! adjustment rows and a final charged/credited amount; eligibility decides
//! whether a user may redeem a single-use code. Both are pure: the store
//! gathers usage facts inside its read transactions and the engine only
//! does arithmetic and rule checks on them.

pub mod composition;
pub mod eligibility;

pub use composition::*;
pub use eligibility::*;
