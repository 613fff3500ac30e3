//! Applied adjustment records.
//!
//! An applied adjustment belongs to the reservation or quote whose creation
//! produced it and is never mutated afterward. `index` preserves the
//! left-to-right application order within one reservation or quote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::{PaymentAmount, Winc};

/// An adjustment applied to an upload reservation.
///
/// `winc_delta` records the amount removed from the network cost by this
/// step, so the deltas plus the reserved winc always telescope back to the
/// network winc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAdjustment {
    /// Adjustment identifier.
    pub id: String,
    /// The catalog that produced this adjustment.
    pub catalog_id: String,
    /// Application order within the reservation.
    pub index: i32,
    /// Winc removed from the network cost at this step.
    pub winc_delta: Winc,
    /// The account whose reservation this belongs to.
    pub user_address: String,
    /// The owning reservation.
    pub reservation_id: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// An adjustment applied to a fiat top-up or crypto credit.
///
/// Exclusive adjustments carry a non-zero `payment_delta` (the signed
/// change to the fiat charge); inclusive adjustments carry a non-zero
/// `winc_delta` (the signed change to the winc credited). Exactly one of
/// the two is non-zero per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAdjustment {
    /// Adjustment identifier.
    pub id: String,
    /// The catalog that produced this adjustment.
    pub catalog_id: String,
    /// Application order within the quote or transaction.
    pub index: i32,
    /// Signed change to the fiat charge, in minor units.
    pub payment_delta: PaymentAmount,
    /// Signed change to the winc credited.
    pub winc_delta: Winc,
    /// The destination the quote or transaction credits.
    pub user_address: String,
    /// The owning top-up quote, for fiat payments.
    pub top_up_quote_id: Option<String>,
    /// The owning chain transaction, for crypto payments.
    pub transaction_id: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}
