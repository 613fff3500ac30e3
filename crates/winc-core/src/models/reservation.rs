//! Balance reservations for uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Winc;

/// A debit against a user's winc for a single upload.
///
/// `network_winc` is the pre-adjustment network cost; `reserved_winc` is
/// what was actually deducted after subsidies. Reservations are refunded
/// whole, never partially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReservation {
    /// Reservation identifier.
    pub reservation_id: String,
    /// The data item this reservation pays for.
    pub data_item_id: String,
    /// The debited account.
    pub user_address: String,
    /// Network cost before adjustments.
    pub network_winc: Winc,
    /// Amount deducted from the balance after adjustments.
    pub reserved_winc: Winc,
    /// Reservation instant.
    pub reserved_at: DateTime<Utc>,
}
