//! Gifted credits awaiting or past redemption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Winc;

/// Days an issued gift stays redeemable.
pub const GIFT_EXPIRY_DAYS: i64 = 365;

/// Credits purchased for an email recipient, not yet claimed.
///
/// Keyed by the payment receipt that funded it. A pre-redemption
/// chargeback deletes the row outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnredeemedGift {
    /// The funding payment receipt id; primary key.
    pub receipt_id: String,
    /// Winc held for the recipient.
    pub winc_amount: Winc,
    /// Recipient email the redemption must match.
    pub recipient_email: String,
    /// Sender email, when the purchaser shared one.
    pub sender_email: Option<String>,
    /// Optional message shown to the recipient.
    pub gift_message: Option<String>,
    /// Issuance instant.
    pub created_at: DateTime<Utc>,
    /// Instant past which redemption is refused.
    pub expires_at: DateTime<Utc>,
}

impl UnredeemedGift {
    /// Whether the gift can no longer be redeemed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A gift that has been claimed into a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemedGift {
    /// The original gift, preserved field-for-field.
    #[serde(flatten)]
    pub gift: UnredeemedGift,
    /// Account the winc was credited to.
    pub dest_address: String,
    /// Redemption instant.
    pub redeemed_at: DateTime<Utc>,
}
