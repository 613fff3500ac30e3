//! The append-only audit log.
//!
//! Every balance-affecting operation writes exactly one audit row in the
//! same transaction. Credits are positive, debits negative, and pending
//! gift issuance zero; the per-user sum of deltas always equals the user's
//! balance.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Winc;

/// Why a balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditChangeReason {
    /// Upload reservation debit.
    Upload,
    /// Fiat top-up credit to an existing account.
    Payment,
    /// Chain-settled credit.
    CryptoPayment,
    /// Admin-path top-up credit to an existing account.
    BypassedPayment,
    /// Fiat top-up that created the account.
    AccountCreation,
    /// Admin-path top-up that created the account.
    BypassedAccountCreation,
    /// Provider dispute debit.
    Chargeback,
    /// Whole-reservation refund credit.
    Refund,
    /// Gift issued to an email recipient; no balance moves yet.
    GiftedPayment,
    /// Admin-path gift issuance.
    BypassedGiftedPayment,
    /// Gift redeemed into an existing account.
    GiftedPaymentRedemption,
    /// Gift redemption that created the account.
    GiftedAccountCreation,
}

impl AuditChangeReason {
    /// All reasons, in storage-string order.
    pub const ALL: [AuditChangeReason; 12] = [
        AuditChangeReason::Upload,
        AuditChangeReason::Payment,
        AuditChangeReason::CryptoPayment,
        AuditChangeReason::BypassedPayment,
        AuditChangeReason::AccountCreation,
        AuditChangeReason::BypassedAccountCreation,
        AuditChangeReason::Chargeback,
        AuditChangeReason::Refund,
        AuditChangeReason::GiftedPayment,
        AuditChangeReason::BypassedGiftedPayment,
        AuditChangeReason::GiftedPaymentRedemption,
        AuditChangeReason::GiftedAccountCreation,
    ];

    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditChangeReason::Upload => "upload",
            AuditChangeReason::Payment => "payment",
            AuditChangeReason::CryptoPayment => "crypto_payment",
            AuditChangeReason::BypassedPayment => "bypassed_payment",
            AuditChangeReason::AccountCreation => "account_creation",
            AuditChangeReason::BypassedAccountCreation => "bypassed_account_creation",
            AuditChangeReason::Chargeback => "chargeback",
            AuditChangeReason::Refund => "refund",
            AuditChangeReason::GiftedPayment => "gifted_payment",
            AuditChangeReason::BypassedGiftedPayment => "bypassed_gifted_payment",
            AuditChangeReason::GiftedPaymentRedemption => "gifted_payment_redemption",
            AuditChangeReason::GiftedAccountCreation => "gifted_account_creation",
        }
    }

    /// Whether this reason records a debit (negative delta).
    pub fn is_debit(&self) -> bool {
        matches!(
            self,
            AuditChangeReason::Upload | AuditChangeReason::Chargeback
        )
    }

    /// Whether this reason records no balance movement.
    pub fn is_zero_delta(&self) -> bool {
        matches!(
            self,
            AuditChangeReason::GiftedPayment | AuditChangeReason::BypassedGiftedPayment
        )
    }
}

impl fmt::Display for AuditChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditChangeReason {
    type Err = UnknownChangeReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditChangeReason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownChangeReason(s.to_string()))
    }
}

/// Error for an unrecognized change-reason string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audit change reason: {0:?}")]
pub struct UnknownChangeReason(pub String);

/// One append-only audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Monotonic identifier assigned by the store.
    pub audit_id: i64,
    /// The account whose balance the row describes.
    pub user_address: String,
    /// Signed balance delta.
    pub winc_delta: Winc,
    /// Why the balance changed.
    pub change_reason: AuditChangeReason,
    /// The receipt, reservation, or transaction that caused the change.
    pub change_id: Option<String>,
    /// Instant the row was written.
    pub audit_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_string_round_trip() {
        for reason in AuditChangeReason::ALL {
            assert_eq!(
                reason.as_str().parse::<AuditChangeReason>().unwrap(),
                reason
            );
        }
        assert!("bank_transfer".parse::<AuditChangeReason>().is_err());
    }

    #[test]
    fn test_sign_convention() {
        assert!(AuditChangeReason::Upload.is_debit());
        assert!(AuditChangeReason::Chargeback.is_debit());
        assert!(AuditChangeReason::GiftedPayment.is_zero_delta());
        assert!(!AuditChangeReason::Payment.is_debit());
        assert!(!AuditChangeReason::Refund.is_zero_delta());
    }
}
