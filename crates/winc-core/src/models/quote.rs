//! Top-up quotes and their receipt lifecycle.
//!
//! A quote moves through exactly one of three terminal forms: a payment
//! receipt on provider success, a failed quote on provider failure, or
//! passive expiry (refused at receipt time, no sweeper). A receipt can
//! later become a chargeback receipt on a provider dispute. Each terminal
//! form embeds the snapshot of the stage it came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::{PaymentAmount, Winc};
use crate::models::user::DestinationAddressType;

/// A priced, expiring offer to buy winc with fiat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUpQuote {
    /// Quote identifier; primary key.
    pub quote_id: String,
    /// Destination address, or recipient email for gifted quotes.
    pub dest_address: String,
    /// Destination family, including the email gift case.
    pub dest_address_type: DestinationAddressType,
    /// What the payment provider will charge, after exclusive adjustments.
    pub payment_amount: PaymentAmount,
    /// The gross amount before exclusive adjustments were applied.
    pub quoted_payment_amount: PaymentAmount,
    /// ISO currency code, passed through opaquely.
    pub currency: String,
    /// Winc credited on success, after inclusive adjustments.
    pub winc_amount: Winc,
    /// The payment provider expected to settle this quote.
    pub provider: String,
    /// Instant at which the quote stops being honorable.
    pub expires_at: DateTime<Utc>,
    /// Quote creation instant. Invariant: `expires_at > created_at`.
    pub created_at: DateTime<Utc>,
    /// Optional message carried on gifted quotes.
    pub gift_message: Option<String>,
}

impl TopUpQuote {
    /// Whether the quote can no longer be honored at `now`.
    ///
    /// A payment landing exactly at `expires_at` is refused.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The materialization of a successful top-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The consumed quote, preserved field-for-field.
    #[serde(flatten)]
    pub quote: TopUpQuote,
    /// Receipt identifier.
    pub receipt_id: String,
    /// Instant the provider reported success.
    pub receipt_date: DateTime<Utc>,
}

/// The materialization of a provider-disputed payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargebackReceipt {
    /// The disputed receipt, preserved field-for-field.
    #[serde(flatten)]
    pub receipt: PaymentReceipt,
    /// Provider-supplied dispute identifier.
    pub chargeback_id: String,
    /// Provider-supplied dispute reason.
    pub chargeback_reason: String,
    /// Instant the dispute was recorded.
    pub chargeback_date: DateTime<Utc>,
}

/// A quote the provider reported as failed or canceled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTopUpQuote {
    /// The failed quote, preserved field-for-field.
    #[serde(flatten)]
    pub quote: TopUpQuote,
    /// Why the provider failed the payment.
    pub failed_reason: String,
    /// Instant the failure was recorded.
    pub failed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote(expires_at: DateTime<Utc>) -> TopUpQuote {
        TopUpQuote {
            quote_id: "q-1".to_string(),
            dest_address: "addr".to_string(),
            dest_address_type: DestinationAddressType::Arweave,
            payment_amount: PaymentAmount::from(100u64),
            quoted_payment_amount: PaymentAmount::from(100u64),
            currency: "usd".to_string(),
            winc_amount: Winc::from(500u64),
            provider: "stripe".to_string(),
            expires_at,
            created_at: expires_at - chrono::Duration::hours(1),
            gift_message: None,
        }
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let expires = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let q = quote(expires);

        assert!(!q.is_expired(expires - chrono::Duration::milliseconds(1)));
        assert!(q.is_expired(expires));
        assert!(q.is_expired(expires + chrono::Duration::milliseconds(1)));
    }
}
