//! Chain-settled payment transactions.
//!
//! A transaction id lives in exactly one of three states: pending (no
//! balance change yet), credited (winc granted at an observed block
//! height), or failed. Transitions are driven by the pending-transaction
//! poller against the chain gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::{PaymentAmount, Winc};
use crate::models::user::UserAddressType;

/// A chain payment observed but not yet settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPaymentTransaction {
    /// Chain transaction id; primary key across all three states.
    pub transaction_id: String,
    /// Token the payment was made in.
    pub token_type: UserAddressType,
    /// Quantity paid, in the token's base unit.
    pub transaction_quantity: PaymentAmount,
    /// Winc to credit once the transaction confirms.
    pub winc_amount: Winc,
    /// Destination account address.
    pub dest_address: String,
    /// Address family of `dest_address`.
    pub dest_address_type: UserAddressType,
    /// Instant the pending row was created.
    pub created_at: DateTime<Utc>,
}

/// A chain payment that could not be settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPaymentTransaction {
    /// The original pending transaction, preserved field-for-field.
    #[serde(flatten)]
    pub transaction: PendingPaymentTransaction,
    /// Instant the failure was recorded.
    pub failed_at: DateTime<Utc>,
    /// Why the transaction failed.
    pub failed_reason: String,
}

/// A chain payment settled into winc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditedPaymentTransaction {
    /// The original pending transaction, preserved field-for-field.
    #[serde(flatten)]
    pub transaction: PendingPaymentTransaction,
    /// Block height at which the chain confirmed the transaction.
    pub block_height: i64,
    /// Instant the credit was granted.
    pub credited_at: DateTime<Utc>,
}

/// Any of the three lifecycle states, as returned by a by-id lookup.
///
/// Untagged: the variants with extra fields must be tried before the bare
/// pending shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentTransaction {
    /// Settled and credited.
    Credited(CreditedPaymentTransaction),
    /// Failed or timed out.
    Failed(FailedPaymentTransaction),
    /// Awaiting confirmation.
    Pending(PendingPaymentTransaction),
}

impl PaymentTransaction {
    /// The chain transaction id, regardless of state.
    pub fn transaction_id(&self) -> &str {
        match self {
            PaymentTransaction::Pending(tx) => &tx.transaction_id,
            PaymentTransaction::Credited(tx) => &tx.transaction.transaction_id,
            PaymentTransaction::Failed(tx) => &tx.transaction.transaction_id,
        }
    }
}
