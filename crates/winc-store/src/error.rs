//! Typed store errors.

use thiserror::Error;

use winc_core::{
    AmountError, PromoCodeError, UnknownAddressType, UnknownCatalogToken, UnknownChangeReason,
    Winc,
};

/// Errors surfaced by ledger store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required row is absent.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity family, e.g. `"top_up_quote"`.
        entity: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// A balance or promo query named an unknown user. Logged at warning
    /// level by callers, not error.
    #[error("user not found: {address}")]
    UserNotFound {
        /// The unknown address.
        address: String,
    },

    /// A reservation would take the balance negative.
    #[error(
        "insufficient balance for {user_address}: requested {requested}, available {available}"
    )]
    InsufficientBalance {
        /// The debited account.
        user_address: String,
        /// Winc the reservation needed.
        requested: Winc,
        /// Winc actually available.
        available: Winc,
    },

    /// The gift cannot be redeemed (unknown receipt, wrong email, or
    /// expired).
    #[error("gift redemption failed for receipt {receipt_id}: {reason}")]
    GiftRedemption {
        /// The funding receipt id.
        receipt_id: String,
        /// Why redemption failed.
        reason: String,
    },

    /// The gift was already claimed.
    #[error("gift already redeemed: {receipt_id}")]
    GiftAlreadyRedeemed {
        /// The funding receipt id.
        receipt_id: String,
    },

    /// A promo code was refused.
    #[error(transparent)]
    PromoCode(#[from] PromoCodeError),

    /// A crypto lifecycle transition named an unknown transaction.
    #[error("payment transaction not found: {transaction_id}")]
    PaymentTransactionNotFound {
        /// The unknown chain transaction id.
        transaction_id: String,
    },

    /// The provider settled less than quoted, or in the wrong currency.
    #[error("payment mismatch for quote {quote_id}: {reason}")]
    PaymentMismatch {
        /// The quote being settled.
        quote_id: String,
        /// What mismatched.
        reason: String,
    },

    /// The quote's expiry passed before the provider settled it.
    #[error("top-up quote expired: {quote_id}")]
    QuoteExpired {
        /// The expired quote id.
        quote_id: String,
    },

    /// An amount failed to parse or compute.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// A stored value could not be decoded back into its domain type.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    /// The database itself failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Machine-readable error kind, stable across messages.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::UserNotFound { .. } => "user_not_found",
            StoreError::InsufficientBalance { .. } => "insufficient_balance",
            StoreError::GiftRedemption { .. } => "gift_redemption_error",
            StoreError::GiftAlreadyRedeemed { .. } => "gift_already_redeemed",
            StoreError::PromoCode(PromoCodeError::NotFound { .. }) => "promo_code_not_found",
            StoreError::PromoCode(PromoCodeError::Expired { .. }) => "promo_code_expired",
            StoreError::PromoCode(PromoCodeError::ExceedsMaxUses { .. }) => {
                "promo_code_exceeds_max_uses"
            }
            StoreError::PromoCode(PromoCodeError::Ineligible { .. }) => {
                "user_ineligible_for_promo_code"
            }
            StoreError::PaymentTransactionNotFound { .. } => "payment_transaction_not_found",
            StoreError::PaymentMismatch { .. } => "payment_mismatch",
            StoreError::QuoteExpired { .. } => "quote_expired",
            StoreError::Amount(_) => "invalid_amount",
            StoreError::Corrupt(_) => "corrupt_data",
            StoreError::Database(_) => "database_error",
        }
    }

    /// Whether this is a PostgreSQL serialization failure worth retrying
    /// at the transaction boundary.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            StoreError::Database(err) => sqlx_serialization_failure(err),
            _ => false,
        }
    }
}

/// SQLSTATE 40001 (serialization_failure) and 40P01 (deadlock_detected).
pub(crate) fn sqlx_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

impl From<UnknownAddressType> for StoreError {
    fn from(err: UnknownAddressType) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

impl From<UnknownCatalogToken> for StoreError {
    fn from(err: UnknownCatalogToken) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

impl From<UnknownChangeReason> for StoreError {
    fn from(err: UnknownChangeReason) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
