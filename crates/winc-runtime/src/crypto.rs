//! Chain-funded credits: pending submissions and observed confirmations.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use winc_core::{
    compose_payment_adjustments, Clock, CreditedPaymentTransaction, PaymentAmount,
    PendingPaymentTransaction, UserAddressType, Winc,
};
use winc_store::{LedgerStore, NewCreditedTransactionParams, StoreError};

/// Errors from the crypto-funding flows.
#[derive(Error, Debug)]
pub enum CryptoFundingError {
    /// The destination is on the exclusion list.
    #[error("address {0} is excluded from crypto funding")]
    ExcludedAddress(String),

    /// The store refused the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A chain payment observed by the facade.
#[derive(Debug, Clone)]
pub struct ChainFundingRequest {
    /// Chain transaction id.
    pub transaction_id: String,
    /// Token the payment was made in.
    pub token_type: UserAddressType,
    /// Quantity paid, in the token's base unit.
    pub transaction_quantity: PaymentAmount,
    /// Winc the quantity converts to, before inclusive adjustments.
    pub gross_winc: Winc,
    /// Destination account.
    pub dest_address: String,
    /// Address family of `dest_address`.
    pub dest_address_type: UserAddressType,
}

/// Chain-funded credit flows.
pub struct CryptoCreditService {
    store: Arc<LedgerStore>,
    clock: Arc<dyn Clock>,
    excluded_addresses: HashSet<String>,
}

impl CryptoCreditService {
    /// Build the service with the configured exclusion list.
    pub fn new(
        store: Arc<LedgerStore>,
        clock: Arc<dyn Clock>,
        excluded_addresses: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            clock,
            excluded_addresses: excluded_addresses.into_iter().collect(),
        }
    }

    /// Record a not-yet-confirmed chain payment.
    ///
    /// Inclusive payment adjustments apply to the winc that will be
    /// credited; no balance changes until the poller confirms the
    /// transaction.
    pub async fn submit_pending(
        &self,
        request: &ChainFundingRequest,
    ) -> Result<PendingPaymentTransaction, CryptoFundingError> {
        let (pending, adjustments) = self.build_transaction(request).await?;
        self.store
            .create_pending_transaction(&pending, &adjustments)
            .await?;

        info!(
            transaction_id = pending.transaction_id.as_str(),
            winc = %pending.winc_amount,
            "pending chain payment recorded"
        );
        Ok(pending)
    }

    /// Record a chain payment first observed as already confirmed.
    pub async fn observe_confirmed(
        &self,
        request: &ChainFundingRequest,
        block_height: i64,
    ) -> Result<CreditedPaymentTransaction, CryptoFundingError> {
        let (transaction, adjustments) = self.build_transaction(request).await?;
        let credited = self
            .store
            .create_new_credited_transaction(&NewCreditedTransactionParams {
                transaction,
                block_height,
                adjustments,
            })
            .await?;
        Ok(credited)
    }

    async fn build_transaction(
        &self,
        request: &ChainFundingRequest,
    ) -> Result<
        (
            PendingPaymentTransaction,
            Vec<winc_core::AppliedPaymentAdjustment>,
        ),
        CryptoFundingError,
    > {
        if self.excluded_addresses.contains(&request.dest_address) {
            return Err(CryptoFundingError::ExcludedAddress(
                request.dest_address.clone(),
            ));
        }

        let inclusive = self.store.get_payment_adjustment_catalogs().await?;
        let plan = compose_payment_adjustments(
            &PaymentAmount::zero(),
            &request.gross_winc,
            &[],
            &inclusive,
            request.dest_address_type.into(),
        );

        let pending = PendingPaymentTransaction {
            transaction_id: request.transaction_id.clone(),
            token_type: request.token_type,
            transaction_quantity: request.transaction_quantity.clone(),
            winc_amount: plan.winc_amount,
            dest_address: request.dest_address.clone(),
            dest_address_type: request.dest_address_type,
            created_at: self.clock.now(),
        };
        Ok((pending, plan.adjustments))
    }
}
