//! Chain-settled payment transactions: pending, credited, failed.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::info;

use winc_core::{
    AppliedPaymentAdjustment, AuditChangeReason, CreditedPaymentTransaction,
    FailedPaymentTransaction, PaymentTransaction, PendingPaymentTransaction,
};

use crate::catalogs::{insert_payment_adjustments_tx, AdjustmentOwner};
use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PgTx, TxOutcome};
use crate::users::CreditReasons;

/// Database shape shared by the three transaction tables.
#[derive(Debug, Clone, FromRow)]
struct PendingTxRow {
    transaction_id: String,
    token_type: String,
    transaction_quantity: String,
    winc_amount: String,
    dest_address: String,
    dest_address_type: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PendingTxRow> for PendingPaymentTransaction {
    type Error = StoreError;

    fn try_from(row: PendingTxRow) -> Result<PendingPaymentTransaction, StoreError> {
        Ok(PendingPaymentTransaction {
            transaction_id: row.transaction_id,
            token_type: row.token_type.parse()?,
            transaction_quantity: row.transaction_quantity.parse()?,
            winc_amount: row.winc_amount.parse()?,
            dest_address: row.dest_address,
            dest_address_type: row.dest_address_type.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct FailedTxRow {
    transaction_id: String,
    token_type: String,
    transaction_quantity: String,
    winc_amount: String,
    dest_address: String,
    dest_address_type: String,
    created_at: DateTime<Utc>,
    failed_at: DateTime<Utc>,
    failed_reason: String,
}

impl TryFrom<FailedTxRow> for FailedPaymentTransaction {
    type Error = StoreError;

    fn try_from(row: FailedTxRow) -> Result<FailedPaymentTransaction, StoreError> {
        Ok(FailedPaymentTransaction {
            failed_at: row.failed_at,
            failed_reason: row.failed_reason,
            transaction: PendingTxRow {
                transaction_id: row.transaction_id,
                token_type: row.token_type,
                transaction_quantity: row.transaction_quantity,
                winc_amount: row.winc_amount,
                dest_address: row.dest_address,
                dest_address_type: row.dest_address_type,
                created_at: row.created_at,
            }
            .try_into()?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct CreditedTxRow {
    transaction_id: String,
    token_type: String,
    transaction_quantity: String,
    winc_amount: String,
    dest_address: String,
    dest_address_type: String,
    created_at: DateTime<Utc>,
    block_height: i64,
    credited_at: DateTime<Utc>,
}

impl TryFrom<CreditedTxRow> for CreditedPaymentTransaction {
    type Error = StoreError;

    fn try_from(row: CreditedTxRow) -> Result<CreditedPaymentTransaction, StoreError> {
        Ok(CreditedPaymentTransaction {
            block_height: row.block_height,
            credited_at: row.credited_at,
            transaction: PendingTxRow {
                transaction_id: row.transaction_id,
                token_type: row.token_type,
                transaction_quantity: row.transaction_quantity,
                winc_amount: row.winc_amount,
                dest_address: row.dest_address,
                dest_address_type: row.dest_address_type,
                created_at: row.created_at,
            }
            .try_into()?,
        })
    }
}

/// A confirmed transaction observed with no prior pending row.
#[derive(Debug, Clone)]
pub struct NewCreditedTransactionParams {
    /// The observed transaction.
    pub transaction: PendingPaymentTransaction,
    /// Height of the confirming block.
    pub block_height: i64,
    /// Inclusive adjustments applied to the credited winc.
    pub adjustments: Vec<AppliedPaymentAdjustment>,
}

impl LedgerStore {
    /// Record a chain payment awaiting confirmation; no balance change.
    pub async fn create_pending_transaction(
        &self,
        transaction: &PendingPaymentTransaction,
        adjustments: &[AppliedPaymentAdjustment],
    ) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self
                .create_pending_transaction_tx(&mut tx, transaction, adjustments)
                .await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(()) => return Ok(()),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn create_pending_transaction_tx(
        &self,
        tx: &mut PgTx,
        transaction: &PendingPaymentTransaction,
        adjustments: &[AppliedPaymentAdjustment],
    ) -> StoreResult<()> {
        insert_pending_tx(tx, transaction).await?;
        insert_payment_adjustments_tx(
            tx,
            AdjustmentOwner::Transaction(&transaction.transaction_id),
            &transaction.dest_address,
            adjustments,
            self.now(),
        )
        .await
    }

    /// Settle a pending transaction at its confirmed block height.
    ///
    /// Moves the row pending → credited and credits the destination user
    /// in the same transaction. Re-crediting an already settled
    /// transaction fails with `PaymentTransactionNotFound`; callers that
    /// poll treat that as already-done.
    pub async fn credit_pending_transaction(
        &self,
        transaction_id: &str,
        block_height: i64,
    ) -> StoreResult<CreditedPaymentTransaction> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self
                .credit_pending_transaction_tx(&mut tx, transaction_id, block_height)
                .await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(credited) => return Ok(credited),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn credit_pending_transaction_tx(
        &self,
        tx: &mut PgTx,
        transaction_id: &str,
        block_height: i64,
    ) -> StoreResult<CreditedPaymentTransaction> {
        let now = self.now();
        let pending = lock_pending_tx(tx, transaction_id)
            .await?
            .ok_or_else(|| StoreError::PaymentTransactionNotFound {
                transaction_id: transaction_id.to_string(),
            })?;
        let pending: PendingPaymentTransaction = pending.try_into()?;

        delete_pending_tx(tx, transaction_id).await?;
        sqlx::query(
            r#"
            INSERT INTO credited_payment_transaction (
                transaction_id, token_type, transaction_quantity, winc_amount,
                dest_address, dest_address_type, created_at, block_height,
                credited_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&pending.transaction_id)
        .bind(pending.token_type.as_str())
        .bind(pending.transaction_quantity.to_string())
        .bind(pending.winc_amount.to_string())
        .bind(&pending.dest_address)
        .bind(pending.dest_address_type.as_str())
        .bind(pending.created_at)
        .bind(block_height)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        self.credit_or_create_user_tx(
            tx,
            &pending.dest_address,
            pending.dest_address_type,
            &pending.winc_amount,
            CreditReasons {
                created: AuditChangeReason::CryptoPayment,
                credited: AuditChangeReason::CryptoPayment,
            },
            Some(transaction_id),
        )
        .await?;

        info!(
            transaction_id,
            block_height,
            winc = %pending.winc_amount,
            "pending transaction credited"
        );
        Ok(CreditedPaymentTransaction {
            transaction: pending,
            block_height,
            credited_at: now,
        })
    }

    /// Mark a pending transaction failed; no balance change.
    pub async fn fail_pending_transaction(
        &self,
        transaction_id: &str,
        reason: &str,
    ) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self
                .fail_pending_transaction_tx(&mut tx, transaction_id, reason)
                .await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(()) => return Ok(()),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn fail_pending_transaction_tx(
        &self,
        tx: &mut PgTx,
        transaction_id: &str,
        reason: &str,
    ) -> StoreResult<()> {
        let now = self.now();
        let pending = lock_pending_tx(tx, transaction_id).await?.ok_or_else(|| {
            StoreError::PaymentTransactionNotFound {
                transaction_id: transaction_id.to_string(),
            }
        })?;

        delete_pending_tx(tx, transaction_id).await?;
        sqlx::query(
            r#"
            INSERT INTO failed_payment_transaction (
                transaction_id, token_type, transaction_quantity,
                winc_amount, dest_address, dest_address_type,
                created_at, failed_at, failed_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&pending.transaction_id)
        .bind(&pending.token_type)
        .bind(&pending.transaction_quantity)
        .bind(&pending.winc_amount)
        .bind(&pending.dest_address)
        .bind(&pending.dest_address_type)
        .bind(pending.created_at)
        .bind(now)
        .bind(reason)
        .execute(&mut **tx)
        .await?;

        info!(transaction_id, reason, "pending transaction failed");
        Ok(())
    }

    /// Locate a transaction id across the three lifecycle tables.
    pub async fn check_for_pending_transaction(
        &self,
        transaction_id: &str,
    ) -> StoreResult<Option<PaymentTransaction>> {
        let pending = sqlx::query_as::<_, PendingTxRow>(
            "SELECT * FROM pending_payment_transaction WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.reader)
        .await?;
        if let Some(row) = pending {
            return Ok(Some(PaymentTransaction::Pending(row.try_into()?)));
        }

        let credited = sqlx::query_as::<_, CreditedTxRow>(
            "SELECT * FROM credited_payment_transaction WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.reader)
        .await?;
        if let Some(row) = credited {
            return Ok(Some(PaymentTransaction::Credited(row.try_into()?)));
        }

        let failed = sqlx::query_as::<_, FailedTxRow>(
            "SELECT * FROM failed_payment_transaction WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.reader)
        .await?;
        if let Some(row) = failed {
            return Ok(Some(PaymentTransaction::Failed(row.try_into()?)));
        }

        Ok(None)
    }

    /// Record a transaction first observed as already confirmed: insert it
    /// credited and grant the winc in one transaction.
    pub async fn create_new_credited_transaction(
        &self,
        params: &NewCreditedTransactionParams,
    ) -> StoreResult<CreditedPaymentTransaction> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.create_new_credited_transaction_tx(&mut tx, params).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(credited) => return Ok(credited),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn create_new_credited_transaction_tx(
        &self,
        tx: &mut PgTx,
        params: &NewCreditedTransactionParams,
    ) -> StoreResult<CreditedPaymentTransaction> {
        let now = self.now();
        let transaction = &params.transaction;
        sqlx::query(
            r#"
            INSERT INTO credited_payment_transaction (
                transaction_id, token_type, transaction_quantity,
                winc_amount, dest_address, dest_address_type,
                created_at, block_height, credited_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&transaction.transaction_id)
        .bind(transaction.token_type.as_str())
        .bind(transaction.transaction_quantity.to_string())
        .bind(transaction.winc_amount.to_string())
        .bind(&transaction.dest_address)
        .bind(transaction.dest_address_type.as_str())
        .bind(transaction.created_at)
        .bind(params.block_height)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        insert_payment_adjustments_tx(
            tx,
            AdjustmentOwner::Transaction(&transaction.transaction_id),
            &transaction.dest_address,
            &params.adjustments,
            now,
        )
        .await?;

        self.credit_or_create_user_tx(
            tx,
            &transaction.dest_address,
            transaction.dest_address_type,
            &transaction.winc_amount,
            CreditReasons {
                created: AuditChangeReason::CryptoPayment,
                credited: AuditChangeReason::CryptoPayment,
            },
            Some(&transaction.transaction_id),
        )
        .await?;

        Ok(CreditedPaymentTransaction {
            transaction: transaction.clone(),
            block_height: params.block_height,
            credited_at: now,
        })
    }

    /// All transactions still awaiting confirmation, oldest first.
    pub async fn get_pending_transactions(
        &self,
    ) -> StoreResult<Vec<PendingPaymentTransaction>> {
        let rows = sqlx::query_as::<_, PendingTxRow>(
            "SELECT * FROM pending_payment_transaction ORDER BY created_at",
        )
        .fetch_all(&self.reader)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Lock a pending row for the remainder of the transaction.
async fn lock_pending_tx(
    tx: &mut PgTx,
    transaction_id: &str,
) -> StoreResult<Option<PendingTxRow>> {
    let row = sqlx::query_as::<_, PendingTxRow>(
        "SELECT * FROM pending_payment_transaction WHERE transaction_id = $1 FOR UPDATE",
    )
    .bind(transaction_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

async fn delete_pending_tx(tx: &mut PgTx, transaction_id: &str) -> StoreResult<()> {
    sqlx::query("DELETE FROM pending_payment_transaction WHERE transaction_id = $1")
        .bind(transaction_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_pending_tx(
    tx: &mut PgTx,
    transaction: &PendingPaymentTransaction,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO pending_payment_transaction (
            transaction_id, token_type, transaction_quantity, winc_amount,
            dest_address, dest_address_type, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&transaction.transaction_id)
    .bind(transaction.token_type.as_str())
    .bind(transaction.transaction_quantity.to_string())
    .bind(transaction.winc_amount.to_string())
    .bind(&transaction.dest_address)
    .bind(transaction.dest_address_type.as_str())
    .bind(transaction.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
