//! Top-up quotes and the receipt / chargeback / failed-quote lifecycle.
//!
//! A quote id lives in at most one of the four tables at any instant; the
//! delete-and-insert that moves it between them always happens in one
//! transaction with the balance change it implies.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use winc_core::{
    AppliedPaymentAdjustment, AuditChangeReason, ChargebackReceipt, DestinationAddressType,
    PaymentAmount, PaymentReceipt, TopUpQuote, UnredeemedGift, Winc,
};

use crate::audit::append_audit_tx;
use crate::catalogs::{insert_payment_adjustments_tx, AdjustmentOwner};
use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PgTx, TxOutcome};
use crate::users::CreditReasons;

/// Database shape shared by all four quote-lifecycle tables.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuoteRow {
    pub top_up_quote_id: String,
    pub dest_address: String,
    pub dest_address_type: String,
    pub payment_amount: String,
    pub quoted_payment_amount: String,
    pub currency: String,
    pub winc_amount: String,
    pub provider: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub gift_message: Option<String>,
}

impl TryFrom<QuoteRow> for TopUpQuote {
    type Error = StoreError;

    fn try_from(row: QuoteRow) -> Result<TopUpQuote, StoreError> {
        Ok(TopUpQuote {
            quote_id: row.top_up_quote_id,
            dest_address: row.dest_address,
            dest_address_type: row.dest_address_type.parse()?,
            payment_amount: row.payment_amount.parse()?,
            quoted_payment_amount: row.quoted_payment_amount.parse()?,
            currency: row.currency,
            winc_amount: row.winc_amount.parse()?,
            provider: row.provider,
            expires_at: row.expires_at,
            created_at: row.created_at,
            gift_message: row.gift_message,
        })
    }
}

/// Database shape of payment_receipt.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReceiptRow {
    pub receipt_id: String,
    pub top_up_quote_id: String,
    pub dest_address: String,
    pub dest_address_type: String,
    pub payment_amount: String,
    pub quoted_payment_amount: String,
    pub currency: String,
    pub winc_amount: String,
    pub provider: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub gift_message: Option<String>,
    pub receipt_date: DateTime<Utc>,
}

impl TryFrom<ReceiptRow> for PaymentReceipt {
    type Error = StoreError;

    fn try_from(row: ReceiptRow) -> Result<PaymentReceipt, StoreError> {
        Ok(PaymentReceipt {
            receipt_id: row.receipt_id.clone(),
            receipt_date: row.receipt_date,
            quote: TopUpQuote {
                quote_id: row.top_up_quote_id,
                dest_address: row.dest_address,
                dest_address_type: row.dest_address_type.parse()?,
                payment_amount: row.payment_amount.parse()?,
                quoted_payment_amount: row.quoted_payment_amount.parse()?,
                currency: row.currency,
                winc_amount: row.winc_amount.parse()?,
                provider: row.provider,
                expires_at: row.expires_at,
                created_at: row.created_at,
                gift_message: row.gift_message,
            },
        })
    }
}

/// Database shape of chargeback_receipt.
#[derive(Debug, Clone, FromRow)]
struct ChargebackRow {
    chargeback_id: String,
    receipt_id: String,
    top_up_quote_id: String,
    dest_address: String,
    dest_address_type: String,
    payment_amount: String,
    quoted_payment_amount: String,
    currency: String,
    winc_amount: String,
    provider: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    gift_message: Option<String>,
    receipt_date: DateTime<Utc>,
    chargeback_reason: String,
    chargeback_date: DateTime<Utc>,
}

impl TryFrom<ChargebackRow> for ChargebackReceipt {
    type Error = StoreError;

    fn try_from(row: ChargebackRow) -> Result<ChargebackReceipt, StoreError> {
        Ok(ChargebackReceipt {
            chargeback_id: row.chargeback_id,
            chargeback_reason: row.chargeback_reason,
            chargeback_date: row.chargeback_date,
            receipt: ReceiptRow {
                receipt_id: row.receipt_id,
                top_up_quote_id: row.top_up_quote_id,
                dest_address: row.dest_address,
                dest_address_type: row.dest_address_type,
                payment_amount: row.payment_amount,
                quoted_payment_amount: row.quoted_payment_amount,
                currency: row.currency,
                winc_amount: row.winc_amount,
                provider: row.provider,
                expires_at: row.expires_at,
                created_at: row.created_at,
                gift_message: row.gift_message,
                receipt_date: row.receipt_date,
            }
            .try_into()?,
        })
    }
}

/// Settlement reported by the payment provider.
#[derive(Debug, Clone)]
pub struct CreatePaymentReceiptParams {
    /// The quote being settled.
    pub top_up_quote_id: String,
    /// Provider-supplied receipt identifier.
    pub receipt_id: String,
    /// What the provider actually charged.
    pub payment_amount: PaymentAmount,
    /// Currency the provider charged in.
    pub currency: String,
    /// Sender email carried on gifted payments.
    pub sender_email: Option<String>,
}

/// One admin-path receipt with no backing quote.
#[derive(Debug, Clone)]
pub struct BypassedPaymentReceiptParams {
    /// Destination address or recipient email.
    pub dest_address: String,
    /// Destination family.
    pub dest_address_type: DestinationAddressType,
    /// Fiat amount recorded on the receipt.
    pub payment_amount: PaymentAmount,
    /// Currency recorded on the receipt.
    pub currency: String,
    /// Winc credited.
    pub winc_amount: Winc,
    /// Optional gift message for email destinations.
    pub gift_message: Option<String>,
    /// Optional sender email for email destinations.
    pub sender_email: Option<String>,
}

/// A provider dispute.
#[derive(Debug, Clone)]
pub struct CreateChargebackParams {
    /// The quote whose receipt is disputed.
    pub top_up_quote_id: String,
    /// Provider-supplied dispute identifier.
    pub chargeback_id: String,
    /// Provider-supplied dispute reason.
    pub reason: String,
}

impl LedgerStore {
    /// Insert a quote and its ordered payment adjustments in one
    /// transaction.
    pub async fn create_top_up_quote(
        &self,
        quote: &TopUpQuote,
        adjustments: &[AppliedPaymentAdjustment],
    ) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.create_top_up_quote_tx(&mut tx, quote, adjustments).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(()) => return Ok(()),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn create_top_up_quote_tx(
        &self,
        tx: &mut PgTx,
        quote: &TopUpQuote,
        adjustments: &[AppliedPaymentAdjustment],
    ) -> StoreResult<()> {
        insert_quote_tx(tx, quote).await?;
        insert_payment_adjustments_tx(
            tx,
            AdjustmentOwner::Quote(&quote.quote_id),
            &quote.dest_address,
            adjustments,
            self.now(),
        )
        .await
    }

    /// Fetch a quote that has not yet settled, failed, or been swept.
    pub async fn get_top_up_quote(&self, quote_id: &str) -> StoreResult<TopUpQuote> {
        let row = sqlx::query_as::<_, QuoteRow>(
            "SELECT * FROM top_up_quote WHERE top_up_quote_id = $1",
        )
        .bind(quote_id)
        .fetch_optional(&self.reader)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "top_up_quote",
            id: quote_id.to_string(),
        })?;
        row.try_into()
    }

    /// Fetch a payment receipt by its id.
    pub async fn get_payment_receipt(&self, receipt_id: &str) -> StoreResult<PaymentReceipt> {
        let row = sqlx::query_as::<_, ReceiptRow>(
            "SELECT * FROM payment_receipt WHERE receipt_id = $1",
        )
        .bind(receipt_id)
        .fetch_optional(&self.reader)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "payment_receipt",
            id: receipt_id.to_string(),
        })?;
        row.try_into()
    }

    /// Fetch a chargeback receipt by its id.
    pub async fn get_chargeback_receipt(
        &self,
        chargeback_id: &str,
    ) -> StoreResult<ChargebackReceipt> {
        let row = sqlx::query_as::<_, ChargebackRow>(
            "SELECT * FROM chargeback_receipt WHERE chargeback_id = $1",
        )
        .bind(chargeback_id)
        .fetch_optional(&self.reader)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "chargeback_receipt",
            id: chargeback_id.to_string(),
        })?;
        row.try_into()
    }

    /// Move a quote to the failed table on a provider-reported failure.
    pub async fn fail_top_up_quote(&self, quote_id: &str, reason: &str) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.fail_top_up_quote_tx(&mut tx, quote_id, reason).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(()) => return Ok(()),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn fail_top_up_quote_tx(
        &self,
        tx: &mut PgTx,
        quote_id: &str,
        reason: &str,
    ) -> StoreResult<()> {
        let quote = lock_quote_tx(tx, quote_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "top_up_quote",
                id: quote_id.to_string(),
            })?;

        delete_quote_tx(tx, quote_id).await?;
        sqlx::query(
            r#"
            INSERT INTO failed_top_up_quote (
                top_up_quote_id, dest_address, dest_address_type,
                payment_amount, quoted_payment_amount, currency,
                winc_amount, provider, expires_at, created_at,
                gift_message, failed_reason, failed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&quote.top_up_quote_id)
        .bind(&quote.dest_address)
        .bind(&quote.dest_address_type)
        .bind(&quote.payment_amount)
        .bind(&quote.quoted_payment_amount)
        .bind(&quote.currency)
        .bind(&quote.winc_amount)
        .bind(&quote.provider)
        .bind(quote.expires_at)
        .bind(quote.created_at)
        .bind(&quote.gift_message)
        .bind(reason)
        .bind(self.now())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Settle a quote into a payment receipt.
    ///
    /// Within one transaction: validates expiry, amount, and currency;
    /// re-asserts single-use promo eligibility; moves the quote row to the
    /// receipt table; then either issues a gift (email destination, zero
    /// audit delta) or credits the destination user. Returns the new gift
    /// when one was issued.
    pub async fn create_payment_receipt(
        &self,
        params: &CreatePaymentReceiptParams,
    ) -> StoreResult<Option<UnredeemedGift>> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.create_payment_receipt_tx(&mut tx, params).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(gift) => return Ok(gift),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn create_payment_receipt_tx(
        &self,
        tx: &mut PgTx,
        params: &CreatePaymentReceiptParams,
    ) -> StoreResult<Option<UnredeemedGift>> {
        let now = self.now();
        let quote_id = params.top_up_quote_id.as_str();

        let row = lock_quote_tx(tx, quote_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "top_up_quote",
                id: quote_id.to_string(),
            })?;
        let quote: TopUpQuote = row.try_into()?;

        if quote.is_expired(now) {
            return Err(StoreError::QuoteExpired {
                quote_id: quote_id.to_string(),
            });
        }
        if params.currency != quote.currency {
            return Err(StoreError::PaymentMismatch {
                quote_id: quote_id.to_string(),
                reason: format!(
                    "currency {} does not match quoted {}",
                    params.currency, quote.currency
                ),
            });
        }
        // Over-payment is accepted (tax lines) and credited at the quoted
        // winc amount; under-payment is refused.
        if params.payment_amount < quote.payment_amount {
            return Err(StoreError::PaymentMismatch {
                quote_id: quote_id.to_string(),
                reason: format!(
                    "paid {} below quoted {}",
                    params.payment_amount, quote.payment_amount
                ),
            });
        }

        self.reassert_quote_promo_eligibility_tx(tx, &quote, now)
            .await?;

        delete_quote_tx(tx, quote_id).await?;
        insert_receipt_tx(tx, &quote, &params.receipt_id, now).await?;

        info!(
            quote_id,
            receipt_id = params.receipt_id.as_str(),
            winc = %quote.winc_amount,
            "payment receipt created"
        );

        if quote.dest_address_type.is_email() {
            let gift = self
                .insert_unredeemed_gift_tx(
                    tx,
                    &params.receipt_id,
                    &quote.winc_amount,
                    &quote.dest_address,
                    params.sender_email.as_deref(),
                    quote.gift_message.as_deref(),
                )
                .await?;
            append_audit_tx(
                tx,
                &quote.dest_address,
                &Winc::zero(),
                AuditChangeReason::GiftedPayment,
                Some(&params.receipt_id),
                now,
            )
            .await?;
            return Ok(Some(gift));
        }

        let address_type = quote
            .dest_address_type
            .as_user_address_type()
            .unwrap_or_default();
        self.credit_or_create_user_tx(
            tx,
            &quote.dest_address,
            address_type,
            &quote.winc_amount,
            CreditReasons {
                created: AuditChangeReason::AccountCreation,
                credited: AuditChangeReason::Payment,
            },
            Some(&params.receipt_id),
        )
        .await?;
        Ok(None)
    }

    /// Admin-path receipts with no backing quote.
    ///
    /// Each item settles in its own transaction with `bypassed_` change
    /// reasons; one failing item does not roll back the others.
    pub async fn create_bypassed_payment_receipts(
        &self,
        batch: &[BypassedPaymentReceiptParams],
    ) -> StoreResult<Vec<PaymentReceipt>> {
        let mut receipts = Vec::with_capacity(batch.len());
        for item in batch {
            let mut attempt = 0;
            let receipt = loop {
                let mut tx = self.writer.begin().await?;
                let result = self.create_bypassed_receipt_tx(&mut tx, item).await;
                match self.finish_tx(tx, result, &mut attempt).await? {
                    TxOutcome::Committed(receipt) => break receipt,
                    TxOutcome::Retry => continue,
                }
            };
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    async fn create_bypassed_receipt_tx(
        &self,
        tx: &mut PgTx,
        params: &BypassedPaymentReceiptParams,
    ) -> StoreResult<PaymentReceipt> {
        let now = self.now();
        // No gateway quote exists to preserve; synthesize one so the
        // receipt keeps the common shape.
        let quote = TopUpQuote {
            quote_id: Uuid::new_v4().to_string(),
            dest_address: params.dest_address.clone(),
            dest_address_type: params.dest_address_type,
            payment_amount: params.payment_amount.clone(),
            quoted_payment_amount: params.payment_amount.clone(),
            currency: params.currency.clone(),
            winc_amount: params.winc_amount.clone(),
            provider: "admin".to_string(),
            expires_at: now + chrono::Duration::minutes(1),
            created_at: now,
            gift_message: params.gift_message.clone(),
        };
        let receipt_id = Uuid::new_v4().to_string();

        insert_receipt_tx(tx, &quote, &receipt_id, now).await?;

        if quote.dest_address_type.is_email() {
            self.insert_unredeemed_gift_tx(
                tx,
                &receipt_id,
                &quote.winc_amount,
                &quote.dest_address,
                params.sender_email.as_deref(),
                quote.gift_message.as_deref(),
            )
            .await?;
            append_audit_tx(
                tx,
                &quote.dest_address,
                &Winc::zero(),
                AuditChangeReason::BypassedGiftedPayment,
                Some(&receipt_id),
                now,
            )
            .await?;
        } else {
            let address_type = quote
                .dest_address_type
                .as_user_address_type()
                .unwrap_or_default();
            self.credit_or_create_user_tx(
                tx,
                &quote.dest_address,
                address_type,
                &quote.winc_amount,
                CreditReasons {
                    created: AuditChangeReason::BypassedAccountCreation,
                    credited: AuditChangeReason::BypassedPayment,
                },
                Some(&receipt_id),
            )
            .await?;
        }

        Ok(PaymentReceipt {
            quote,
            receipt_id,
            receipt_date: now,
        })
    }

    /// Record a provider dispute against a settled quote.
    ///
    /// Debits the receipt's user (or the gift's redeemer), permitting a
    /// negative balance, and moves the receipt row to the chargeback
    /// table. A gift charged back before redemption debits no one.
    pub async fn create_chargeback_receipt(
        &self,
        params: &CreateChargebackParams,
    ) -> StoreResult<ChargebackReceipt> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.create_chargeback_receipt_tx(&mut tx, params).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(receipt) => return Ok(receipt),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn create_chargeback_receipt_tx(
        &self,
        tx: &mut PgTx,
        params: &CreateChargebackParams,
    ) -> StoreResult<ChargebackReceipt> {
        let now = self.now();
        let quote_id = params.top_up_quote_id.as_str();

        let row = sqlx::query_as::<_, ReceiptRow>(
            "SELECT * FROM payment_receipt WHERE top_up_quote_id = $1 FOR UPDATE",
        )
        .bind(quote_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "payment_receipt",
            id: quote_id.to_string(),
        })?;
        let receipt: PaymentReceipt = row.try_into()?;

        let debit_target = if receipt.quote.dest_address_type.is_email() {
            // A redeemed gift debits its redeemer; an unredeemed one is
            // simply revoked.
            let redeemer: Option<(String,)> = sqlx::query_as(
                "SELECT dest_address FROM redeemed_gift WHERE receipt_id = $1",
            )
            .bind(&receipt.receipt_id)
            .fetch_optional(&mut **tx)
            .await?;
            match redeemer {
                Some((address,)) => Some(address),
                None => {
                    sqlx::query("DELETE FROM unredeemed_gift WHERE receipt_id = $1")
                        .bind(&receipt.receipt_id)
                        .execute(&mut **tx)
                        .await?;
                    None
                }
            }
        } else {
            Some(receipt.quote.dest_address.clone())
        };

        if let Some(address) = debit_target {
            let user_row = self.lock_user_tx(tx, &address).await?.ok_or_else(|| {
                StoreError::UserNotFound {
                    address: address.clone(),
                }
            })?;
            let balance: Winc = user_row.winc_balance.parse()?;
            // A chargeback may take the balance negative; no clamping.
            let new_balance = balance.minus(&receipt.quote.winc_amount);
            self.update_balance_tx(tx, &address, &new_balance).await?;
            append_audit_tx(
                tx,
                &address,
                &receipt.quote.winc_amount.negated(),
                AuditChangeReason::Chargeback,
                Some(&params.chargeback_id),
                now,
            )
            .await?;
        }

        sqlx::query("DELETE FROM payment_receipt WHERE receipt_id = $1")
            .bind(&receipt.receipt_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO chargeback_receipt (
                chargeback_id, receipt_id, top_up_quote_id, dest_address,
                dest_address_type, payment_amount, quoted_payment_amount,
                currency, winc_amount, provider, expires_at, created_at,
                gift_message, receipt_date, chargeback_reason, chargeback_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(&params.chargeback_id)
        .bind(&receipt.receipt_id)
        .bind(&receipt.quote.quote_id)
        .bind(&receipt.quote.dest_address)
        .bind(receipt.quote.dest_address_type.as_str())
        .bind(receipt.quote.payment_amount.to_string())
        .bind(receipt.quote.quoted_payment_amount.to_string())
        .bind(&receipt.quote.currency)
        .bind(receipt.quote.winc_amount.to_string())
        .bind(&receipt.quote.provider)
        .bind(receipt.quote.expires_at)
        .bind(receipt.quote.created_at)
        .bind(&receipt.quote.gift_message)
        .bind(receipt.receipt_date)
        .bind(&params.reason)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        info!(
            quote_id,
            chargeback_id = params.chargeback_id.as_str(),
            "chargeback receipt created"
        );

        Ok(ChargebackReceipt {
            receipt,
            chargeback_id: params.chargeback_id.clone(),
            chargeback_reason: params.reason.clone(),
            chargeback_date: now,
        })
    }

    /// Whether any terminal table already references this quote id.
    pub async fn check_for_existing_payment_by_top_up_quote_id(
        &self,
        quote_id: &str,
    ) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (SELECT 1 FROM payment_receipt WHERE top_up_quote_id = $1)
                OR EXISTS (SELECT 1 FROM chargeback_receipt WHERE top_up_quote_id = $1)
                OR EXISTS (SELECT 1 FROM failed_top_up_quote WHERE top_up_quote_id = $1)
            "#,
        )
        .bind(quote_id)
        .fetch_one(&self.reader)
        .await?;
        Ok(exists)
    }
}

/// Lock a quote row for the remainder of the transaction.
async fn lock_quote_tx(tx: &mut PgTx, quote_id: &str) -> StoreResult<Option<QuoteRow>> {
    let row = sqlx::query_as::<_, QuoteRow>(
        "SELECT * FROM top_up_quote WHERE top_up_quote_id = $1 FOR UPDATE",
    )
    .bind(quote_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

async fn delete_quote_tx(tx: &mut PgTx, quote_id: &str) -> StoreResult<()> {
    sqlx::query("DELETE FROM top_up_quote WHERE top_up_quote_id = $1")
        .bind(quote_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_quote_tx(tx: &mut PgTx, quote: &TopUpQuote) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO top_up_quote (
            top_up_quote_id, dest_address, dest_address_type, payment_amount,
            quoted_payment_amount, currency, winc_amount, provider,
            expires_at, created_at, gift_message
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(&quote.quote_id)
    .bind(&quote.dest_address)
    .bind(quote.dest_address_type.as_str())
    .bind(quote.payment_amount.to_string())
    .bind(quote.quoted_payment_amount.to_string())
    .bind(&quote.currency)
    .bind(quote.winc_amount.to_string())
    .bind(&quote.provider)
    .bind(quote.expires_at)
    .bind(quote.created_at)
    .bind(&quote.gift_message)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_receipt_tx(
    tx: &mut PgTx,
    quote: &TopUpQuote,
    receipt_id: &str,
    receipt_date: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payment_receipt (
            receipt_id, top_up_quote_id, dest_address, dest_address_type,
            payment_amount, quoted_payment_amount, currency, winc_amount,
            provider, expires_at, created_at, gift_message, receipt_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(receipt_id)
    .bind(&quote.quote_id)
    .bind(&quote.dest_address)
    .bind(quote.dest_address_type.as_str())
    .bind(quote.payment_amount.to_string())
    .bind(quote.quoted_payment_amount.to_string())
    .bind(&quote.currency)
    .bind(quote.winc_amount.to_string())
    .bind(&quote.provider)
    .bind(quote.expires_at)
    .bind(quote.created_at)
    .bind(&quote.gift_message)
    .bind(receipt_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
