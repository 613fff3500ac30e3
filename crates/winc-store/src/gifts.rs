//! Gift issuance and redemption.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::info;

use winc_core::{
    AuditChangeReason, UnredeemedGift, User, UserAddressType, Winc, GIFT_EXPIRY_DAYS,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PgTx, TxOutcome};
use crate::users::CreditReasons;

/// Database shape of unredeemed_gift.
#[derive(Debug, Clone, FromRow)]
struct UnredeemedGiftRow {
    receipt_id: String,
    winc_amount: String,
    recipient_email: String,
    sender_email: Option<String>,
    gift_message: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<UnredeemedGiftRow> for UnredeemedGift {
    type Error = StoreError;

    fn try_from(row: UnredeemedGiftRow) -> Result<UnredeemedGift, StoreError> {
        Ok(UnredeemedGift {
            receipt_id: row.receipt_id,
            winc_amount: row.winc_amount.parse()?,
            recipient_email: row.recipient_email,
            sender_email: row.sender_email,
            gift_message: row.gift_message,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

/// A redemption request.
#[derive(Debug, Clone)]
pub struct RedeemGiftParams {
    /// The funding receipt id printed in the gift email.
    pub receipt_id: String,
    /// Email the recipient claims the gift was sent to.
    pub recipient_email: String,
    /// Account to credit.
    pub dest_address: String,
    /// Address family of `dest_address`.
    pub dest_address_type: UserAddressType,
}

/// The outcome of a successful redemption.
#[derive(Debug, Clone)]
pub struct GiftRedemption {
    /// The credited (possibly newly created) user.
    pub user: User,
    /// Winc moved out of the gift.
    pub winc_redeemed: Winc,
}

impl LedgerStore {
    /// Issue an unredeemed gift row for a settled gifted payment.
    pub(crate) async fn insert_unredeemed_gift_tx(
        &self,
        tx: &mut PgTx,
        receipt_id: &str,
        winc_amount: &Winc,
        recipient_email: &str,
        sender_email: Option<&str>,
        gift_message: Option<&str>,
    ) -> StoreResult<UnredeemedGift> {
        let created_at = self.now();
        let expires_at = created_at + chrono::Duration::days(GIFT_EXPIRY_DAYS);
        sqlx::query(
            r#"
            INSERT INTO unredeemed_gift (
                receipt_id, winc_amount, recipient_email, sender_email,
                gift_message, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(receipt_id)
        .bind(winc_amount.to_string())
        .bind(recipient_email)
        .bind(sender_email)
        .bind(gift_message)
        .bind(created_at)
        .bind(expires_at)
        .execute(&mut **tx)
        .await?;

        Ok(UnredeemedGift {
            receipt_id: receipt_id.to_string(),
            winc_amount: winc_amount.clone(),
            recipient_email: recipient_email.to_string(),
            sender_email: sender_email.map(str::to_string),
            gift_message: gift_message.map(str::to_string),
            created_at,
            expires_at,
        })
    }

    /// Redeem a gift into a user account.
    ///
    /// Moves the gift row from unredeemed to redeemed and credits the
    /// destination, creating the account when needed, all in one
    /// transaction.
    pub async fn redeem_gift(&self, params: &RedeemGiftParams) -> StoreResult<GiftRedemption> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.redeem_gift_tx(&mut tx, params).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(redemption) => return Ok(redemption),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn redeem_gift_tx(
        &self,
        tx: &mut PgTx,
        params: &RedeemGiftParams,
    ) -> StoreResult<GiftRedemption> {
        let now = self.now();
        let receipt_id = params.receipt_id.as_str();

        let row = sqlx::query_as::<_, UnredeemedGiftRow>(
            "SELECT * FROM unredeemed_gift WHERE receipt_id = $1 FOR UPDATE",
        )
        .bind(receipt_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else {
            let (already,): (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM redeemed_gift WHERE receipt_id = $1)",
            )
            .bind(receipt_id)
            .fetch_one(&mut **tx)
            .await?;
            if already {
                return Err(StoreError::GiftAlreadyRedeemed {
                    receipt_id: receipt_id.to_string(),
                });
            }
            return Err(StoreError::GiftRedemption {
                receipt_id: receipt_id.to_string(),
                reason: "no such gift".to_string(),
            });
        };
        let gift: UnredeemedGift = row.try_into()?;

        if gift.recipient_email != params.recipient_email {
            return Err(StoreError::GiftRedemption {
                receipt_id: receipt_id.to_string(),
                reason: "recipient email does not match".to_string(),
            });
        }
        if gift.is_expired(now) {
            return Err(StoreError::GiftRedemption {
                receipt_id: receipt_id.to_string(),
                reason: "gift has expired".to_string(),
            });
        }

        sqlx::query("DELETE FROM unredeemed_gift WHERE receipt_id = $1")
            .bind(receipt_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO redeemed_gift (
                receipt_id, winc_amount, recipient_email, sender_email,
                gift_message, created_at, expires_at, dest_address, redeemed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&gift.receipt_id)
        .bind(gift.winc_amount.to_string())
        .bind(&gift.recipient_email)
        .bind(&gift.sender_email)
        .bind(&gift.gift_message)
        .bind(gift.created_at)
        .bind(gift.expires_at)
        .bind(&params.dest_address)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let user = self
            .credit_or_create_user_tx(
                tx,
                &params.dest_address,
                params.dest_address_type,
                &gift.winc_amount,
                CreditReasons {
                    created: AuditChangeReason::GiftedAccountCreation,
                    credited: AuditChangeReason::GiftedPaymentRedemption,
                },
                Some(receipt_id),
            )
            .await?;

        info!(
            receipt_id,
            dest_address = params.dest_address.as_str(),
            winc = %gift.winc_amount,
            "gift redeemed"
        );

        Ok(GiftRedemption {
            user,
            winc_redeemed: gift.winc_amount,
        })
    }
}
