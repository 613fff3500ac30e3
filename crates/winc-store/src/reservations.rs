//! Balance reservations and refunds.

use tracing::info;
use uuid::Uuid;

use winc_core::{
    AppliedUploadAdjustment, AuditChangeReason, BalanceReservation, UserAddressType, Winc,
};

use crate::audit::append_audit_tx;
use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PgTx, TxOutcome};

/// A reservation request, already composed against the upload catalogs.
#[derive(Debug, Clone)]
pub struct ReserveBalanceParams {
    /// The debited account.
    pub user_address: String,
    /// Address family, used when a zero-cost reservation creates the
    /// account.
    pub user_address_type: UserAddressType,
    /// The data item being paid for.
    pub data_item_id: String,
    /// Network cost before adjustments.
    pub network_winc: Winc,
    /// Winc to deduct after adjustments.
    pub reserved_winc: Winc,
    /// Applied adjustments in application order.
    pub adjustments: Vec<AppliedUploadAdjustment>,
}

impl LedgerStore {
    /// Reserve winc against a user's balance for an upload.
    ///
    /// A missing user fails the reservation unless it costs nothing, in
    /// which case an empty account is created. A reservation that would
    /// take the balance negative fails without writing anything.
    pub async fn reserve_balance(
        &self,
        params: &ReserveBalanceParams,
    ) -> StoreResult<BalanceReservation> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self.reserve_balance_tx(&mut tx, params).await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(reservation) => return Ok(reservation),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn reserve_balance_tx(
        &self,
        tx: &mut PgTx,
        params: &ReserveBalanceParams,
    ) -> StoreResult<BalanceReservation> {
        let now = self.now();
        let address = params.user_address.as_str();

        let balance = match self.lock_user_tx(tx, address).await? {
            Some(row) => row.winc_balance.parse::<Winc>()?,
            None => {
                if params.reserved_winc.is_positive() {
                    return Err(StoreError::UserNotFound {
                        address: address.to_string(),
                    });
                }
                self.insert_user_tx(tx, address, params.user_address_type, &Winc::zero(), now)
                    .await?;
                Winc::zero()
            }
        };

        let new_balance = balance.minus(&params.reserved_winc);
        if new_balance.is_negative() {
            return Err(StoreError::InsufficientBalance {
                user_address: address.to_string(),
                requested: params.reserved_winc.clone(),
                available: balance,
            });
        }

        let reservation = BalanceReservation {
            reservation_id: Uuid::new_v4().to_string(),
            data_item_id: params.data_item_id.clone(),
            user_address: address.to_string(),
            network_winc: params.network_winc.clone(),
            reserved_winc: params.reserved_winc.clone(),
            reserved_at: now,
        };
        sqlx::query(
            r#"
            INSERT INTO balance_reservation (
                reservation_id, data_item_id, user_address, network_winc,
                reserved_winc, reserved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&reservation.reservation_id)
        .bind(&reservation.data_item_id)
        .bind(&reservation.user_address)
        .bind(reservation.network_winc.to_string())
        .bind(reservation.reserved_winc.to_string())
        .bind(reservation.reserved_at)
        .execute(&mut **tx)
        .await?;

        for (index, adjustment) in params.adjustments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO upload_adjustment (
                    id, catalog_id, adjustment_index, winc_delta,
                    user_address, reservation_id, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&adjustment.catalog_id)
            .bind(index as i32)
            .bind(adjustment.winc_delta.to_string())
            .bind(address)
            .bind(&reservation.reservation_id)
            .bind(now)
            .execute(&mut **tx)
            .await?;
        }

        self.update_balance_tx(tx, address, &new_balance).await?;
        append_audit_tx(
            tx,
            address,
            &params.reserved_winc.negated(),
            AuditChangeReason::Upload,
            Some(&params.data_item_id),
            now,
        )
        .await?;

        info!(
            user_address = address,
            data_item_id = params.data_item_id.as_str(),
            reserved = %params.reserved_winc,
            "balance reserved"
        );
        Ok(reservation)
    }

    /// Refund a whole reservation's winc back to a user.
    pub async fn refund_balance(
        &self,
        user_address: &str,
        winc_amount: &Winc,
        data_item_id: Option<&str>,
    ) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            let mut tx = self.writer.begin().await?;
            let result = self
                .refund_balance_tx(&mut tx, user_address, winc_amount, data_item_id)
                .await;
            match self.finish_tx(tx, result, &mut attempt).await? {
                TxOutcome::Committed(()) => return Ok(()),
                TxOutcome::Retry => continue,
            }
        }
    }

    async fn refund_balance_tx(
        &self,
        tx: &mut PgTx,
        user_address: &str,
        winc_amount: &Winc,
        data_item_id: Option<&str>,
    ) -> StoreResult<()> {
        let now = self.now();
        let row = self.lock_user_tx(tx, user_address).await?.ok_or_else(|| {
            StoreError::UserNotFound {
                address: user_address.to_string(),
            }
        })?;
        let balance: Winc = row.winc_balance.parse()?;
        self.update_balance_tx(tx, user_address, &balance.plus(winc_amount))
            .await?;
        append_audit_tx(
            tx,
            user_address,
            winc_amount,
            AuditChangeReason::Refund,
            data_item_id,
            now,
        )
        .await?;

        info!(user_address, refunded = %winc_amount, "balance refunded");
        Ok(())
    }
}
