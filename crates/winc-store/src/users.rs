//! User rows: lookups, locking, and the credit-or-create upsert.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use winc_core::{AuditChangeReason, User, Winc};

use crate::audit::append_audit_tx;
use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PgTx};

/// Database shape of the users table.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub address: String,
    pub address_type: String,
    pub winc_balance: String,
    pub promotional_info: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<User, StoreError> {
        Ok(User {
            address: row.address,
            address_type: row.address_type.parse()?,
            winc_balance: row.winc_balance.parse()?,
            promotional_info: row.promotional_info,
            created_at: row.created_at,
        })
    }
}

/// Which audit reasons a credit writes, depending on whether the account
/// already existed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CreditReasons {
    /// Reason written when the credit creates the account.
    pub created: AuditChangeReason,
    /// Reason written when the account already existed.
    pub credited: AuditChangeReason,
}

impl LedgerStore {
    /// Fetch a user by address.
    pub async fn get_user(&self, address: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.reader)
            .await?
            .ok_or_else(|| StoreError::UserNotFound {
                address: address.to_string(),
            })?;
        row.try_into()
    }

    /// Current signed winc balance for a user.
    pub async fn get_balance(&self, address: &str) -> StoreResult<Winc> {
        let balance: Option<(String,)> =
            sqlx::query_as("SELECT winc_balance FROM users WHERE address = $1")
                .bind(address)
                .fetch_optional(&self.reader)
                .await?;
        let (raw,) = balance.ok_or_else(|| StoreError::UserNotFound {
            address: address.to_string(),
        })?;
        Ok(raw.parse()?)
    }

    /// Lock a user row for the remainder of the transaction.
    pub(crate) async fn lock_user_tx(
        &self,
        tx: &mut PgTx,
        address: &str,
    ) -> StoreResult<Option<UserRow>> {
        let row =
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE address = $1 FOR UPDATE")
                .bind(address)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(row)
    }

    /// Overwrite a locked user's balance.
    pub(crate) async fn update_balance_tx(
        &self,
        tx: &mut PgTx,
        address: &str,
        new_balance: &Winc,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE users SET winc_balance = $1 WHERE address = $2")
            .bind(new_balance.to_string())
            .bind(address)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Insert a brand-new user row.
    pub(crate) async fn insert_user_tx(
        &self,
        tx: &mut PgTx,
        address: &str,
        address_type: winc_core::UserAddressType,
        balance: &Winc,
        created_at: DateTime<Utc>,
    ) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (address, address_type, winc_balance, promotional_info, created_at)
            VALUES ($1, $2, $3, '{}'::jsonb, $4)
            "#,
        )
        .bind(address)
        .bind(address_type.as_str())
        .bind(balance.to_string())
        .bind(created_at)
        .execute(&mut **tx)
        .await?;

        Ok(User {
            address: address.to_string(),
            address_type,
            winc_balance: balance.clone(),
            promotional_info: serde_json::json!({}),
            created_at,
        })
    }

    /// Credit a user, creating the account on first credit.
    ///
    /// Locks the user row, applies the delta, and appends the audit row in
    /// the same transaction. The reason depends on whether the account was
    /// created here.
    pub(crate) async fn credit_or_create_user_tx(
        &self,
        tx: &mut PgTx,
        address: &str,
        address_type: winc_core::UserAddressType,
        amount: &Winc,
        reasons: CreditReasons,
        change_id: Option<&str>,
    ) -> StoreResult<User> {
        let now = self.now();
        match self.lock_user_tx(tx, address).await? {
            Some(row) => {
                let user: User = row.try_into()?;
                let new_balance = user.winc_balance.plus(amount);
                self.update_balance_tx(tx, address, &new_balance).await?;
                append_audit_tx(tx, address, amount, reasons.credited, change_id, now).await?;
                Ok(User {
                    winc_balance: new_balance,
                    ..user
                })
            }
            None => {
                let user = self
                    .insert_user_tx(tx, address, address_type, amount, now)
                    .await?;
                append_audit_tx(tx, address, amount, reasons.created, change_id, now).await?;
                Ok(user)
            }
        }
    }
}
