//! The append-only audit log.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use winc_core::{AuditChangeReason, AuditLogEntry, Winc};

use crate::error::StoreResult;
use crate::store::{LedgerStore, PgTx};

/// Database shape of the audit_log table.
#[derive(Debug, Clone, FromRow)]
struct AuditRow {
    audit_id: i64,
    user_address: String,
    winc_delta: String,
    change_reason: String,
    change_id: Option<String>,
    audit_date: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = crate::error::StoreError;

    fn try_from(row: AuditRow) -> Result<AuditLogEntry, Self::Error> {
        Ok(AuditLogEntry {
            audit_id: row.audit_id,
            user_address: row.user_address,
            winc_delta: row.winc_delta.parse()?,
            change_reason: row.change_reason.parse()?,
            change_id: row.change_id,
            audit_date: row.audit_date,
        })
    }
}

/// Append one audit row.
///
/// Always called from inside the transaction that applies the balance
/// change it describes.
pub(crate) async fn append_audit_tx(
    tx: &mut PgTx,
    user_address: &str,
    winc_delta: &Winc,
    change_reason: AuditChangeReason,
    change_id: Option<&str>,
    audit_date: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (user_address, winc_delta, change_reason, change_id, audit_date)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_address)
    .bind(winc_delta.to_string())
    .bind(change_reason.as_str())
    .bind(change_id)
    .bind(audit_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl LedgerStore {
    /// All audit rows for a user, oldest first.
    pub async fn get_audit_log(&self, user_address: &str) -> StoreResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_log WHERE user_address = $1 ORDER BY audit_id",
        )
        .bind(user_address)
        .fetch_all(&self.reader)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// The signed sum of a user's audit deltas.
    ///
    /// By the ledger invariant this equals the user's balance at every
    /// commit boundary.
    pub async fn audit_delta_sum(&self, user_address: &str) -> StoreResult<Winc> {
        let deltas: Vec<(String,)> =
            sqlx::query_as("SELECT winc_delta FROM audit_log WHERE user_address = $1")
                .bind(user_address)
                .fetch_all(&self.reader)
                .await?;

        let mut sum = Winc::zero();
        for (raw,) in deltas {
            sum = sum.plus(&raw.parse()?);
        }
        Ok(sum)
    }
}
