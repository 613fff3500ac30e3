//! Adjustment catalogs: queries, promo-code resolution, and the usage
//! facts eligibility depends on.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use winc_core::{
    assert_promo_code_eligible, select_catalog_for_code, AppliedPaymentAdjustment,
    LimitationIntervalUnit, PaymentAdjustmentCatalog, PaymentCatalogVariant, PromoCodeError,
    PromoCodeFacts, SingleUseCodeCatalog, TopUpQuote, UploadAdjustmentCatalog, Winc,
    WincLimitation,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{LedgerStore, PgTx};

/// Database shape of upload_adjustment_catalog.
#[derive(Debug, Clone, FromRow)]
struct UploadCatalogRow {
    catalog_id: String,
    name: String,
    description: String,
    operator: String,
    operator_magnitude: Decimal,
    priority: i32,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    byte_count_threshold: Option<i64>,
    winc_limitation: Option<String>,
    limitation_interval: Option<i64>,
    limitation_interval_unit: Option<String>,
}

impl TryFrom<UploadCatalogRow> for UploadAdjustmentCatalog {
    type Error = StoreError;

    fn try_from(row: UploadCatalogRow) -> Result<UploadAdjustmentCatalog, StoreError> {
        let winc_limitation = match (
            row.winc_limitation,
            row.limitation_interval,
            row.limitation_interval_unit,
        ) {
            (Some(limit), Some(interval), Some(unit)) => Some(WincLimitation {
                limit: limit.parse()?,
                interval,
                interval_unit: unit.parse()?,
            }),
            (None, None, None) => None,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "upload catalog {} has a partial winc limitation",
                    row.catalog_id
                )))
            }
        };

        Ok(UploadAdjustmentCatalog {
            catalog_id: row.catalog_id,
            name: row.name,
            description: row.description,
            operator: row.operator.parse()?,
            operator_magnitude: row.operator_magnitude,
            priority: row.priority,
            start_at: row.start_at,
            end_at: row.end_at,
            byte_count_threshold: row.byte_count_threshold.map(|t| t as u64),
            winc_limitation,
        })
    }
}

/// Database shape of payment_adjustment_catalog; single-use-code columns
/// are nullable and discriminate the flavor.
#[derive(Debug, Clone, FromRow)]
struct PaymentCatalogRow {
    catalog_id: String,
    name: String,
    description: String,
    operator: String,
    operator_magnitude: Decimal,
    priority: i32,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    exclusivity: String,
    code_value: Option<String>,
    target_user_group: Option<String>,
    max_uses: Option<i64>,
    minimum_payment_amount: Option<String>,
    maximum_discount_amount: Option<String>,
}

impl PaymentCatalogRow {
    fn head(&self) -> StoreResult<PaymentAdjustmentCatalog> {
        Ok(PaymentAdjustmentCatalog {
            catalog_id: self.catalog_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            operator: self.operator.parse()?,
            operator_magnitude: self.operator_magnitude,
            priority: self.priority,
            start_at: self.start_at,
            end_at: self.end_at,
            exclusivity: self.exclusivity.parse()?,
        })
    }

    /// Resolve the row into the catalog sum type. The presence of the
    /// code columns discriminates the flavor.
    fn resolve(self) -> StoreResult<PaymentCatalogVariant> {
        let head = self.head()?;
        let Some(code_value) = self.code_value else {
            return Ok(PaymentCatalogVariant::Fee(head));
        };
        Ok(PaymentCatalogVariant::SingleUseCode(SingleUseCodeCatalog {
            catalog: head,
            code_value,
            target_user_group: match self.target_user_group {
                Some(raw) => raw.parse()?,
                None => Default::default(),
            },
            max_uses: self.max_uses.unwrap_or(0),
            minimum_payment_amount: self
                .minimum_payment_amount
                .map(|raw| raw.parse())
                .transpose()?,
            maximum_discount_amount: self
                .maximum_discount_amount
                .map(|raw| raw.parse())
                .transpose()?,
        }))
    }
}

/// Which row an applied payment adjustment hangs off.
pub(crate) enum AdjustmentOwner<'a> {
    /// A fiat top-up quote.
    Quote(&'a str),
    /// A chain transaction.
    Transaction(&'a str),
}

/// Persist applied payment adjustments with their application order.
pub(crate) async fn insert_payment_adjustments_tx(
    tx: &mut PgTx,
    owner: AdjustmentOwner<'_>,
    user_address: &str,
    adjustments: &[AppliedPaymentAdjustment],
    created_at: DateTime<Utc>,
) -> StoreResult<()> {
    let (quote_id, transaction_id) = match owner {
        AdjustmentOwner::Quote(id) => (Some(id), None),
        AdjustmentOwner::Transaction(id) => (None, Some(id)),
    };
    for (index, adjustment) in adjustments.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO payment_adjustment (
                id, catalog_id, adjustment_index, payment_delta, winc_delta,
                user_address, top_up_quote_id, transaction_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&adjustment.catalog_id)
        .bind(index as i32)
        .bind(adjustment.payment_delta.to_string())
        .bind(adjustment.winc_delta.to_string())
        .bind(user_address)
        .bind(quote_id)
        .bind(transaction_id)
        .bind(created_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Bounds for a winc-used-within-interval query.
#[derive(Debug, Clone)]
pub struct WincUsedQuery<'a> {
    /// The consuming user.
    pub user_address: &'a str,
    /// The catalog whose budget is being checked.
    pub catalog_id: &'a str,
    /// Interval length, in `interval_unit`s.
    pub interval: i64,
    /// Unit of `interval`.
    pub interval_unit: LimitationIntervalUnit,
}

impl LedgerStore {
    /// Upload catalogs active now, lowest priority first.
    pub async fn get_upload_adjustment_catalogs(
        &self,
    ) -> StoreResult<Vec<UploadAdjustmentCatalog>> {
        let rows = sqlx::query_as::<_, UploadCatalogRow>(
            r#"
            SELECT * FROM upload_adjustment_catalog
            WHERE start_at <= $1 AND (end_at IS NULL OR end_at > $1)
            ORDER BY priority
            "#,
        )
        .bind(self.now())
        .fetch_all(&self.reader)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Inclusive payment catalogs active now, lowest priority first.
    ///
    /// Single-use-code catalogs are excluded; they only apply through
    /// [`LedgerStore::get_single_use_promo_code_adjustments`].
    pub async fn get_payment_adjustment_catalogs(
        &self,
    ) -> StoreResult<Vec<PaymentAdjustmentCatalog>> {
        let rows = sqlx::query_as::<_, PaymentCatalogRow>(
            r#"
            SELECT * FROM payment_adjustment_catalog
            WHERE start_at <= $1 AND (end_at IS NULL OR end_at > $1)
            ORDER BY priority
            "#,
        )
        .bind(self.now())
        .fetch_all(&self.reader)
        .await?;

        let mut catalogs = Vec::with_capacity(rows.len());
        for row in rows {
            if let PaymentCatalogVariant::Fee(catalog) = row.resolve()? {
                catalogs.push(catalog);
            }
        }
        Ok(catalogs)
    }

    /// Resolve requested promo codes into eligible catalogs, in request
    /// order.
    ///
    /// Runs in one read transaction so every code sees the same usage
    /// facts. Each code resolves to the most recently started catalog
    /// carrying it; eligibility is asserted against the requesting user.
    pub async fn get_single_use_promo_code_adjustments(
        &self,
        codes: &[String],
        user_address: &str,
    ) -> StoreResult<Vec<SingleUseCodeCatalog>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let now = self.now();
        let mut tx = self.reader.begin().await?;

        let rows = sqlx::query_as::<_, PaymentCatalogRow>(
            r#"
            SELECT * FROM payment_adjustment_catalog
            WHERE code_value IS NOT NULL AND start_at <= $1
            ORDER BY priority
            "#,
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;
        let mut catalogs = Vec::with_capacity(rows.len());
        for row in rows {
            if let PaymentCatalogVariant::SingleUseCode(catalog) = row.resolve()? {
                catalogs.push(catalog);
            }
        }

        let mut eligible = Vec::with_capacity(codes.len());
        for code in codes {
            let catalog = select_catalog_for_code(&catalogs, code).ok_or_else(|| {
                StoreError::PromoCode(PromoCodeError::NotFound { code: code.clone() })
            })?;
            let facts =
                gather_promo_facts_tx(&mut tx, &catalog.catalog.catalog_id, user_address).await?;
            assert_promo_code_eligible(catalog, user_address, &facts, now)
                .map_err(StoreError::PromoCode)?;
            eligible.push(catalog.clone());
        }

        tx.commit().await?;
        Ok(eligible)
    }

    /// Re-assert single-use eligibility for every code-backed adjustment
    /// attached to a quote, at settlement time.
    pub(crate) async fn reassert_quote_promo_eligibility_tx(
        &self,
        tx: &mut PgTx,
        quote: &TopUpQuote,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let rows = sqlx::query_as::<_, PaymentCatalogRow>(
            r#"
            SELECT c.* FROM payment_adjustment_catalog c
            JOIN payment_adjustment pa ON pa.catalog_id = c.catalog_id
            WHERE pa.top_up_quote_id = $1 AND c.code_value IS NOT NULL
            "#,
        )
        .bind(&quote.quote_id)
        .fetch_all(&mut **tx)
        .await?;

        for row in rows {
            let PaymentCatalogVariant::SingleUseCode(catalog) = row.resolve()? else {
                continue;
            };
            let facts = gather_promo_facts_tx(tx, &catalog.catalog.catalog_id, &quote.dest_address)
                .await?;
            assert_promo_code_eligible(&catalog, &quote.dest_address, &facts, now)
                .map_err(StoreError::PromoCode)?;
        }
        Ok(())
    }

    /// Winc a user has drawn from a catalog within the trailing interval.
    pub async fn get_winc_used_for_upload_adjustment_catalog(
        &self,
        query: &WincUsedQuery<'_>,
    ) -> StoreResult<Winc> {
        let since = self.now() - query.interval_unit.duration(query.interval);
        let deltas: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT winc_delta FROM upload_adjustment
            WHERE user_address = $1 AND catalog_id = $2 AND created_at >= $3
            "#,
        )
        .bind(query.user_address)
        .bind(query.catalog_id)
        .bind(since)
        .fetch_all(&self.reader)
        .await?;

        let mut used = Winc::zero();
        for (raw,) in deltas {
            used = used.plus(&raw.parse()?);
        }
        Ok(used)
    }
}

/// Usage facts for one catalog/user pair, inside the caller's transaction.
async fn gather_promo_facts_tx(
    tx: &mut PgTx,
    catalog_id: &str,
    user_address: &str,
) -> StoreResult<PromoCodeFacts> {
    let (global_use_count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM payment_adjustment pa
        JOIN payment_receipt pr ON pa.top_up_quote_id = pr.top_up_quote_id
        WHERE pa.catalog_id = $1
        "#,
    )
    .bind(catalog_id)
    .fetch_one(&mut **tx)
    .await?;

    let (user_payment_receipt_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payment_receipt WHERE dest_address = $1")
            .bind(user_address)
            .fetch_one(&mut **tx)
            .await?;

    let (user_catalog_use_count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM payment_adjustment pa
        JOIN payment_receipt pr ON pa.top_up_quote_id = pr.top_up_quote_id
        WHERE pa.catalog_id = $1 AND pa.user_address = $2
        "#,
    )
    .bind(catalog_id)
    .bind(user_address)
    .fetch_one(&mut **tx)
    .await?;

    Ok(PromoCodeFacts {
        global_use_count,
        user_payment_receipt_count,
        user_catalog_use_count,
    })
}
