//! The `LedgerStore` handle and its transaction discipline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use winc_config::DatabaseConfig;
use winc_core::{Clock, SystemClock};

use crate::error::{StoreError, StoreResult};

/// A writer-pool transaction.
pub(crate) type PgTx = Transaction<'static, Postgres>;

/// Retries granted to a transaction that hits a serialization failure.
const MAX_TX_RETRIES: u32 = 3;

/// The single operational entry point for ledger state.
///
/// Mutators run on the writer pool; standalone read-only lookups use the
/// reader pool, which may point at a replica. Reads that happen inside a
/// mutating transaction always go through that transaction's writer
/// connection, so a request observes its own writes.
pub struct LedgerStore {
    pub(crate) writer: PgPool,
    pub(crate) reader: PgPool,
    pub(crate) clock: Arc<dyn Clock>,
}

impl LedgerStore {
    /// Build a store over existing pools.
    pub fn new(writer: PgPool, reader: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            writer,
            reader,
            clock,
        }
    }

    /// Build a store where reads and writes share one pool.
    pub fn with_pool(pool: PgPool) -> Self {
        Self::new(pool.clone(), pool, Arc::new(SystemClock))
    }

    /// Connect writer and reader pools from configuration.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let writer = PgPoolOptions::new()
            .max_connections(16)
            .connect(&config.writer_url())
            .await?;
        let reader = if config.reader_host.is_some() {
            PgPoolOptions::new()
                .max_connections(16)
                .connect(&config.reader_url())
                .await?
        } else {
            writer.clone()
        };
        Ok(Self::new(writer, reader, Arc::new(SystemClock)))
    }

    /// Apply embedded schema migrations against the writer.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.writer)
            .await
            .map_err(|err| StoreError::Database(sqlx::Error::Migrate(Box::new(err))))
    }

    /// The store's current instant.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Finish a writer transaction: commit on success, roll back on
    /// failure, and decide whether a serialization failure earns another
    /// attempt.
    ///
    /// Every mutator runs the same loop: begin, run its `_tx` body, hand
    /// the transaction and outcome here, and retry while this returns
    /// [`TxOutcome::Retry`].
    pub(crate) async fn finish_tx<T>(
        &self,
        tx: PgTx,
        result: StoreResult<T>,
        attempt: &mut u32,
    ) -> StoreResult<TxOutcome<T>> {
        match result {
            Ok(value) => match tx.commit().await {
                Ok(()) => Ok(TxOutcome::Committed(value)),
                Err(err) => {
                    let err = StoreError::Database(err);
                    if err.is_serialization_failure() && *attempt < MAX_TX_RETRIES {
                        *attempt += 1;
                        warn!(attempt = *attempt, "serialization failure at commit, retrying");
                        Ok(TxOutcome::Retry)
                    } else {
                        Err(err)
                    }
                }
            },
            Err(err) => {
                // Rollback errors are dominated by the original error.
                let _ = tx.rollback().await;
                if err.is_serialization_failure() && *attempt < MAX_TX_RETRIES {
                    *attempt += 1;
                    warn!(attempt = *attempt, "serialization failure, retrying transaction");
                    Ok(TxOutcome::Retry)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// Whether a finished transaction committed or should be retried.
pub(crate) enum TxOutcome<T> {
    /// The transaction committed with this value.
    Committed(T),
    /// A serialization failure; run the transaction again.
    Retry,
}
