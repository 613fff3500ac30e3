//! The pending-transaction poller.
//!
//! Each tick walks the pending table and asks the chain gateway where
//! every transaction stands. Transitions run as independent store
//! transactions, so one stuck row never blocks the rest.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use winc_config::PollerConfig;
use winc_core::{ChainGateway, ChainTransactionStatus, Clock};
use winc_store::{LedgerStore, StoreError};

/// What to do with one pending transaction after a status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// The chain confirmed it; credit at this height.
    Credit {
        /// Height of the confirming block.
        block_height: i64,
    },
    /// The chain has never heard of it and the grace period is spent.
    Fail {
        /// Reason recorded on the failed row.
        reason: String,
    },
    /// Still propagating or still pending; check again next tick.
    Leave,
}

/// Decide the transition for one pending transaction.
///
/// `not_found` within the grace window is treated as propagation delay.
pub fn decide(
    status: ChainTransactionStatus,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    grace: Duration,
) -> PollAction {
    match status {
        ChainTransactionStatus::Confirmed { block_height } => PollAction::Credit { block_height },
        ChainTransactionStatus::Pending => PollAction::Leave,
        ChainTransactionStatus::NotFound => {
            if now - created_at > grace {
                PollAction::Fail {
                    reason: format!("not found after {} hour grace period", grace.num_hours()),
                }
            } else {
                PollAction::Leave
            }
        }
    }
}

/// The periodic job advancing pending chain payments.
pub struct PendingTxPoller {
    store: Arc<LedgerStore>,
    gateway: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    config: PollerConfig,
}

impl PendingTxPoller {
    /// Build the poller.
    pub fn new(
        store: Arc<LedgerStore>,
        gateway: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        config: PollerConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            clock,
            config,
        }
    }

    /// Run ticks forever at the configured cadence.
    ///
    /// Callers spawn this on the runtime and abort the task at shutdown;
    /// in-flight transitions are single transactions and roll back safely.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "pending-transaction poller started"
        );
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Process every pending transaction once. Returns how many rows
    /// transitioned.
    pub async fn tick(&self) -> usize {
        let pending = match self.store.get_pending_transactions().await {
            Ok(rows) => rows,
            Err(err) => {
                error!(%err, "failed to list pending transactions");
                return 0;
            }
        };
        if pending.is_empty() {
            return 0;
        }

        let grace = Duration::from_std(self.config.grace_period)
            .unwrap_or_else(|_| Duration::hours(48));
        let mut transitioned = 0;

        for transaction in pending {
            let id = transaction.transaction_id.as_str();
            let status = match self.gateway.transaction_status(id).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(transaction_id = id, %err, "gateway probe failed, skipping row");
                    continue;
                }
            };

            match decide(status, transaction.created_at, self.clock.now(), grace) {
                PollAction::Credit { block_height } => {
                    match self.store.credit_pending_transaction(id, block_height).await {
                        Ok(_) => transitioned += 1,
                        // Another poller invocation won the race; done.
                        Err(StoreError::PaymentTransactionNotFound { .. }) => {
                            debug!(transaction_id = id, "already settled");
                        }
                        Err(err) => {
                            error!(transaction_id = id, %err, "credit transition failed");
                        }
                    }
                }
                PollAction::Fail { reason } => {
                    match self.store.fail_pending_transaction(id, &reason).await {
                        Ok(()) => transitioned += 1,
                        Err(StoreError::PaymentTransactionNotFound { .. }) => {
                            debug!(transaction_id = id, "already settled");
                        }
                        Err(err) => {
                            error!(transaction_id = id, %err, "fail transition failed");
                        }
                    }
                }
                PollAction::Leave => {}
            }
        }
        transitioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_confirmed_credits_at_reported_height() {
        let action = decide(
            ChainTransactionStatus::Confirmed { block_height: 1234 },
            at(0),
            at(1),
            Duration::hours(48),
        );
        assert_eq!(action, PollAction::Credit { block_height: 1234 });
    }

    #[test]
    fn test_pending_is_left_alone() {
        let action = decide(
            ChainTransactionStatus::Pending,
            at(0),
            at(10),
            Duration::hours(48),
        );
        assert_eq!(action, PollAction::Leave);
    }

    #[test]
    fn test_not_found_within_grace_is_left_alone() {
        let action = decide(
            ChainTransactionStatus::NotFound,
            at(0),
            at(12),
            Duration::hours(48),
        );
        assert_eq!(action, PollAction::Leave);
    }

    #[test]
    fn test_not_found_past_grace_fails() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let now = created + Duration::hours(49);
        let action = decide(
            ChainTransactionStatus::NotFound,
            created,
            now,
            Duration::hours(48),
        );
        assert!(matches!(action, PollAction::Fail { .. }));
    }

    #[test]
    fn test_not_found_exactly_at_grace_is_left_alone() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let now = created + Duration::hours(48);
        let action = decide(
            ChainTransactionStatus::NotFound,
            created,
            now,
            Duration::hours(48),
        );
        assert_eq!(action, PollAction::Leave);
    }
}
