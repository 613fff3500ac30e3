//! The chain-gateway seam.
//!
//! The pending-transaction poller talks to the chain through this trait;
//! production binds it to a gateway client, tests to a canned map.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a chain transaction as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ChainTransactionStatus {
    /// Seen by the gateway but not yet confirmed.
    Pending,
    /// Confirmed at the reported block height.
    Confirmed {
        /// Height of the confirming block.
        block_height: i64,
    },
    /// Unknown to the gateway. May be transient propagation delay.
    NotFound,
}

/// Errors from the chain gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The gateway could not be reached or returned a transport error.
    #[error("chain gateway request failed: {0}")]
    Request(String),

    /// The gateway responded with something unparseable.
    #[error("chain gateway response malformed: {0}")]
    Malformed(String),
}

/// Read-only view of chain transaction status.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Look up the confirmation status of `transaction_id`.
    async fn transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<ChainTransactionStatus, GatewayError>;
}
