//! The pricing seam for the reserve route.
//!
//! Upload price discovery belongs to the external price oracle; the
//! adapter only needs a winc figure for a byte count. Deployments wire a
//! real oracle client; dev and tests use the fixed-rate implementation.

use async_trait::async_trait;
use thiserror::Error;

use winc_core::Winc;

/// Errors from price lookups.
#[derive(Error, Debug)]
pub enum PricingError {
    /// The oracle could not be reached or answered malformed.
    #[error("price oracle unavailable: {0}")]
    Unavailable(String),
}

/// Maps byte counts to network winc cost.
#[async_trait]
pub trait PricingOracle: Send + Sync {
    /// Winc cost of storing `byte_count` bytes.
    async fn winc_for_bytes(&self, byte_count: u64) -> Result<Winc, PricingError>;
}

/// A flat winc-per-byte rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedRateOracle {
    /// Winc charged per byte.
    pub winc_per_byte: u64,
}

#[async_trait]
impl PricingOracle for FixedRateOracle {
    async fn winc_for_bytes(&self, byte_count: u64) -> Result<Winc, PricingError> {
        Ok(Winc::from(
            u128::from(byte_count) * u128::from(self.winc_per_byte),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_rate() {
        let oracle = FixedRateOracle { winc_per_byte: 3 };
        let cost = oracle.winc_for_bytes(1024).await.unwrap();
        assert_eq!(cost, Winc::from(3072u64));
    }
}
