//! HTTP chain-gateway client for the pending-transaction poller.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use winc_core::{ChainGateway, ChainTransactionStatus, GatewayError};

/// Gateway client speaking the `/tx/{id}/status` contract.
///
/// `200` with a block height means confirmed, `202` means the gateway has
/// seen the transaction but no block yet, and `404` means not found.
pub struct HttpChainGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    block_height: Option<i64>,
}

impl HttpChainGateway {
    /// Build a client against a gateway base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChainGateway for HttpChainGateway {
    async fn transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<ChainTransactionStatus, GatewayError> {
        let url = format!("{}/tx/{}/status", self.base_url, transaction_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| GatewayError::Request(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(ChainTransactionStatus::NotFound),
            StatusCode::ACCEPTED => Ok(ChainTransactionStatus::Pending),
            status if status.is_success() => {
                let body: StatusBody = response
                    .json()
                    .await
                    .map_err(|err| GatewayError::Malformed(err.to_string()))?;
                match body.block_height {
                    Some(block_height) => {
                        Ok(ChainTransactionStatus::Confirmed { block_height })
                    }
                    None => Ok(ChainTransactionStatus::Pending),
                }
            }
            status => Err(GatewayError::Request(format!(
                "gateway answered {status} for {transaction_id}"
            ))),
        }
    }
}
