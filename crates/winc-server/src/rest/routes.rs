//! Route handlers and the store-error to status mapping.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use winc_core::{PaymentAmount, UserAddressType, Winc};
use winc_runtime::{ChainFundingRequest, CryptoFundingError, ReserveRequest};
use winc_store::{RedeemGiftParams, StoreError};

use super::AppState;

/// A handler-level error carrying a machine-readable kind.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err.kind() {
            "not_found" | "user_not_found" => StatusCode::NOT_FOUND,
            "insufficient_balance" => StatusCode::FORBIDDEN,
            "database_error" | "corrupt_data" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, err.kind(), err.to_string())
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}

/// Balance payload.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Signed winc balance, decimal string form.
    pub winc: String,
}

/// `GET /v1/balance/:address`
pub async fn balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    match state.store.get_balance(&address).await {
        Ok(winc) => Ok(Json(BalanceResponse {
            winc: winc.to_string(),
        })),
        Err(err @ StoreError::UserNotFound { .. }) => {
            // Unknown users are an expected query, not a fault.
            warn!(address, "balance requested for unknown user");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Query parameters for the reserve route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveQuery {
    /// The data item paying for the upload; generated when absent.
    #[serde(default)]
    pub data_item_id: Option<String>,
    /// Address family; defaults to arweave.
    #[serde(default)]
    pub address_type: Option<String>,
}

/// `GET /v1/reserve-balance/:address/:byte_count`
pub async fn reserve_balance(
    State(state): State<AppState>,
    Path((address, byte_count)): Path<(String, u64)>,
    Query(query): Query<ReserveQuery>,
) -> Result<&'static str, ApiError> {
    let address_type = match query.address_type.as_deref() {
        Some(raw) => raw.parse::<UserAddressType>().map_err(|err| {
            ApiError::new(StatusCode::BAD_REQUEST, "invalid_address_type", err.to_string())
        })?,
        None => UserAddressType::Arweave,
    };
    let network_winc = state
        .pricing
        .winc_for_bytes(byte_count)
        .await
        .map_err(|err| {
            ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "pricing_unavailable",
                err.to_string(),
            )
        })?;

    let request = ReserveRequest {
        user_address: address,
        user_address_type: address_type,
        data_item_id: query
            .data_item_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        network_winc,
        byte_count,
    };
    match state.uploads.reserve(&request).await {
        Ok(_) => Ok("Balance reserved"),
        Err(StoreError::InsufficientBalance { .. }) => Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "insufficient_balance",
            "Insufficient balance",
        )),
        Err(StoreError::UserNotFound { .. }) => Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "user_not_found",
            "User not found",
        )),
        Err(err) => Err(err.into()),
    }
}

/// `GET /v1/refund-balance/:address/:winc`
pub async fn refund_balance(
    State(state): State<AppState>,
    Path((address, winc)): Path<(String, String)>,
) -> Result<&'static str, ApiError> {
    let amount: Winc = winc.parse().map_err(|_| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "invalid_amount",
            format!("not an integer winc amount: {winc:?}"),
        )
    })?;
    state.uploads.refund(&address, &amount, None).await?;
    Ok("Balance refunded")
}

/// Body of a crypto-funding submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoFundRequest {
    /// Chain transaction id.
    pub transaction_id: String,
    /// Token the payment was made in.
    pub token_type: UserAddressType,
    /// Quantity paid, in the token's base unit.
    pub transaction_quantity: PaymentAmount,
    /// Winc the quantity converts to, before inclusive adjustments.
    pub gross_winc: Winc,
    /// Destination account.
    pub dest_address: String,
}

/// Crypto-funding payload.
#[derive(Debug, Serialize)]
pub struct CryptoFundResponse {
    /// The recorded chain transaction id.
    pub transaction_id: String,
    /// Winc that will be credited once the chain confirms.
    pub winc_amount: String,
}

/// `POST /v1/crypto-fund`
pub async fn crypto_fund(
    State(state): State<AppState>,
    Json(request): Json<CryptoFundRequest>,
) -> Result<Json<CryptoFundResponse>, ApiError> {
    let pending = state
        .crypto
        .submit_pending(&ChainFundingRequest {
            transaction_id: request.transaction_id,
            token_type: request.token_type,
            transaction_quantity: request.transaction_quantity,
            gross_winc: request.gross_winc,
            dest_address: request.dest_address,
            dest_address_type: request.token_type,
        })
        .await
        .map_err(|err| match err {
            CryptoFundingError::ExcludedAddress(address) => ApiError::new(
                StatusCode::FORBIDDEN,
                "excluded_address",
                format!("address {address} cannot fund with crypto"),
            ),
            CryptoFundingError::Store(store_err) => store_err.into(),
        })?;

    Ok(Json(CryptoFundResponse {
        transaction_id: pending.transaction_id,
        winc_amount: pending.winc_amount.to_string(),
    }))
}

/// Query parameters for gift redemption.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemQuery {
    /// The receipt id printed in the gift email.
    pub receipt_id: String,
    /// Email the gift was sent to.
    pub recipient_email: String,
    /// Account to credit.
    pub destination_address: String,
    /// Address family; defaults to arweave.
    #[serde(default)]
    pub destination_address_type: Option<String>,
}

/// Redemption payload.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The credited account.
    pub user_address: String,
    /// Winc moved out of the gift, decimal string form.
    pub winc_redeemed: String,
}

/// `GET /v1/redeem`
pub async fn redeem(
    State(state): State<AppState>,
    Query(query): Query<RedeemQuery>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let address_type = match query.destination_address_type.as_deref() {
        Some(raw) => raw.parse::<UserAddressType>().map_err(|err| {
            ApiError::new(StatusCode::BAD_REQUEST, "invalid_address_type", err.to_string())
        })?,
        None => UserAddressType::Arweave,
    };

    let redemption = state
        .store
        .redeem_gift(&RedeemGiftParams {
            receipt_id: query.receipt_id,
            recipient_email: query.recipient_email,
            dest_address: query.destination_address,
            dest_address_type: address_type,
        })
        .await?;

    Ok(Json(RedeemResponse {
        message: "Gift redeemed".to_string(),
        user_address: redemption.user.address,
        winc_redeemed: redemption.winc_redeemed.to_string(),
    }))
}
