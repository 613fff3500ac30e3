//! Upload reservations composed against the active subsidy catalogs.

use std::sync::Arc;

use winc_core::{compose_upload_adjustments, UploadSubsidyContext, UserAddressType, Winc};
use winc_store::{LedgerStore, ReserveBalanceParams, StoreResult, WincUsedQuery};

/// A reservation request; the network cost is supplied by the caller.
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    /// The paying account.
    pub user_address: String,
    /// Address family, used when a zero-cost reservation creates the
    /// account.
    pub user_address_type: UserAddressType,
    /// The data item being paid for.
    pub data_item_id: String,
    /// Network cost before adjustments.
    pub network_winc: Winc,
    /// Upload size; gates byte-count-thresholded subsidies.
    pub byte_count: u64,
}

/// Reservation and refund flows.
pub struct UploadService {
    store: Arc<LedgerStore>,
}

impl UploadService {
    /// Build the service.
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Reserve balance for an upload, applying active subsidies.
    pub async fn reserve(
        &self,
        request: &ReserveRequest,
    ) -> StoreResult<winc_core::BalanceReservation> {
        let catalogs = self.store.get_upload_adjustment_catalogs().await?;

        let mut contexts = Vec::with_capacity(catalogs.len());
        for catalog in &catalogs {
            let winc_used_in_interval = match &catalog.winc_limitation {
                Some(limitation) => {
                    self.store
                        .get_winc_used_for_upload_adjustment_catalog(&WincUsedQuery {
                            user_address: &request.user_address,
                            catalog_id: &catalog.catalog_id,
                            interval: limitation.interval,
                            interval_unit: limitation.interval_unit,
                        })
                        .await?
                }
                None => Winc::zero(),
            };
            contexts.push(UploadSubsidyContext {
                catalog,
                winc_used_in_interval,
            });
        }

        let plan =
            compose_upload_adjustments(&request.network_winc, request.byte_count, &contexts);

        self.store
            .reserve_balance(&ReserveBalanceParams {
                user_address: request.user_address.clone(),
                user_address_type: request.user_address_type,
                data_item_id: request.data_item_id.clone(),
                network_winc: plan.network_winc,
                reserved_winc: plan.reserved_winc,
                adjustments: plan.adjustments,
            })
            .await
    }

    /// Refund a whole reservation's winc.
    pub async fn refund(
        &self,
        user_address: &str,
        winc_amount: &Winc,
        data_item_id: Option<&str>,
    ) -> StoreResult<()> {
        self.store
            .refund_balance(user_address, winc_amount, data_item_id)
            .await
    }
}
