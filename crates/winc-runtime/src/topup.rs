//! Top-up quote composition and provider-event handling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use winc_core::{
    compose_payment_adjustments, Clock, DestinationAddressType, PaymentAdjustmentPlan,
    PaymentAmount, TopUpQuote, UnredeemedGift, Winc,
};
use winc_store::{CreateChargebackParams, CreatePaymentReceiptParams, LedgerStore, StoreResult};

/// How long a quote stays honorable.
const QUOTE_TTL_MINUTES: i64 = 30;

/// A request to price and persist a top-up quote.
///
/// The gross fiat amount and its winc conversion come from the caller;
/// price discovery is not this service's concern.
#[derive(Debug, Clone)]
pub struct TopUpQuoteRequest {
    /// Destination address, or recipient email for gifts.
    pub dest_address: String,
    /// Destination family.
    pub dest_address_type: DestinationAddressType,
    /// ISO currency code.
    pub currency: String,
    /// Gross fiat amount before exclusive adjustments.
    pub quoted_payment_amount: PaymentAmount,
    /// Winc the gross amount converts to, before inclusive adjustments.
    pub gross_winc: Winc,
    /// Promo codes presented by the user, in request order.
    pub promo_codes: Vec<String>,
    /// Payment provider expected to settle the quote.
    pub provider: String,
    /// Optional message for gifted quotes.
    pub gift_message: Option<String>,
}

/// What the payment provider reported, reduced to the fields the ledger
/// cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProviderEvent {
    /// The provider settled a quote.
    PaymentSucceeded {
        /// The settled quote.
        top_up_quote_id: String,
        /// Provider-supplied receipt id.
        receipt_id: String,
        /// What was actually charged.
        payment_amount: PaymentAmount,
        /// Currency charged in.
        currency: String,
        /// Sender email carried on gifted payments.
        sender_email: Option<String>,
    },
    /// The provider failed or canceled a payment.
    PaymentFailed {
        /// The failed quote.
        top_up_quote_id: String,
        /// Provider-supplied reason.
        reason: String,
    },
    /// The provider reported a dispute against a settled payment.
    Dispute {
        /// The disputed quote.
        top_up_quote_id: String,
        /// Provider-supplied dispute id.
        chargeback_id: String,
        /// Provider-supplied reason.
        reason: String,
    },
}

/// Outcome of handling one provider event.
#[derive(Debug, Clone)]
pub enum ProviderEventOutcome {
    /// A receipt was created; a gift when the destination was an email.
    ReceiptCreated(Option<UnredeemedGift>),
    /// The quote moved to the failed table.
    QuoteFailed,
    /// A chargeback receipt was recorded.
    ChargebackRecorded,
    /// The quote already settled earlier; redelivered events are no-ops.
    AlreadyProcessed,
}

/// Quote composition and settlement against the ledger store.
pub struct TopUpService {
    store: Arc<LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl TopUpService {
    /// Build the service.
    pub fn new(store: Arc<LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Resolve promo codes, compose adjustments, and persist the quote.
    ///
    /// Returns the stored quote and the plan that produced it (the plan's
    /// adjustment order matches the persisted index order).
    pub async fn create_top_up_quote(
        &self,
        request: &TopUpQuoteRequest,
    ) -> StoreResult<(TopUpQuote, PaymentAdjustmentPlan)> {
        let promos = self
            .store
            .get_single_use_promo_code_adjustments(&request.promo_codes, &request.dest_address)
            .await?;
        let inclusive = self.store.get_payment_adjustment_catalogs().await?;

        let plan = compose_payment_adjustments(
            &request.quoted_payment_amount,
            &request.gross_winc,
            &promos,
            &inclusive,
            request.dest_address_type,
        );

        let now = self.clock.now();
        let quote = TopUpQuote {
            quote_id: Uuid::new_v4().to_string(),
            dest_address: request.dest_address.clone(),
            dest_address_type: request.dest_address_type,
            payment_amount: plan.payment_amount.clone(),
            quoted_payment_amount: plan.quoted_payment_amount.clone(),
            currency: request.currency.clone(),
            winc_amount: plan.winc_amount.clone(),
            provider: request.provider.clone(),
            expires_at: now + chrono::Duration::minutes(QUOTE_TTL_MINUTES),
            created_at: now,
            gift_message: request.gift_message.clone(),
        };
        self.store.create_top_up_quote(&quote, &plan.adjustments).await?;

        info!(
            quote_id = quote.quote_id.as_str(),
            charged = %quote.payment_amount,
            winc = %quote.winc_amount,
            "top-up quote created"
        );
        Ok((quote, plan))
    }

    /// Apply one provider event to the ledger.
    ///
    /// Redelivered success events for an already-settled quote are
    /// answered idempotently rather than failed.
    pub async fn handle_provider_event(
        &self,
        event: &ProviderEvent,
    ) -> StoreResult<ProviderEventOutcome> {
        match event {
            ProviderEvent::PaymentSucceeded {
                top_up_quote_id,
                receipt_id,
                payment_amount,
                currency,
                sender_email,
            } => {
                if self
                    .store
                    .check_for_existing_payment_by_top_up_quote_id(top_up_quote_id)
                    .await?
                {
                    warn!(top_up_quote_id, "provider event redelivered, skipping");
                    return Ok(ProviderEventOutcome::AlreadyProcessed);
                }
                let gift = self
                    .store
                    .create_payment_receipt(&CreatePaymentReceiptParams {
                        top_up_quote_id: top_up_quote_id.clone(),
                        receipt_id: receipt_id.clone(),
                        payment_amount: payment_amount.clone(),
                        currency: currency.clone(),
                        sender_email: sender_email.clone(),
                    })
                    .await?;
                Ok(ProviderEventOutcome::ReceiptCreated(gift))
            }
            ProviderEvent::PaymentFailed {
                top_up_quote_id,
                reason,
            } => {
                self.store.fail_top_up_quote(top_up_quote_id, reason).await?;
                Ok(ProviderEventOutcome::QuoteFailed)
            }
            ProviderEvent::Dispute {
                top_up_quote_id,
                chargeback_id,
                reason,
            } => {
                self.store
                    .create_chargeback_receipt(&CreateChargebackParams {
                        top_up_quote_id: top_up_quote_id.clone(),
                        chargeback_id: chargeback_id.clone(),
                        reason: reason.clone(),
                    })
                    .await?;
                Ok(ProviderEventOutcome::ChargebackRecorded)
            }
        }
    }
}
