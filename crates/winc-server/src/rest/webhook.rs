//! Stripe webhook: signature verification and event translation.
//!
//! The ledger only sees the quote id, the charged amount and currency,
//! and whether the event is a success, failure, or dispute; everything
//! else in the provider payload is ignored.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, info, warn};

use winc_core::PaymentAmount;
use winc_runtime::ProviderEvent;

use super::AppState;

/// Seconds a signature timestamp may drift from the server clock.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// The signed message is `"{t}.{payload}"`; any `v1` entry matching the
/// HMAC-SHA256 of it under `secret` passes, provided `t` is within
/// tolerance of `now_unix`.
pub fn verify_stripe_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> bool {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    signatures.into_iter().any(|signature| {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    })
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeObject,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    amount_received: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    receipt_email: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
    #[serde(default)]
    message: Option<String>,
}

/// Translate a provider payload into the event vocabulary the ledger
/// understands. Unknown event types map to `None` and are acknowledged
/// without action.
pub fn parse_provider_event(payload: &[u8]) -> Result<Option<ProviderEvent>, serde_json::Error> {
    let event: StripeEvent = serde_json::from_slice(payload)?;
    let object = event.data.object;

    let quote_id = |metadata: &HashMap<String, String>| {
        metadata.get("top_up_quote_id").cloned()
    };

    let parsed = match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let (Some(top_up_quote_id), Some(currency)) =
                (quote_id(&object.metadata), object.currency.clone())
            else {
                return Ok(None);
            };
            let amount = object.amount_received.or(object.amount).unwrap_or(0);
            Some(ProviderEvent::PaymentSucceeded {
                top_up_quote_id,
                receipt_id: object.id,
                payment_amount: PaymentAmount::from(amount),
                currency,
                sender_email: object
                    .metadata
                    .get("sender_email")
                    .cloned()
                    .or(object.receipt_email),
            })
        }
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            let Some(top_up_quote_id) = quote_id(&object.metadata) else {
                return Ok(None);
            };
            let reason = object
                .last_payment_error
                .and_then(|err| err.message)
                .unwrap_or_else(|| event.event_type.clone());
            Some(ProviderEvent::PaymentFailed {
                top_up_quote_id,
                reason,
            })
        }
        "charge.dispute.created" => {
            let Some(top_up_quote_id) = quote_id(&object.metadata) else {
                return Ok(None);
            };
            Some(ProviderEvent::Dispute {
                top_up_quote_id,
                chargeback_id: object.id,
                reason: object.reason.unwrap_or_else(|| "dispute".to_string()),
            })
        }
        _ => None,
    };
    Ok(parsed)
}

/// `POST /v1/stripe-webhook`
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let header = headers
            .get("stripe-signature")
            .and_then(|value| value.to_str().ok());
        let verified = header.map(|header| {
            verify_stripe_signature(secret, header, &body, Utc::now().timestamp())
        });
        if verified != Some(true) {
            warn!("webhook signature verification failed");
            return (StatusCode::BAD_REQUEST, "Webhook signature verification failed")
                .into_response();
        }
    }

    let event = match parse_provider_event(&body) {
        Ok(Some(event)) => event,
        Ok(None) => return (StatusCode::OK, "OK").into_response(),
        Err(err) => {
            warn!(%err, "unparseable webhook payload");
            return (StatusCode::BAD_REQUEST, "Unparseable payload").into_response();
        }
    };

    match state.topup.handle_provider_event(&event).await {
        Ok(outcome) => {
            info!(?outcome, "webhook event applied");
            (StatusCode::OK, "OK").into_response()
        }
        // Infrastructure failures return 500 so the provider redelivers;
        // domain refusals are acknowledged and logged.
        Err(err) if err.kind() == "database_error" => {
            error!(%err, "webhook event hit a database error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Retry later").into_response()
        }
        Err(err) => {
            warn!(%err, "webhook event refused by the ledger");
            (StatusCode::OK, "OK").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign("whsec_test", 1_700_000_000, payload);
        assert!(verify_stripe_signature(
            "whsec_test",
            &header,
            payload,
            1_700_000_000 + 10
        ));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = b"{}";
        let header = sign("whsec_a", 1_700_000_000, payload);
        assert!(!verify_stripe_signature(
            "whsec_b",
            &header,
            payload,
            1_700_000_000
        ));
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let payload = b"{}";
        let header = sign("whsec_test", 1_700_000_000, payload);
        assert!(!verify_stripe_signature(
            "whsec_test",
            &header,
            payload,
            1_700_000_000 + SIGNATURE_TOLERANCE_SECS + 1
        ));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let header = sign("whsec_test", 1_700_000_000, b"{\"amount\":1}");
        assert!(!verify_stripe_signature(
            "whsec_test",
            &header,
            b"{\"amount\":9}",
            1_700_000_000
        ));
    }

    #[test]
    fn test_parse_success_event() {
        let payload = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_123",
                "amount": 10100,
                "amount_received": 10731,
                "currency": "usd",
                "metadata": { "top_up_quote_id": "q-1" }
            }}
        });
        let event = parse_provider_event(payload.to_string().as_bytes())
            .unwrap()
            .unwrap();
        match event {
            ProviderEvent::PaymentSucceeded {
                top_up_quote_id,
                receipt_id,
                payment_amount,
                currency,
                ..
            } => {
                assert_eq!(top_up_quote_id, "q-1");
                assert_eq!(receipt_id, "pi_123");
                assert_eq!(payment_amount, PaymentAmount::from(10731u64));
                assert_eq!(currency, "usd");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_dispute_event() {
        let payload = serde_json::json!({
            "type": "charge.dispute.created",
            "data": { "object": {
                "id": "dp_9",
                "reason": "fraudulent",
                "metadata": { "top_up_quote_id": "q-2" }
            }}
        });
        let event = parse_provider_event(payload.to_string().as_bytes())
            .unwrap()
            .unwrap();
        assert!(matches!(
            event,
            ProviderEvent::Dispute { top_up_quote_id, .. } if top_up_quote_id == "q-2"
        ));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let payload = serde_json::json!({
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        });
        assert!(parse_provider_event(payload.to_string().as_bytes())
            .unwrap()
            .is_none());
    }
}
