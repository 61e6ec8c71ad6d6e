//! Payment gateway client.
//!
//! Charges are captured through Stripe's charges endpoint. Every capture
//! carries an idempotency key derived from the exact cart snapshot being
//! charged, so a retried checkout reuses the original charge instead of
//! billing twice. The HTTP call is bounded by a timeout; past it the attempt
//! is treated as a payment failure and never retried automatically.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use thimble_core::Cents;

use crate::config::StripeConfig;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Errors that can occur while capturing a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway refused the charge (declined card, bad source token).
    #[error("charge declined: {message}")]
    Declined { message: String },

    /// The gateway did not answer within the configured bound.
    #[error("payment gateway timed out")]
    Timeout,

    /// Transport-level failure talking to the gateway.
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a body we could not interpret.
    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

/// A charge to capture.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Amount in minor currency units. Server-computed.
    pub amount: Cents,
    /// ISO currency code.
    pub currency: String,
    /// Single-use payment source token minted client-side.
    pub source_token: String,
    /// Deterministic key for the cart snapshot being charged.
    pub idempotency_key: String,
}

/// A captured charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    /// Gateway-assigned charge reference.
    pub id: String,
    /// Captured amount in minor units.
    pub amount: Cents,
}

/// Abstraction over the payment gateway so checkout logic can be exercised
/// without network access.
pub trait PaymentGateway {
    /// Capture a charge.
    fn charge(
        &self,
        request: &ChargeRequest,
    ) -> impl Future<Output = Result<Charge, PaymentError>> + Send;
}

/// Stripe charges-API client.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Success body from the charges endpoint. Only the fields we use.
#[derive(Debug, Deserialize)]
struct StripeCharge {
    id: String,
    amount: i64,
}

/// Error body from the charges endpoint.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    /// Create a new gateway client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
        })
    }
}

impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(amount = %request.amount))]
    async fn charge(&self, request: &ChargeRequest) -> Result<Charge, PaymentError> {
        let params = [
            ("amount", request.amount.as_i64().to_string()),
            ("currency", request.currency.clone()),
            ("source", request.source_token.clone()),
        ];

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/charges"))
            .bearer_auth(self.secret_key.expose_secret())
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("Stripe charge timed out");
                    PaymentError::Timeout
                } else {
                    PaymentError::Http(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let charge = parse_charge(&body)?;
            debug!(charge_id = %charge.id, "Charge captured");
            return Ok(charge);
        }

        Err(parse_decline(&body))
    }
}

fn parse_charge(body: &str) -> Result<Charge, PaymentError> {
    let parsed: StripeCharge = serde_json::from_str(body)
        .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

    Ok(Charge {
        id: parsed.id,
        amount: Cents::new(parsed.amount),
    })
}

fn parse_decline(body: &str) -> PaymentError {
    serde_json::from_str::<StripeErrorBody>(body).map_or_else(
        |_| PaymentError::InvalidResponse(format!("unparseable error body: {body}")),
        |parsed| PaymentError::Declined {
            message: parsed
                .error
                .message
                .unwrap_or_else(|| "charge was declined".to_owned()),
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_parse_charge_success() {
        let body = r#"{
            "id": "ch_3MmlLrLkdIwHu7ix0snN0B15",
            "object": "charge",
            "amount": 2200,
            "currency": "usd",
            "status": "succeeded"
        }"#;

        let charge = parse_charge(body).unwrap();
        assert_eq!(charge.id, "ch_3MmlLrLkdIwHu7ix0snN0B15");
        assert_eq!(charge.amount, Cents::new(2200));
    }

    #[test]
    fn test_parse_charge_garbage_body() {
        let err = parse_charge("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, PaymentError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_decline_with_message() {
        let body = r#"{"error": {"type": "card_error", "message": "Your card was declined."}}"#;
        let err = parse_decline(body);
        match err {
            PaymentError::Declined { message } => {
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("expected Declined, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_decline_without_message() {
        let body = r#"{"error": {"type": "api_error"}}"#;
        let err = parse_decline(body);
        assert!(matches!(err, PaymentError::Declined { .. }));
    }

    #[test]
    fn test_parse_decline_unparseable() {
        let err = parse_decline("not json");
        assert!(matches!(err, PaymentError::InvalidResponse(_)));
    }

    #[test]
    fn test_gateway_debug_redacts_key() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_live_very_secret"),
            currency: "usd".to_owned(),
            timeout: Duration::from_secs(30),
        };
        let gateway = StripeGateway::new(&config).unwrap();
        let debug = format!("{gateway:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk_live_very_secret"));
    }
}
