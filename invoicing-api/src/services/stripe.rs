//! Stripe payment provider client.
//!
//! Implements the PaymentIntents API for card checkout and HMAC
//! verification of webhook deliveries.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;

use crate::config::StripeConfig;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

/// Response from PaymentIntent creation.
#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    /// Amount in the smallest currency unit (cents for USD).
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
}

/// Stripe webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

/// PaymentIntent as it appears inside webhook payloads.
#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentError {
    pub message: Option<String>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Stripe is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Create a PaymentIntent for an invoice.
    ///
    /// # Arguments
    /// * `amount` - Amount in smallest currency unit (cents for USD)
    /// * `currency` - Lowercase currency code (e.g., "usd")
    /// * `metadata` - Keys attached to the intent, echoed back in webhooks
    pub async fn create_payment_intent(
        &self,
        amount: i64,
        currency: &str,
        metadata: &[(&str, &str)],
    ) -> Result<PaymentIntent> {
        if !self.is_configured() {
            return Err(anyhow!("Stripe credentials not configured"));
        }

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value.to_string()));
        }

        let url = format!("{}/v1/payment_intents", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe create_payment_intent response");

        if status.is_success() {
            let intent: PaymentIntent = serde_json::from_str(&body)?;
            tracing::info!(
                intent_id = %intent.id,
                amount = intent.amount,
                currency = %intent.currency,
                "Stripe payment intent created"
            );
            Ok(intent)
        } else {
            let error: StripeError = serde_json::from_str(&body).unwrap_or_else(|_| StripeError {
                error: StripeErrorDetail {
                    error_type: "unknown".to_string(),
                    message: Some(body.clone()),
                },
            });
            tracing::error!(
                error_type = %error.error.error_type,
                message = ?error.error.message,
                "Stripe payment intent creation failed"
            );
            Err(anyhow!(
                "Stripe error: {} - {}",
                error.error.error_type,
                error.error.message.unwrap_or_default()
            ))
        }
    }

    /// Verify a webhook delivery against the `Stripe-Signature` header.
    ///
    /// The header carries `t=<timestamp>,v1=<signature>`; the signature is
    /// `HMAC-SHA256("{timestamp}.{body}", webhook_secret)` in hex.
    pub fn verify_webhook_signature(&self, body: &str, signature_header: &str) -> Result<bool> {
        let mut timestamp = None;
        let mut signature = None;
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }

        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(anyhow!("Malformed Stripe signature header"));
        };

        let signed_payload = format!("{}.{}", timestamp, body);
        let expected = self.compute_signature(
            &signed_payload,
            self.config.webhook_secret.expose_secret(),
        )?;

        let is_valid = expected == signature;
        if !is_valid {
            tracing::warn!("Stripe webhook signature verification failed");
        }

        Ok(is_valid)
    }

    /// Parse webhook event from request body.
    pub fn parse_webhook_event(&self, body: &str) -> Result<WebhookEvent> {
        let event: WebhookEvent = serde_json::from_str(body)?;
        Ok(event)
    }

    fn compute_signature(&self, payload: &str, secret: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| anyhow!("Invalid key length"))?;
        mac.update(payload.as_bytes());
        let result = mac.finalize();
        Ok(hex::encode(result.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> StripeConfig {
        StripeConfig {
            secret_key: Secret::new("sk_test_123".to_string()),
            webhook_secret: Secret::new("whsec_test".to_string()),
            api_base: "https://api.stripe.com".to_string(),
        }
    }

    #[test]
    fn test_is_configured() {
        let client = StripeClient::new(test_config());
        assert!(client.is_configured());

        let empty_config = StripeConfig {
            secret_key: Secret::new("".to_string()),
            webhook_secret: Secret::new("".to_string()),
            api_base: "".to_string(),
        };
        let client = StripeClient::new(empty_config);
        assert!(!client.is_configured());
    }

    #[test]
    fn test_webhook_signature_verification() {
        let client = StripeClient::new(test_config());

        let body = r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let timestamp = "1700000000";
        let signed_payload = format!("{}.{}", timestamp, body);
        let expected = client
            .compute_signature(&signed_payload, "whsec_test")
            .unwrap();

        let header = format!("t={},v1={}", timestamp, expected);
        assert!(client.verify_webhook_signature(body, &header).unwrap());
    }

    #[test]
    fn test_tampered_body_fails_verification() {
        let client = StripeClient::new(test_config());

        let timestamp = "1700000000";
        let signed_payload = format!("{}.original", timestamp);
        let signature = client
            .compute_signature(&signed_payload, "whsec_test")
            .unwrap();

        let header = format!("t={},v1={}", timestamp, signature);
        assert!(!client.verify_webhook_signature("tampered", &header).unwrap());
    }

    #[test]
    fn test_malformed_header_is_rejected() {
        let client = StripeClient::new(test_config());
        assert!(client.verify_webhook_signature("body", "garbage").is_err());
        assert!(client.verify_webhook_signature("body", "t=123").is_err());
    }

    #[test]
    fn test_parse_webhook_event() {
        let client = StripeClient::new(test_config());
        let body = r#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": "pi_123",
                    "amount": 6597,
                    "currency": "usd",
                    "status": "succeeded",
                    "metadata": {"invoice_id": "inv-1", "user_id": "user-1"},
                    "last_payment_error": null
                }
            }
        }"#;

        let event = client.parse_webhook_event(body).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object.id, "pi_123");
        assert_eq!(event.data.object.amount, 6597);
        assert_eq!(
            event.data.object.metadata.get("invoice_id").map(String::as_str),
            Some("inv-1")
        );
    }
}
