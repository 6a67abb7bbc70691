//! PayPal payment provider client.
//!
//! Implements the Orders v2 API for checkout and webhook verification
//! through PayPal's verify-webhook-signature endpoint.

use anyhow::{Result, anyhow};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use crate::config::PaypalConfig;

#[derive(Clone)]
pub struct PaypalClient {
    client: Client,
    config: PaypalConfig,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Response from order creation.
#[derive(Debug, Deserialize)]
pub struct PaypalOrder {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<OrderLink>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLink {
    pub href: String,
    pub rel: String,
}

impl PaypalOrder {
    /// The redirect URL the payer approves the order at.
    pub fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href.as_str())
    }
}

/// Headers PayPal attaches to webhook deliveries, needed for verification.
#[derive(Debug)]
pub struct WebhookHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub transmission_sig: String,
    pub cert_url: String,
    pub auth_algo: String,
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    verification_status: String,
}

/// PayPal webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    pub resource: WebhookResource,
}

/// Capture resource carried by payment webhooks. `custom_id` round-trips
/// the invoice id set at order creation.
#[derive(Debug, Deserialize)]
pub struct WebhookResource {
    pub id: String,
    pub status: Option<String>,
    pub custom_id: Option<String>,
    pub amount: Option<ResourceAmount>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceAmount {
    pub currency_code: String,
    pub value: String,
}

impl PaypalClient {
    pub fn new(config: PaypalConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if PayPal is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty() && !self.config.client_secret.expose_secret().is_empty()
    }

    async fn get_access_token(&self) -> Result<String> {
        let url = format!("{}/v1/oauth2/token", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, "PayPal token request failed");
            return Err(anyhow!("PayPal token request failed: {}", status));
        }

        let token: AccessTokenResponse = serde_json::from_str(&body)?;
        Ok(token.access_token)
    }

    /// Create an order that captures the given amount.
    ///
    /// `invoice_id` travels as the purchase unit's `custom_id` so webhook
    /// captures can be matched back to the invoice.
    pub async fn create_order(
        &self,
        amount: &str,
        currency: &str,
        invoice_id: &str,
        description: &str,
        frontend_url: &str,
    ) -> Result<PaypalOrder> {
        if !self.is_configured() {
            return Err(anyhow!("PayPal credentials not configured"));
        }

        let token = self.get_access_token().await?;

        let payload = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": currency,
                    "value": amount,
                },
                "custom_id": invoice_id,
                "description": description,
            }],
            "application_context": {
                "return_url": format!("{}/payment/success", frontend_url),
                "cancel_url": format!("{}/payment/cancel", frontend_url),
            }
        });

        let url = format!("{}/v2/checkout/orders", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "PayPal create_order response");

        if status.is_success() {
            let order: PaypalOrder = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order.id,
                status = %order.status,
                "PayPal order created"
            );
            Ok(order)
        } else {
            tracing::error!(status = %status, body = %body, "PayPal order creation failed");
            Err(anyhow!("PayPal error: {}", body))
        }
    }

    /// Verify a webhook delivery through PayPal's verification API.
    pub async fn verify_webhook_signature(
        &self,
        headers: &WebhookHeaders,
        body: &str,
    ) -> Result<bool> {
        if !self.is_configured() {
            return Err(anyhow!("PayPal credentials not configured"));
        }

        let token = self.get_access_token().await?;

        let event: serde_json::Value = serde_json::from_str(body)?;
        let payload = json!({
            "transmission_id": headers.transmission_id,
            "transmission_time": headers.transmission_time,
            "transmission_sig": headers.transmission_sig,
            "cert_url": headers.cert_url,
            "auth_algo": headers.auth_algo,
            "webhook_id": self.config.webhook_id,
            "webhook_event": event,
        });

        let url = format!(
            "{}/v1/notifications/verify-webhook-signature",
            self.config.api_base
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, "PayPal webhook verification request failed");
            return Err(anyhow!("PayPal webhook verification failed: {}", status));
        }

        let verification: VerificationResponse = serde_json::from_str(&body)?;
        let is_valid = verification.verification_status == "SUCCESS";
        if !is_valid {
            tracing::warn!(
                status = %verification.verification_status,
                "PayPal webhook signature verification failed"
            );
        }

        Ok(is_valid)
    }

    /// Parse webhook event from request body.
    pub fn parse_webhook_event(&self, body: &str) -> Result<WebhookEvent> {
        let event: WebhookEvent = serde_json::from_str(body)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> PaypalConfig {
        PaypalConfig {
            client_id: "client_123".to_string(),
            client_secret: Secret::new("secret_456".to_string()),
            webhook_id: "wh_789".to_string(),
            api_base: "https://api-m.sandbox.paypal.com".to_string(),
        }
    }

    #[test]
    fn test_is_configured() {
        let client = PaypalClient::new(test_config());
        assert!(client.is_configured());

        let empty_config = PaypalConfig {
            client_id: "".to_string(),
            client_secret: Secret::new("".to_string()),
            webhook_id: "".to_string(),
            api_base: "".to_string(),
        };
        let client = PaypalClient::new(empty_config);
        assert!(!client.is_configured());
    }

    #[test]
    fn test_approval_url_picks_approve_link() {
        let order = PaypalOrder {
            id: "ORDER-1".to_string(),
            status: "CREATED".to_string(),
            links: vec![
                OrderLink {
                    href: "https://api.paypal.com/v2/checkout/orders/ORDER-1".to_string(),
                    rel: "self".to_string(),
                },
                OrderLink {
                    href: "https://www.paypal.com/checkoutnow?token=ORDER-1".to_string(),
                    rel: "approve".to_string(),
                },
            ],
        };

        assert_eq!(
            order.approval_url(),
            Some("https://www.paypal.com/checkoutnow?token=ORDER-1")
        );
    }

    #[test]
    fn test_approval_url_missing() {
        let order = PaypalOrder {
            id: "ORDER-1".to_string(),
            status: "CREATED".to_string(),
            links: vec![],
        };
        assert_eq!(order.approval_url(), None);
    }

    #[test]
    fn test_parse_capture_event() {
        let client = PaypalClient::new(test_config());
        let body = r#"{
            "id": "WH-1",
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "CAP-1",
                "status": "COMPLETED",
                "custom_id": "inv-1",
                "amount": {"currency_code": "USD", "value": "65.97"}
            }
        }"#;

        let event = client.parse_webhook_event(body).unwrap();
        assert_eq!(event.event_type, "PAYMENT.CAPTURE.COMPLETED");
        assert_eq!(event.resource.custom_id.as_deref(), Some("inv-1"));
        assert_eq!(event.resource.amount.as_ref().unwrap().value, "65.97");
    }
}
