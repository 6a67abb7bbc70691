//! Payment provider webhook receivers.
//!
//! These endpoints are unauthenticated; trust comes from signature
//! verification against the provider's secret. Handlers look invoices up
//! without a user scope and take the owning user from the invoice itself.

use anyhow::anyhow;
use axum::{Json, extract::State, http::HeaderMap};
use invoicing_core::error::AppError;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use crate::{
    AppState,
    models::{Invoice, NewPayment, Payment},
    services::{InvoiceEvent, PaymentEvent, metrics, paypal},
};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(anyhow!("Missing {} header", name)))
}

async fn record_completed_payment(
    state: &AppState,
    mut invoice: Invoice,
    mut payment: Payment,
) -> Result<(), AppError> {
    payment
        .mark_completed()
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;
    state.payments.create(payment.clone()).await?;

    invoice.apply_payment(Some(payment.amount));
    invoice.payment_method = payment.provider.clone();
    invoice.payment_reference = payment.payment_id.clone();
    invoice.updated_at = chrono::Utc::now();
    state.invoices.replace(&invoice).await?;

    tracing::info!(
        payment_id = %payment.id,
        invoice_number = %invoice.invoice_number,
        provider = %payment.provider,
        amount = %payment.amount,
        "Payment completed via webhook"
    );
    metrics::record_payment(&payment.provider, "completed");

    if let Err(e) = state
        .notifier
        .payment_event(PaymentEvent::Completed, &payment, &invoice.invoice_number)
        .await
    {
        tracing::warn!(error = %e, "Failed to record payment notification");
    }
    if let Some(client) = state
        .clients
        .find_for_user(&invoice.user_id, &invoice.client_id)
        .await?
    {
        if let Err(e) = state
            .notifier
            .invoice_event(InvoiceEvent::Paid, &invoice, &client)
            .await
        {
            tracing::warn!(error = %e, "Failed to record invoice notification");
        }
    }

    Ok(())
}

async fn record_failed_payment(
    state: &AppState,
    invoice: &Invoice,
    mut payment: Payment,
    error_message: Option<String>,
) -> Result<(), AppError> {
    payment
        .mark_failed(error_message)
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;
    state.payments.create(payment.clone()).await?;

    tracing::warn!(
        payment_id = %payment.id,
        invoice_number = %invoice.invoice_number,
        provider = %payment.provider,
        "Payment failed via webhook"
    );
    metrics::record_payment(&payment.provider, "failed");

    if let Err(e) = state
        .notifier
        .payment_event(PaymentEvent::Failed, &payment, &invoice.invoice_number)
        .await
    {
        tracing::warn!(error = %e, "Failed to record payment notification");
    }

    Ok(())
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = header_str(&headers, "stripe-signature")?;

    let valid = state
        .stripe
        .verify_webhook_signature(&body, signature)
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;
    if !valid {
        metrics::record_webhook_event("stripe", "invalid_signature");
        return Err(AppError::BadRequest(anyhow!("Invalid webhook signature")));
    }

    let event = state
        .stripe
        .parse_webhook_event(&body)
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;

    let intent = event.data.object;
    let invoice_id = intent.metadata.get("invoice_id").cloned();

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let invoice_id =
                invoice_id.ok_or_else(|| AppError::BadRequest(anyhow!("Missing invoice_id")))?;
            let invoice = state
                .invoices
                .find_by_id(&invoice_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

            let amount = Decimal::new(intent.amount, 2);
            let payment = Payment::new(NewPayment {
                payment_id: intent.id.clone(),
                invoice_id: invoice.id.clone(),
                user_id: invoice.user_id.clone(),
                client_id: invoice.client_id.clone(),
                amount,
                currency: intent.currency.to_uppercase(),
                payment_method: "stripe".to_string(),
                provider: "stripe".to_string(),
                provider_payment_id: intent.id,
                description: format!("Payment for invoice {}", invoice.invoice_number),
            });
            record_completed_payment(&state, invoice, payment).await?;
            metrics::record_webhook_event("stripe", "processed");
        }
        "payment_intent.payment_failed" => {
            let invoice_id =
                invoice_id.ok_or_else(|| AppError::BadRequest(anyhow!("Missing invoice_id")))?;
            let invoice = state
                .invoices
                .find_by_id(&invoice_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

            let amount = Decimal::new(intent.amount, 2);
            let payment = Payment::new(NewPayment {
                payment_id: intent.id.clone(),
                invoice_id: invoice.id.clone(),
                user_id: invoice.user_id.clone(),
                client_id: invoice.client_id.clone(),
                amount,
                currency: intent.currency.to_uppercase(),
                payment_method: "stripe".to_string(),
                provider: "stripe".to_string(),
                provider_payment_id: intent.id,
                description: format!("Payment for invoice {}", invoice.invoice_number),
            });
            let error_message = intent.last_payment_error.and_then(|e| e.message);
            record_failed_payment(&state, &invoice, payment, error_message).await?;
            metrics::record_webhook_event("stripe", "processed");
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled Stripe event");
            metrics::record_webhook_event("stripe", "ignored");
        }
    }

    Ok(Json(json!({ "received": true })))
}

pub async fn paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let webhook_headers = paypal::WebhookHeaders {
        transmission_id: header_str(&headers, "paypal-transmission-id")?.to_string(),
        transmission_time: header_str(&headers, "paypal-transmission-time")?.to_string(),
        transmission_sig: header_str(&headers, "paypal-transmission-sig")?.to_string(),
        cert_url: header_str(&headers, "paypal-cert-url")?.to_string(),
        auth_algo: header_str(&headers, "paypal-auth-algo")?.to_string(),
    };

    let valid = state
        .paypal
        .verify_webhook_signature(&webhook_headers, &body)
        .await
        .map_err(AppError::InternalError)?;
    if !valid {
        metrics::record_webhook_event("paypal", "invalid_signature");
        return Err(AppError::BadRequest(anyhow!("Invalid webhook signature")));
    }

    let event = state
        .paypal
        .parse_webhook_event(&body)
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;

    match event.event_type.as_str() {
        "PAYMENT.CAPTURE.COMPLETED" | "PAYMENT.CAPTURE.DENIED" => {
            let resource = event.resource;
            let invoice_id = resource
                .custom_id
                .ok_or_else(|| AppError::BadRequest(anyhow!("Missing custom_id")))?;
            let invoice = state
                .invoices
                .find_by_id(&invoice_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

            let (amount, currency) = match resource.amount {
                Some(a) => {
                    let value: Decimal = a
                        .value
                        .parse()
                        .map_err(|_| AppError::BadRequest(anyhow!("Invalid amount")))?;
                    (value, a.currency_code)
                }
                None => (invoice.balance_due, invoice.currency.clone()),
            };

            let payment = Payment::new(NewPayment {
                payment_id: resource.id.clone(),
                invoice_id: invoice.id.clone(),
                user_id: invoice.user_id.clone(),
                client_id: invoice.client_id.clone(),
                amount,
                currency,
                payment_method: "paypal".to_string(),
                provider: "paypal".to_string(),
                provider_payment_id: resource.id,
                description: format!("Payment for invoice {}", invoice.invoice_number),
            });

            if event.event_type == "PAYMENT.CAPTURE.COMPLETED" {
                record_completed_payment(&state, invoice, payment).await?;
            } else {
                record_failed_payment(&state, &invoice, payment, resource.status).await?;
            }
            metrics::record_webhook_event("paypal", "processed");
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled PayPal event");
            metrics::record_webhook_event("paypal", "ignored");
        }
    }

    Ok(Json(json!({ "received": true })))
}
