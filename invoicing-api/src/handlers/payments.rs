use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
};
use invoicing_core::{error::AppError, validation::ValidatedJson};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    AppState,
    dtos::PaymentResponse,
    middleware::AuthUser,
    services::{PaymentEvent, metrics},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIntentRequest {
    #[validate(length(min = 1))]
    pub invoice_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1))]
    pub invoice_id: String,
    /// Defaults to the invoice's outstanding balance.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub approval_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    /// Defaults to the full payment amount.
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
}

fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| AppError::BadRequest(anyhow!("Amount out of range")))
}

pub async fn create_stripe_intent(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    if body.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow!("Amount must be positive")));
    }

    let invoice = state
        .invoices
        .find_for_user(&claims.sub, &body.invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    let cents = to_minor_units(body.amount)?;
    let currency = invoice.currency.to_lowercase();
    let metadata = [
        ("invoice_id", invoice.id.as_str()),
        ("user_id", invoice.user_id.as_str()),
        ("client_id", invoice.client_id.as_str()),
    ];

    let intent = state
        .stripe
        .create_payment_intent(cents, &currency, &metadata)
        .await
        .map_err(AppError::InternalError)?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}

pub async fn create_paypal_order(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let invoice = state
        .invoices
        .find_for_user(&claims.sub, &body.invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    let amount = body.amount.unwrap_or(invoice.balance_due);
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow!("Amount must be positive")));
    }

    let description = format!("Payment for invoice {}", invoice.invoice_number);
    let order = state
        .paypal
        .create_order(
            &format!("{:.2}", amount),
            &invoice.currency,
            &invoice.id,
            &description,
            &state.config.frontend_url,
        )
        .await
        .map_err(AppError::InternalError)?;

    let approval_url = order
        .approval_url()
        .ok_or_else(|| AppError::InternalError(anyhow!("PayPal order has no approval link")))?
        .to_string();

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        approval_url,
    }))
}

pub async fn get_payment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = state
        .payments
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Payment not found")))?;

    Ok(Json(payment.into()))
}

pub async fn list_invoice_payments(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(invoice_id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    // Ownership check before listing by the raw invoice id
    state
        .invoices
        .find_for_user(&claims.sub, &invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    let payments = state.payments.list_for_invoice(&invoice_id).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

/// Records a refund against a completed payment. The invoice keeps its paid
/// status; refunds are tracked on the payment side only.
pub async fn refund_payment(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<RefundRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    let mut payment = state
        .payments
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Payment not found")))?;

    if let Some(amount) = body.amount {
        if amount <= Decimal::ZERO || amount > payment.amount {
            return Err(AppError::BadRequest(anyhow!(
                "Refund amount must be positive and not exceed the payment amount"
            )));
        }
    }

    payment
        .mark_refunded(body.amount, body.reason)
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;
    state.payments.replace(&payment).await?;

    tracing::info!(
        payment_id = %payment.id,
        refunded_amount = %payment.refunded_amount,
        "Payment refunded"
    );
    metrics::record_payment(&payment.provider, "refunded");

    let invoice_number = state
        .invoices
        .find_by_id(&payment.invoice_id)
        .await?
        .map(|i| i.invoice_number)
        .unwrap_or_default();

    if let Err(e) = state
        .notifier
        .payment_event(PaymentEvent::Refunded, &payment, &invoice_number)
        .await
    {
        tracing::warn!(error = %e, "Failed to record payment notification");
    }

    Ok(Json(payment.into()))
}
