use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use invoicing_core::{error::AppError, validation::ValidatedJson};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    AppState,
    dtos::{InvoiceResponse, MessageResponse, Pagination, PaginationParams},
    middleware::AuthUser,
    models::{Invoice, InvoiceItem, InvoiceStatus, NewInvoice},
    services::{
        InvoiceEvent, metrics, numbering,
        pdf::{invoice_pdf_filename, render_invoice_pdf},
        repository::InvoiceListFilter,
    },
};

#[derive(Debug, Deserialize)]
pub struct InvoiceListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(length(min = 1))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub discount_rate: Decimal,
}

impl From<InvoiceItemRequest> for InvoiceItem {
    fn from(item: InvoiceItemRequest) -> Self {
        Self {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
            discount_rate: item.discount_rate,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1))]
    pub client_id: String,
    pub due_date: DateTime<Utc>,
    /// Defaults to the user's configured currency.
    pub currency: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate(nested)]
    pub items: Vec<InvoiceItemRequest>,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub handling_fee: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms_conditions: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub terms_conditions: Option<String>,
    pub shipping_fee: Option<Decimal>,
    pub handling_fee: Option<Decimal>,
    #[validate(nested)]
    pub items: Option<Vec<InvoiceItemRequest>>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<InvoiceListParams>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let pagination = PaginationParams {
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(10),
    };
    let filter = InvoiceListFilter {
        status: params.status,
        client_id: params.client_id,
        start_date: params.start_date,
        end_date: params.end_date,
    };

    let (invoices, total) = state
        .invoices
        .list_for_user(&claims.sub, &filter, pagination.skip(), pagination.limit())
        .await?;

    // Each invoice embeds its client for list rendering
    let mut responses = Vec::with_capacity(invoices.len());
    for mut invoice in invoices {
        let flipped = invoice.refresh_overdue();
        if flipped {
            state.invoices.replace(&invoice).await?;
        }
        let client = state
            .clients
            .find_for_user(&claims.sub, &invoice.client_id)
            .await?;
        if flipped {
            if let Some(client) = &client {
                if let Err(e) = state
                    .notifier
                    .invoice_event(InvoiceEvent::Overdue, &invoice, client)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to record invoice notification");
                }
            }
        }
        responses.push(InvoiceResponse::with_client(invoice, client));
    }

    Ok(Json(InvoiceListResponse {
        invoices: responses,
        pagination: Pagination::new(&pagination, total),
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let mut invoice = state
        .invoices
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    let flipped = invoice.refresh_overdue();
    if flipped {
        state.invoices.replace(&invoice).await?;
    }

    let client = state
        .clients
        .find_for_user(&claims.sub, &invoice.client_id)
        .await?;

    if flipped {
        if let Some(client) = &client {
            if let Err(e) = state
                .notifier
                .invoice_event(InvoiceEvent::Overdue, &invoice, client)
                .await
            {
                tracing::warn!(error = %e, "Failed to record invoice notification");
            }
        }
    }

    Ok(Json(InvoiceResponse::with_client(invoice, client)))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<CreateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    let client = state
        .clients
        .find_for_user(&claims.sub, &body.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Client not found")))?;

    let invoice_number = numbering::allocate_invoice_number(
        &state.users,
        &state.invoices,
        &claims.sub,
        &user.invoice_prefix,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    let currency = body.currency.unwrap_or(user.default_currency);
    let invoice = Invoice::new(NewInvoice {
        invoice_number,
        user_id: claims.sub.clone(),
        client_id: client.id.clone(),
        due_date: body.due_date,
        currency,
        items: body.items.into_iter().map(InvoiceItem::from).collect(),
        notes: body.notes,
        terms_conditions: body.terms_conditions,
        shipping_fee: body.shipping_fee,
        handling_fee: body.handling_fee,
    });
    state.invoices.create(invoice.clone()).await?;

    tracing::info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        user_id = %claims.sub,
        "Invoice created"
    );
    metrics::record_invoice_created(&invoice.currency);

    if let Err(e) = state
        .notifier
        .invoice_event(InvoiceEvent::Created, &invoice, &client)
        .await
    {
        tracing::warn!(error = %e, "Failed to record invoice notification");
    }

    Ok(Json(InvoiceResponse::with_client(invoice, Some(client))))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let mut invoice = state
        .invoices
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    if !invoice.can_edit() {
        return Err(AppError::BadRequest(anyhow!(
            "Cannot edit paid or cancelled invoice"
        )));
    }

    if let Some(due_date) = body.due_date {
        invoice.due_date = due_date;
    }
    if let Some(notes) = body.notes {
        invoice.notes = notes;
    }
    if let Some(terms_conditions) = body.terms_conditions {
        invoice.terms_conditions = terms_conditions;
    }
    if let Some(shipping_fee) = body.shipping_fee {
        invoice.shipping_fee = shipping_fee;
    }
    if let Some(handling_fee) = body.handling_fee {
        invoice.handling_fee = handling_fee;
    }
    if let Some(items) = body.items {
        if items.is_empty() {
            return Err(AppError::BadRequest(anyhow!("At least one item is required")));
        }
        invoice.items = items.into_iter().map(InvoiceItem::from).collect();
    }
    invoice.calculate_totals();
    invoice.updated_at = Utc::now();

    state.invoices.replace(&invoice).await?;

    let client = state
        .clients
        .find_for_user(&claims.sub, &invoice.client_id)
        .await?;

    Ok(Json(InvoiceResponse::with_client(invoice, client)))
}

/// Emails the invoice PDF to the client and marks it sent. Delivery being
/// disabled does not block the status change.
pub async fn send_invoice(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let mut invoice = state
        .invoices
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    let client = state
        .clients
        .find_for_user(&claims.sub, &invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Client not found")))?;

    invoice
        .mark_sent()
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;
    invoice.updated_at = Utc::now();

    let pdf = render_invoice_pdf(&user, &client, &invoice)?;
    let emailed = state
        .email
        .send_invoice_email(&user, &client, &invoice, pdf)
        .await?;

    state.invoices.replace(&invoice).await?;

    tracing::info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        emailed,
        "Invoice sent"
    );
    metrics::record_invoice_sent(emailed);

    if let Err(e) = state
        .notifier
        .invoice_event(InvoiceEvent::Sent, &invoice, &client)
        .await
    {
        tracing::warn!(error = %e, "Failed to record invoice notification");
    }

    Ok(Json(InvoiceResponse::with_client(invoice, Some(client))))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let invoice = state
        .invoices
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    if !invoice.can_delete() {
        return Err(AppError::BadRequest(anyhow!(
            "Cannot delete sent or paid invoice"
        )));
    }

    state.invoices.delete(&claims.sub, &id).await?;

    tracing::info!(invoice_id = %id, user_id = %claims.sub, "Invoice deleted");

    Ok(Json(MessageResponse::new("Invoice deleted successfully")))
}

pub async fn download_invoice_pdf(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .find_for_user(&claims.sub, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    let client = state
        .clients
        .find_for_user(&claims.sub, &invoice.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Client not found")))?;

    let pdf = render_invoice_pdf(&user, &client, &invoice)?;
    let filename = invoice_pdf_filename(&invoice);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        "application/pdf"
            .parse()
            .map_err(|e| AppError::InternalError(anyhow!("{}", e)))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", filename)
            .parse()
            .map_err(|e| AppError::InternalError(anyhow!("{}", e)))?,
    );

    Ok((headers, pdf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(description: &str) -> InvoiceItemRequest {
        InvoiceItemRequest {
            description: description.to_string(),
            quantity: dec!(1),
            unit_price: dec!(100),
            tax_rate: Decimal::ZERO,
            discount_rate: Decimal::ZERO,
        }
    }

    fn request_with_items(items: Vec<InvoiceItemRequest>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            client_id: "client-1".to_string(),
            due_date: Utc::now(),
            currency: None,
            items,
            shipping_fee: Decimal::ZERO,
            handling_fee: Decimal::ZERO,
            notes: String::new(),
            terms_conditions: String::new(),
        }
    }

    #[test]
    fn create_request_requires_at_least_one_item() {
        let request = request_with_items(Vec::new());
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn create_request_rejects_blank_item_description() {
        let request = request_with_items(vec![item("")]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn create_request_with_valid_items_passes() {
        let request = request_with_items(vec![item("Consulting")]);
        assert!(request.validate().is_ok());
    }
}
