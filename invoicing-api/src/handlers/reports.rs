use anyhow::anyhow;
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Duration, Utc};
use invoicing_core::{error::AppError, validation::ValidatedJson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use validator::Validate;

use crate::{
    AppState,
    middleware::AuthUser,
    services::reports::{
        self, ClientPerformance, DashboardSummary, MonthlyBreakdown, MonthlyRevenue, TopClient,
    },
};

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub summary: DashboardSummary,
    pub status_counts: HashMap<String, usize>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub top_clients: Vec<TopClient>,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RevenueReportResponse {
    pub start_date: String,
    pub end_date: String,
    pub months: Vec<MonthlyBreakdown>,
}

#[derive(Debug, Deserialize)]
pub struct ClientReportParams {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClientReportResponse {
    pub days: i64,
    pub clients: Vec<ClientPerformance>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExportRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub report_type: String,
    #[serde(default = "default_format")]
    pub format: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub report_type: String,
    pub format: String,
    pub report_data: Value,
}

fn window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, default_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = end.unwrap_or_else(Utc::now);
    let start = start.unwrap_or(end - Duration::days(default_days));
    (start, end)
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let days = params.days.unwrap_or(30);
    let end = Utc::now();
    let start = end - Duration::days(days);

    let invoices = state.invoices.list_in_range(&claims.sub, start, end).await?;
    let payments = state.payments.list_in_range(&claims.sub, start, end).await?;
    let clients = state.clients.list_active_for_user(&claims.sub).await?;

    Ok(Json(DashboardResponse {
        summary: reports::dashboard_summary(&invoices, &payments, days),
        status_counts: reports::status_counts(&invoices),
        monthly_revenue: reports::monthly_revenue(&invoices),
        top_clients: reports::top_clients(&invoices, &clients),
    }))
}

pub async fn revenue_report(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<RangeParams>,
) -> Result<Json<RevenueReportResponse>, AppError> {
    let (start, end) = window(params.start_date, params.end_date, 365);

    let invoices = state.invoices.list_in_range(&claims.sub, start, end).await?;

    Ok(Json(RevenueReportResponse {
        start_date: start.to_rfc3339(),
        end_date: end.to_rfc3339(),
        months: reports::monthly_breakdown(&invoices),
    }))
}

pub async fn client_report(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<ClientReportParams>,
) -> Result<Json<ClientReportResponse>, AppError> {
    let days = params.days.unwrap_or(365);
    let end = Utc::now();
    let start = end - Duration::days(days);

    let invoices = state.invoices.list_in_range(&claims.sub, start, end).await?;
    let clients = state.clients.list_active_for_user(&claims.sub).await?;

    Ok(Json(ClientReportResponse {
        days,
        clients: reports::client_performance(&invoices, &clients),
    }))
}

pub async fn export_report(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<ExportRequest>,
) -> Result<Json<ExportResponse>, AppError> {
    let (start, end) = window(body.start_date, body.end_date, 365);

    let invoices = state.invoices.list_in_range(&claims.sub, start, end).await?;

    let report_data = match body.report_type.as_str() {
        "revenue" => json!(reports::monthly_breakdown(&invoices)),
        "clients" => {
            let clients = state.clients.list_active_for_user(&claims.sub).await?;
            json!(reports::client_performance(&invoices, &clients))
        }
        "invoices" => {
            let rows: Vec<Value> = invoices
                .iter()
                .map(|i| {
                    json!({
                        "invoice_number": i.invoice_number,
                        "client_id": i.client_id,
                        "issue_date": i.issue_date.to_rfc3339(),
                        "due_date": i.due_date.to_rfc3339(),
                        "status": i.status.to_string(),
                        "currency": i.currency,
                        "total_amount": i.total_amount,
                        "paid_amount": i.paid_amount,
                        "balance_due": i.balance_due,
                    })
                })
                .collect();
            json!(rows)
        }
        other => {
            return Err(AppError::BadRequest(anyhow!(
                "Invalid report type: {}",
                other
            )));
        }
    };

    Ok(Json(ExportResponse {
        report_type: body.report_type,
        format: body.format,
        report_data,
    }))
}
