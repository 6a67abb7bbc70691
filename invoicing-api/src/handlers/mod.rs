pub mod auth;
pub mod clients;
pub mod invoices;
pub mod languages;
pub mod notifications;
pub mod payments;
pub mod reports;
pub mod webhooks;

use axum::Json;
use serde_json::{Value, json};

use crate::services::metrics;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "invoicing-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics_endpoint() -> String {
    metrics::get_metrics()
}
