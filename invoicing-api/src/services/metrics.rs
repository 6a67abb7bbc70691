use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Metrics
pub static INVOICES_CREATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static INVOICES_SENT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static WEBHOOK_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    let registry = Registry::new();

    let invoices_created = match IntCounterVec::new(
        Opts::new("invoices_created_total", "Total number of invoices created"),
        &["currency"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create invoices_created_total metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    let invoices_sent = match IntCounterVec::new(
        Opts::new("invoices_sent_total", "Total number of invoices sent"),
        &["emailed"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create invoices_sent_total metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    let payments = match IntCounterVec::new(
        Opts::new("payments_total", "Total number of payment status changes"),
        &["provider", "status"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create payments_total metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    let webhook_events = match IntCounterVec::new(
        Opts::new("webhook_events_total", "Total number of webhook deliveries"),
        &["provider", "outcome"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create webhook_events_total metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    for collector in [
        Box::new(invoices_created.clone()),
        Box::new(invoices_sent.clone()),
        Box::new(payments.clone()),
        Box::new(webhook_events.clone()),
    ] {
        if let Err(e) = registry.register(collector) {
            tracing::error!("Failed to register metrics collector: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    }

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = INVOICES_CREATED_TOTAL.set(invoices_created);
    let _ = INVOICES_SENT_TOTAL.set(invoices_sent);
    let _ = PAYMENTS_TOTAL.set(payments);
    let _ = WEBHOOK_EVENTS_TOTAL.set(webhook_events);
}

pub fn record_invoice_created(currency: &str) {
    if let Some(metric) = INVOICES_CREATED_TOTAL.get() {
        metric.with_label_values(&[currency]).inc();
    }
}

pub fn record_invoice_sent(emailed: bool) {
    if let Some(metric) = INVOICES_SENT_TOTAL.get() {
        metric
            .with_label_values(&[if emailed { "true" } else { "false" }])
            .inc();
    }
}

pub fn record_payment(provider: &str, status: &str) {
    if let Some(metric) = PAYMENTS_TOTAL.get() {
        metric.with_label_values(&[provider, status]).inc();
    }
}

pub fn record_webhook_event(provider: &str, outcome: &str) {
    if let Some(metric) = WEBHOOK_EVENTS_TOTAL.get() {
        metric.with_label_values(&[provider, outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to convert metrics to UTF-8: {}", e);
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}
