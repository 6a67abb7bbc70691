use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Client, Invoice, InvoiceStatus, Payment, PaymentStatus};

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_invoices: usize,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub days: i64,
}

#[derive(Debug, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TopClient {
    pub client_id: String,
    pub company_name: String,
    pub total_amount: Decimal,
    pub invoice_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MonthlyBreakdown {
    pub month: String,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub invoice_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ClientPerformance {
    pub client_id: String,
    pub company_name: String,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub invoice_count: usize,
    pub average_invoice: Decimal,
}

/// Headline numbers for the dashboard window.
///
/// `total_paid` sums completed payments; `total_pending` sums the balance
/// still due on draft and sent invoices.
pub fn dashboard_summary(invoices: &[Invoice], payments: &[Payment], days: i64) -> DashboardSummary {
    let total_amount: Decimal = invoices.iter().map(|i| i.total_amount).sum();

    let total_paid: Decimal = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount)
        .sum();

    let total_pending: Decimal = invoices
        .iter()
        .filter(|i| matches!(i.status, InvoiceStatus::Draft | InvoiceStatus::Sent))
        .map(|i| i.balance_due)
        .sum();

    DashboardSummary {
        total_invoices: invoices.len(),
        total_amount,
        total_paid,
        total_pending,
        days,
    }
}

pub fn status_counts(invoices: &[Invoice]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for invoice in invoices {
        *counts.entry(invoice.status.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Invoiced totals grouped by issue month, oldest month first.
pub fn monthly_revenue(invoices: &[Invoice]) -> Vec<MonthlyRevenue> {
    let mut by_month: HashMap<String, Decimal> = HashMap::new();
    for invoice in invoices {
        let month = invoice.issue_date.format("%Y-%m").to_string();
        *by_month.entry(month).or_insert(Decimal::ZERO) += invoice.total_amount;
    }

    let mut months: Vec<MonthlyRevenue> = by_month
        .into_iter()
        .map(|(month, amount)| MonthlyRevenue { month, amount })
        .collect();
    months.sort_by(|a, b| a.month.cmp(&b.month));
    months
}

/// The five clients with the highest invoiced totals in the window.
pub fn top_clients(invoices: &[Invoice], clients: &[Client]) -> Vec<TopClient> {
    let names: HashMap<&str, &str> = clients
        .iter()
        .map(|c| (c.id.as_str(), c.company_name.as_str()))
        .collect();

    let mut totals: HashMap<&str, (Decimal, usize)> = HashMap::new();
    for invoice in invoices {
        let entry = totals
            .entry(invoice.client_id.as_str())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += invoice.total_amount;
        entry.1 += 1;
    }

    let mut ranked: Vec<TopClient> = totals
        .into_iter()
        .map(|(client_id, (total_amount, invoice_count))| TopClient {
            client_id: client_id.to_string(),
            company_name: names.get(client_id).unwrap_or(&"Unknown").to_string(),
            total_amount,
            invoice_count,
        })
        .collect();
    ranked.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    ranked.truncate(5);
    ranked
}

/// Month-by-month revenue detail. `total_paid` only counts invoices that
/// have reached the paid status.
pub fn monthly_breakdown(invoices: &[Invoice]) -> Vec<MonthlyBreakdown> {
    let mut by_month: HashMap<String, (Decimal, Decimal, usize)> = HashMap::new();
    for invoice in invoices {
        let month = invoice.issue_date.format("%Y-%m").to_string();
        let entry = by_month
            .entry(month)
            .or_insert((Decimal::ZERO, Decimal::ZERO, 0));
        entry.0 += invoice.total_amount;
        if invoice.status == InvoiceStatus::Paid {
            entry.1 += invoice.total_amount;
        }
        entry.2 += 1;
    }

    let mut months: Vec<MonthlyBreakdown> = by_month
        .into_iter()
        .map(|(month, (total_amount, total_paid, invoice_count))| MonthlyBreakdown {
            month,
            total_amount,
            total_paid,
            invoice_count,
        })
        .collect();
    months.sort_by(|a, b| a.month.cmp(&b.month));
    months
}

/// Per-client totals for active clients with at least one invoice in the
/// window, ranked by invoiced amount.
pub fn client_performance(invoices: &[Invoice], clients: &[Client]) -> Vec<ClientPerformance> {
    let mut rows: Vec<ClientPerformance> = clients
        .iter()
        .filter(|c| c.is_active)
        .filter_map(|client| {
            let owned: Vec<&Invoice> = invoices
                .iter()
                .filter(|i| i.client_id == client.id)
                .collect();
            if owned.is_empty() {
                return None;
            }

            let total_amount: Decimal = owned.iter().map(|i| i.total_amount).sum();
            let total_paid: Decimal = owned.iter().map(|i| i.paid_amount).sum();
            let count = Decimal::from(owned.len() as u64);

            Some(ClientPerformance {
                client_id: client.id.clone(),
                company_name: client.company_name.clone(),
                total_amount,
                total_paid,
                invoice_count: owned.len(),
                average_invoice: (total_amount / count).round_dp(2),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceItem, NewClient, NewInvoice};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn item(price: Decimal) -> InvoiceItem {
        InvoiceItem {
            description: "Consulting".to_string(),
            quantity: dec!(1),
            unit_price: price,
            tax_rate: Decimal::ZERO,
            discount_rate: Decimal::ZERO,
        }
    }

    fn client(company: &str) -> Client {
        Client::new(NewClient {
            user_id: "user-1".to_string(),
            company_name: company.to_string(),
            contact_person: String::new(),
            email: format!("{}@example.com", company.to_lowercase()),
            phone: String::new(),
            billing_address: "1 Main St".to_string(),
            billing_city: "Springfield".to_string(),
            billing_state: String::new(),
            billing_zip_code: String::new(),
            billing_country: "US".to_string(),
            shipping_address: None,
            shipping_city: None,
            shipping_state: None,
            shipping_zip_code: None,
            shipping_country: None,
            tax_id: String::new(),
            notes: String::new(),
            tags: Vec::new(),
        })
    }

    fn invoice(number: &str, client_id: &str, price: Decimal) -> Invoice {
        Invoice::new(NewInvoice {
            invoice_number: number.to_string(),
            user_id: "user-1".to_string(),
            client_id: client_id.to_string(),
            due_date: Utc::now() + Duration::days(30),
            currency: "USD".to_string(),
            items: vec![item(price)],
            notes: String::new(),
            terms_conditions: String::new(),
            shipping_fee: Decimal::ZERO,
            handling_fee: Decimal::ZERO,
        })
    }

    #[test]
    fn summary_counts_pending_from_open_invoices_only() {
        let mut paid = invoice("INV-0001", "c1", dec!(100));
        paid.apply_payment(None);
        let open = invoice("INV-0002", "c1", dec!(250));

        let summary = dashboard_summary(&[paid, open], &[], 30);
        assert_eq!(summary.total_invoices, 2);
        assert_eq!(summary.total_amount, dec!(350.00));
        assert_eq!(summary.total_pending, dec!(250.00));
        assert_eq!(summary.days, 30);
    }

    #[test]
    fn empty_window_produces_empty_reports() {
        assert!(monthly_revenue(&[]).is_empty());
        assert!(monthly_breakdown(&[]).is_empty());
        assert!(top_clients(&[], &[]).is_empty());
        assert!(status_counts(&[]).is_empty());
    }

    #[test]
    fn monthly_revenue_groups_and_sorts_by_month() {
        let mut january = invoice("INV-0001", "c1", dec!(100));
        january.issue_date = "2026-01-15T00:00:00Z".parse().unwrap();
        let mut january_too = invoice("INV-0002", "c1", dec!(50));
        january_too.issue_date = "2026-01-20T00:00:00Z".parse().unwrap();
        let mut march = invoice("INV-0003", "c1", dec!(75));
        march.issue_date = "2026-03-01T00:00:00Z".parse().unwrap();

        let months = monthly_revenue(&[march, january, january_too]);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2026-01");
        assert_eq!(months[0].amount, dec!(150.00));
        assert_eq!(months[1].month, "2026-03");
    }

    #[test]
    fn top_clients_ranks_by_total_and_caps_at_five() {
        let clients: Vec<Client> = (0..7).map(|i| client(&format!("Acme{}", i))).collect();
        let invoices: Vec<Invoice> = clients
            .iter()
            .enumerate()
            .map(|(i, c)| {
                invoice(
                    &format!("INV-{:04}", i),
                    &c.id,
                    Decimal::from((i as u64 + 1) * 100),
                )
            })
            .collect();

        let top = top_clients(&invoices, &clients);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].company_name, "Acme6");
        assert_eq!(top[0].total_amount, dec!(700.00));
        assert!(top[0].total_amount > top[4].total_amount);
    }

    #[test]
    fn client_performance_skips_clients_without_invoices() {
        let with_invoices = client("Busy");
        let idle = client("Idle");
        let invoices = vec![
            invoice("INV-0001", &with_invoices.id, dec!(100)),
            invoice("INV-0002", &with_invoices.id, dec!(200)),
        ];

        let rows = client_performance(&invoices, &[with_invoices, idle]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company_name, "Busy");
        assert_eq!(rows[0].invoice_count, 2);
        assert_eq!(rows[0].average_invoice, dec!(150.00));
    }

    #[test]
    fn breakdown_paid_column_only_counts_paid_invoices() {
        let mut paid = invoice("INV-0001", "c1", dec!(100));
        paid.issue_date = "2026-02-10T00:00:00Z".parse().unwrap();
        paid.apply_payment(None);
        let mut open = invoice("INV-0002", "c1", dec!(300));
        open.issue_date = "2026-02-11T00:00:00Z".parse().unwrap();

        let months = monthly_breakdown(&[paid, open]);
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].total_amount, dec!(400.00));
        assert_eq!(months[0].total_paid, dec!(100.00));
        assert_eq!(months[0].invoice_count, 2);
    }
}
