use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{
    Client, Invoice, InvoiceItem, Notification, NotificationType, Payment, User,
    invoice::InvoiceStatus, payment::PaymentStatus, user::Role,
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    10
}

impl PaginationParams {
    /// Page size clamped to a sane range; 0 and oversized values are
    /// query-string input, not trusted.
    fn capped_per_page(&self) -> u64 {
        self.per_page.clamp(1, 100)
    }

    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.capped_per_page())
    }

    pub fn limit(&self) -> i64 {
        self.capped_per_page() as i64
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(params: &PaginationParams, total: u64) -> Self {
        let per_page = params.capped_per_page();
        Self {
            page: params.page,
            per_page,
            total,
            pages: total.div_ceil(per_page),
        }
    }
}

/// User representation without credentials.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub company_address: String,
    pub company_phone: String,
    pub company_website: String,
    pub company_logo: String,
    pub default_currency: String,
    pub default_tax_rate: Decimal,
    pub invoice_prefix: String,
    pub next_invoice_number: i64,
    pub stripe_enabled: bool,
    pub paypal_enabled: bool,
    pub preferred_language: String,
    pub timezone: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            company_name: user.company_name,
            role: user.role,
            is_active: user.is_active,
            is_verified: user.is_verified,
            company_address: user.company_address,
            company_phone: user.company_phone,
            company_website: user.company_website,
            company_logo: user.company_logo,
            default_currency: user.default_currency,
            default_tax_rate: user.default_tax_rate,
            invoice_prefix: user.invoice_prefix,
            next_invoice_number: user.next_invoice_number,
            stripe_enabled: user.stripe_enabled,
            paypal_enabled: user.paypal_enabled,
            preferred_language: user.preferred_language,
            timezone: user.timezone,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub billing_address: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_zip_code: String,
    pub billing_country: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip_code: String,
    pub shipping_country: String,
    pub tax_id: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            user_id: client.user_id,
            company_name: client.company_name,
            contact_person: client.contact_person,
            email: client.email,
            phone: client.phone,
            billing_address: client.billing_address,
            billing_city: client.billing_city,
            billing_state: client.billing_state,
            billing_zip_code: client.billing_zip_code,
            billing_country: client.billing_country,
            shipping_address: client.shipping_address,
            shipping_city: client.shipping_city,
            shipping_state: client.shipping_state,
            shipping_zip_code: client.shipping_zip_code,
            shipping_country: client.shipping_country,
            tax_id: client.tax_id,
            notes: client.notes,
            tags: client.tags,
            is_active: client.is_active,
            created_at: client.created_at.to_rfc3339(),
            updated_at: client.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceItemResponse {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub discount_rate: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl From<&InvoiceItem> for InvoiceItemResponse {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            subtotal: item.subtotal(),
            discount_amount: item.discount_amount(),
            tax_amount: item.tax_amount(),
            total: item.total(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
            discount_rate: item.discount_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub invoice_number: String,
    pub user_id: String,
    pub client_id: String,
    pub issue_date: String,
    pub due_date: String,
    pub sent_date: Option<String>,
    pub paid_date: Option<String>,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,
    pub items: Vec<InvoiceItemResponse>,
    pub shipping_fee: Decimal,
    pub handling_fee: Decimal,
    pub notes: String,
    pub terms_conditions: String,
    pub payment_method: String,
    pub payment_reference: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientResponse>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            items: invoice.items.iter().map(InvoiceItemResponse::from).collect(),
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            user_id: invoice.user_id,
            client_id: invoice.client_id,
            issue_date: invoice.issue_date.to_rfc3339(),
            due_date: invoice.due_date.to_rfc3339(),
            sent_date: invoice.sent_date.map(|d| d.to_rfc3339()),
            paid_date: invoice.paid_date.map(|d| d.to_rfc3339()),
            status: invoice.status,
            currency: invoice.currency,
            subtotal: invoice.subtotal,
            tax_total: invoice.tax_total,
            discount_total: invoice.discount_total,
            total_amount: invoice.total_amount,
            paid_amount: invoice.paid_amount,
            balance_due: invoice.balance_due,
            shipping_fee: invoice.shipping_fee,
            handling_fee: invoice.handling_fee,
            notes: invoice.notes,
            terms_conditions: invoice.terms_conditions,
            payment_method: invoice.payment_method,
            payment_reference: invoice.payment_reference,
            created_at: invoice.created_at.to_rfc3339(),
            updated_at: invoice.updated_at.to_rfc3339(),
            client: None,
        }
    }
}

impl InvoiceResponse {
    pub fn with_client(invoice: Invoice, client: Option<Client>) -> Self {
        let mut response = Self::from(invoice);
        response.client = client.map(ClientResponse::from);
        response
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub payment_id: String,
    pub invoice_id: String,
    pub user_id: String,
    pub client_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_payment_id: String,
    pub provider_transaction_id: String,
    pub created_at: String,
    pub processed_at: Option<String>,
    pub completed_at: Option<String>,
    pub description: String,
    pub error_message: Option<String>,
    pub refunded_amount: Decimal,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            payment_id: payment.payment_id,
            invoice_id: payment.invoice_id,
            user_id: payment.user_id,
            client_id: payment.client_id,
            amount: payment.amount,
            currency: payment.currency,
            payment_method: payment.payment_method,
            status: payment.status,
            provider: payment.provider,
            provider_payment_id: payment.provider_payment_id,
            provider_transaction_id: payment.provider_transaction_id,
            created_at: payment.created_at.to_rfc3339(),
            processed_at: payment.processed_at.map(|d| d.to_rfc3339()),
            completed_at: payment.completed_at.map(|d| d.to_rfc3339()),
            description: payment.description,
            error_message: payment.error_message,
            refunded_amount: payment.refunded_amount,
            refund_reason: payment.refund_reason,
            refunded_at: payment.refunded_at.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub data: HashMap<String, String>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            title: n.title,
            message: n.message,
            notification_type: n.notification_type,
            data: n.data,
            is_read: n.is_read,
            read_at: n.read_at.map(|d| d.to_rfc3339()),
            created_at: n.created_at.to_rfc3339(),
            updated_at: n.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_page_count_rounds_up() {
        let params = PaginationParams {
            page: 1,
            per_page: 10,
        };
        let pagination = Pagination::new(&params, 21);
        assert_eq!(pagination.pages, 3);

        let pagination = Pagination::new(&params, 20);
        assert_eq!(pagination.pages, 2);

        let pagination = Pagination::new(&params, 0);
        assert_eq!(pagination.pages, 0);
    }

    #[test]
    fn skip_is_zero_based() {
        let params = PaginationParams {
            page: 3,
            per_page: 25,
        };
        assert_eq!(params.skip(), 50);
        assert_eq!(params.limit(), 25);
    }

    #[test]
    fn per_page_is_clamped_to_sane_bounds() {
        let params = PaginationParams {
            page: 1,
            per_page: 0,
        };
        assert_eq!(params.limit(), 1);
        assert_eq!(params.skip(), 0);
        assert_eq!(Pagination::new(&params, 5).per_page, 1);

        let params = PaginationParams {
            page: 2,
            per_page: 1000,
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.skip(), 100);
    }

    #[test]
    fn absurd_page_numbers_do_not_overflow() {
        let params = PaginationParams {
            page: u64::MAX,
            per_page: 1000,
        };
        assert_eq!(params.skip(), u64::MAX);
    }
}
