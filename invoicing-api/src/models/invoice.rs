use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::opt_chrono_datetime_as_bson_datetime;

/// Rounds a monetary amount to two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Sent => write!(f, "sent"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Overdue => write!(f, "overdue"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InvoiceStateError {
    #[error("Cannot edit paid or cancelled invoice")]
    NotEditable,
    #[error("Cannot delete sent or paid invoice")]
    NotDeletable,
    #[error("Only draft invoices can be sent")]
    NotSendable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub discount_rate: Decimal,
}

impl InvoiceItem {
    pub fn subtotal(&self) -> Decimal {
        round_money(self.quantity * self.unit_price)
    }

    pub fn discount_amount(&self) -> Decimal {
        round_money(self.subtotal() * self.discount_rate / Decimal::ONE_HUNDRED)
    }

    pub fn tax_amount(&self) -> Decimal {
        round_money((self.subtotal() - self.discount_amount()) * self.tax_rate / Decimal::ONE_HUNDRED)
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() - self.discount_amount() + self.tax_amount()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub invoice_number: String,
    pub user_id: String,
    pub client_id: String,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_date: Option<DateTime<Utc>>,

    pub status: InvoiceStatus,

    pub currency: String,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_due: Decimal,

    pub items: Vec<InvoiceItem>,

    pub shipping_fee: Decimal,
    pub handling_fee: Decimal,

    pub notes: String,
    pub terms_conditions: String,

    pub payment_method: String,
    pub payment_reference: String,

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

pub struct NewInvoice {
    pub invoice_number: String,
    pub user_id: String,
    pub client_id: String,
    pub due_date: DateTime<Utc>,
    pub currency: String,
    pub items: Vec<InvoiceItem>,
    pub notes: String,
    pub terms_conditions: String,
    pub shipping_fee: Decimal,
    pub handling_fee: Decimal,
}

impl Invoice {
    pub fn new(fields: NewInvoice) -> Self {
        let now = Utc::now();
        let mut invoice = Self {
            id: Uuid::new_v4().to_string(),
            invoice_number: fields.invoice_number,
            user_id: fields.user_id,
            client_id: fields.client_id,
            issue_date: now,
            due_date: fields.due_date,
            sent_date: None,
            paid_date: None,
            status: InvoiceStatus::Draft,
            currency: fields.currency,
            subtotal: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            balance_due: Decimal::ZERO,
            items: fields.items,
            shipping_fee: fields.shipping_fee,
            handling_fee: fields.handling_fee,
            notes: fields.notes,
            terms_conditions: fields.terms_conditions,
            payment_method: String::new(),
            payment_reference: String::new(),
            created_at: now,
            updated_at: now,
        };
        invoice.calculate_totals();
        invoice
    }

    /// Recomputes all monetary totals from the items and fees.
    pub fn calculate_totals(&mut self) {
        self.subtotal = self.items.iter().map(|i| i.subtotal()).sum();
        self.discount_total = self.items.iter().map(|i| i.discount_amount()).sum();
        self.tax_total = self.items.iter().map(|i| i.tax_amount()).sum();

        self.total_amount = self.subtotal - self.discount_total
            + self.tax_total
            + self.shipping_fee
            + self.handling_fee;

        self.balance_due = self.total_amount - self.paid_amount;
    }

    pub fn can_edit(&self) -> bool {
        !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn can_delete(&self) -> bool {
        !matches!(
            self.status,
            InvoiceStatus::Paid | InvoiceStatus::Sent | InvoiceStatus::Overdue
        )
    }

    /// Flips a sent invoice past its due date to overdue. Returns whether
    /// the status changed, so callers know to persist.
    pub fn refresh_overdue(&mut self) -> bool {
        if self.status == InvoiceStatus::Sent && self.due_date < Utc::now() {
            self.status = InvoiceStatus::Overdue;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    pub fn mark_sent(&mut self) -> Result<(), InvoiceStateError> {
        if self.status != InvoiceStatus::Draft {
            return Err(InvoiceStateError::NotSendable);
        }
        self.status = InvoiceStatus::Sent;
        self.sent_date = Some(Utc::now());
        Ok(())
    }

    /// Applies a received payment. Sets the paid amount (possibly partial),
    /// recomputes the balance and flips the invoice to paid.
    pub fn apply_payment(&mut self, amount: Option<Decimal>) {
        self.paid_amount = amount.unwrap_or(self.total_amount);
        self.balance_due = self.total_amount - self.paid_amount;
        self.status = InvoiceStatus::Paid;
        self.paid_date = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(qty: Decimal, price: Decimal, tax: Decimal, discount: Decimal) -> InvoiceItem {
        InvoiceItem {
            description: "Consulting".to_string(),
            quantity: qty,
            unit_price: price,
            tax_rate: tax,
            discount_rate: discount,
        }
    }

    fn invoice_with_items(items: Vec<InvoiceItem>) -> Invoice {
        Invoice::new(NewInvoice {
            invoice_number: "INV-0001".to_string(),
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            due_date: Utc::now(),
            currency: "EUR".to_string(),
            items,
            notes: String::new(),
            terms_conditions: String::new(),
            shipping_fee: Decimal::ZERO,
            handling_fee: Decimal::ZERO,
        })
    }

    #[test]
    fn totals_round_half_away_from_zero() {
        // 3 x 19.99 = 59.97; 10% tax on 59.97 = 5.997 -> 6.00
        let invoice = invoice_with_items(vec![item(
            dec!(3),
            dec!(19.99),
            dec!(10),
            Decimal::ZERO,
        )]);

        assert_eq!(invoice.subtotal, dec!(59.97));
        assert_eq!(invoice.tax_total, dec!(6.00));
        assert_eq!(invoice.total_amount, dec!(65.97));
        assert_eq!(invoice.balance_due, dec!(65.97));
    }

    #[test]
    fn discount_applies_before_tax() {
        // 100 with 10% discount and 20% tax: tax on 90 -> 18, total 108
        let invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(100),
            dec!(20),
            dec!(10),
        )]);

        assert_eq!(invoice.discount_total, dec!(10.00));
        assert_eq!(invoice.tax_total, dec!(18.00));
        assert_eq!(invoice.total_amount, dec!(108.00));
    }

    #[test]
    fn fees_add_into_total() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(2),
            dec!(50),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        invoice.shipping_fee = dec!(9.50);
        invoice.handling_fee = dec!(0.50);
        invoice.calculate_totals();

        assert_eq!(invoice.total_amount, dec!(110.00));
    }

    #[test]
    fn partial_payment_leaves_balance() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(200),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        invoice.apply_payment(Some(dec!(150)));

        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.paid_amount, dec!(150));
        assert_eq!(invoice.balance_due, dec!(50));
        assert!(invoice.paid_date.is_some());
    }

    #[test]
    fn full_payment_defaults_to_total() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(80),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        invoice.apply_payment(None);

        assert_eq!(invoice.paid_amount, dec!(80));
        assert_eq!(invoice.balance_due, Decimal::ZERO);
    }

    #[test]
    fn only_draft_can_be_sent() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(10),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        assert!(invoice.mark_sent().is_ok());
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert!(invoice.mark_sent().is_err());
    }

    #[test]
    fn paid_invoice_is_not_editable_or_deletable() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(10),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        assert!(invoice.can_edit());
        assert!(invoice.can_delete());

        invoice.apply_payment(None);
        assert!(!invoice.can_edit());
        assert!(!invoice.can_delete());
    }

    #[test]
    fn sent_invoice_past_due_becomes_overdue() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(10),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        invoice.due_date = Utc::now() - chrono::Duration::days(1);

        assert!(!invoice.refresh_overdue());
        invoice.mark_sent().unwrap();
        assert!(invoice.refresh_overdue());
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
        assert!(!invoice.can_delete());

        invoice.apply_payment(None);
        assert!(!invoice.refresh_overdue());
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn sent_invoice_is_editable_but_not_deletable() {
        let mut invoice = invoice_with_items(vec![item(
            dec!(1),
            dec!(10),
            Decimal::ZERO,
            Decimal::ZERO,
        )]);
        invoice.mark_sent().unwrap();
        assert!(invoice.can_edit());
        assert!(!invoice.can_delete());
    }
}
