//! In-app notifications and the realtime fan-out behind the SSE stream.

use std::collections::HashMap;

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use crate::models::{Client, Invoice, Notification, NotificationType, Payment};

use super::repository::NotificationRepository;

/// Broadcast channel connecting notification writers to SSE subscribers.
/// Every subscriber sees every event and filters on `user_id`.
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        // Send only fails when no stream is connected
        let _ = self.sender.send(notification);
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum InvoiceEvent {
    Created,
    Sent,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Copy)]
pub enum PaymentEvent {
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy)]
pub enum ClientEvent {
    Created,
    Updated,
}

pub fn invoice_template(
    event: InvoiceEvent,
    invoice: &Invoice,
    client: &Client,
) -> (String, String, NotificationType) {
    match event {
        InvoiceEvent::Created => (
            "New Invoice Created".to_string(),
            format!("Invoice #{} has been created", invoice.invoice_number),
            NotificationType::Success,
        ),
        InvoiceEvent::Sent => (
            "Invoice Sent".to_string(),
            format!(
                "Invoice #{} has been sent to {}",
                invoice.invoice_number, client.company_name
            ),
            NotificationType::Info,
        ),
        InvoiceEvent::Paid => (
            "Payment Received".to_string(),
            format!("Payment received for invoice #{}", invoice.invoice_number),
            NotificationType::Success,
        ),
        InvoiceEvent::Overdue => (
            "Invoice Overdue".to_string(),
            format!("Invoice #{} is past its due date", invoice.invoice_number),
            NotificationType::Warning,
        ),
    }
}

pub fn payment_template(
    event: PaymentEvent,
    invoice_number: &str,
    currency: &str,
    amount: Decimal,
) -> (String, String, NotificationType) {
    match event {
        PaymentEvent::Completed => (
            "Payment Completed".to_string(),
            format!("Payment of {} {:.2} received", currency, amount),
            NotificationType::Success,
        ),
        PaymentEvent::Failed => (
            "Payment Failed".to_string(),
            format!("Payment attempt failed for invoice #{}", invoice_number),
            NotificationType::Error,
        ),
        PaymentEvent::Refunded => (
            "Payment Refunded".to_string(),
            format!("Payment refunded for invoice #{}", invoice_number),
            NotificationType::Info,
        ),
    }
}

pub fn client_template(event: ClientEvent, client: &Client) -> (String, String, NotificationType) {
    match event {
        ClientEvent::Created => (
            "New Client Added".to_string(),
            format!("Client {} has been added", client.company_name),
            NotificationType::Info,
        ),
        ClientEvent::Updated => (
            "Client Updated".to_string(),
            format!(
                "Client {} information has been updated",
                client.company_name
            ),
            NotificationType::Info,
        ),
    }
}

/// Persists notifications and pushes them to connected streams.
#[derive(Clone)]
pub struct NotificationService {
    repository: NotificationRepository,
    hub: NotificationHub,
}

impl NotificationService {
    pub fn new(repository: NotificationRepository, hub: NotificationHub) -> Self {
        Self { repository, hub }
    }

    async fn notify(
        &self,
        user_id: &str,
        title: String,
        message: String,
        notification_type: NotificationType,
        data: HashMap<String, String>,
    ) -> Result<()> {
        let notification =
            Notification::new(user_id.to_string(), title, message, notification_type, data);
        self.repository.create(notification.clone()).await?;
        self.hub.publish(notification);
        Ok(())
    }

    pub async fn invoice_event(
        &self,
        event: InvoiceEvent,
        invoice: &Invoice,
        client: &Client,
    ) -> Result<()> {
        let (title, message, notification_type) = invoice_template(event, invoice, client);
        let action = match event {
            InvoiceEvent::Created => "created",
            InvoiceEvent::Sent => "sent",
            InvoiceEvent::Paid => "paid",
            InvoiceEvent::Overdue => "overdue",
        };
        let data = HashMap::from([
            ("invoice_id".to_string(), invoice.id.clone()),
            ("action".to_string(), action.to_string()),
        ]);
        self.notify(&invoice.user_id, title, message, notification_type, data)
            .await
    }

    pub async fn payment_event(
        &self,
        event: PaymentEvent,
        payment: &Payment,
        invoice_number: &str,
    ) -> Result<()> {
        let (title, message, notification_type) =
            payment_template(event, invoice_number, &payment.currency, payment.amount);
        let action = match event {
            PaymentEvent::Completed => "completed",
            PaymentEvent::Failed => "failed",
            PaymentEvent::Refunded => "refunded",
        };
        let data = HashMap::from([
            ("payment_id".to_string(), payment.id.clone()),
            ("invoice_id".to_string(), payment.invoice_id.clone()),
            ("action".to_string(), action.to_string()),
        ]);
        self.notify(&payment.user_id, title, message, notification_type, data)
            .await
    }

    pub async fn client_event(&self, event: ClientEvent, client: &Client) -> Result<()> {
        let (title, message, notification_type) = client_template(event, client);
        let action = match event {
            ClientEvent::Created => "created",
            ClientEvent::Updated => "updated",
        };
        let data = HashMap::from([
            ("client_id".to_string(), client.id.clone()),
            ("action".to_string(), action.to_string()),
        ]);
        self.notify(&client.user_id, title, message, notification_type, data)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceItem, NewClient, NewInvoice};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_client() -> Client {
        Client::new(NewClient {
            user_id: "user-1".to_string(),
            company_name: "Globex".to_string(),
            contact_person: String::new(),
            email: "ap@globex.example".to_string(),
            phone: String::new(),
            billing_address: "1 Volcano Way".to_string(),
            billing_city: "Cypress Creek".to_string(),
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

    fn sample_invoice() -> Invoice {
        Invoice::new(NewInvoice {
            invoice_number: "INV-0003".to_string(),
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            due_date: Utc::now(),
            currency: "USD".to_string(),
            items: vec![InvoiceItem {
                description: "Consulting".to_string(),
                quantity: dec!(1),
                unit_price: dec!(100),
                tax_rate: Decimal::ZERO,
                discount_rate: Decimal::ZERO,
            }],
            notes: String::new(),
            terms_conditions: String::new(),
            shipping_fee: Decimal::ZERO,
            handling_fee: Decimal::ZERO,
        })
    }

    #[test]
    fn invoice_sent_names_the_client() {
        let (title, message, notification_type) = invoice_template(
            InvoiceEvent::Sent,
            &sample_invoice(),
            &sample_client(),
        );
        assert_eq!(title, "Invoice Sent");
        assert_eq!(message, "Invoice #INV-0003 has been sent to Globex");
        assert_eq!(notification_type, NotificationType::Info);
    }

    #[test]
    fn payment_completed_formats_amount() {
        let (title, message, notification_type) =
            payment_template(PaymentEvent::Completed, "INV-0003", "USD", dec!(65.97));
        assert_eq!(title, "Payment Completed");
        assert_eq!(message, "Payment of USD 65.97 received");
        assert_eq!(notification_type, NotificationType::Success);
    }

    #[test]
    fn payment_failed_is_an_error() {
        let (title, message, notification_type) =
            payment_template(PaymentEvent::Failed, "INV-0003", "USD", dec!(10));
        assert_eq!(title, "Payment Failed");
        assert_eq!(message, "Payment attempt failed for invoice #INV-0003");
        assert_eq!(notification_type, NotificationType::Error);
    }

    #[test]
    fn client_templates_carry_company_name() {
        let client = sample_client();
        let (title, message, _) = client_template(ClientEvent::Created, &client);
        assert_eq!(title, "New Client Added");
        assert_eq!(message, "Client Globex has been added");

        let (title, message, _) = client_template(ClientEvent::Updated, &client);
        assert_eq!(title, "Client Updated");
        assert_eq!(message, "Client Globex information has been updated");
    }

    #[tokio::test]
    async fn hub_delivers_to_subscribers() {
        let hub = NotificationHub::new(8);
        let mut rx = hub.subscribe();

        let notification = Notification::new(
            "user-1".to_string(),
            "New Invoice Created".to_string(),
            "Invoice #INV-0001 has been created".to_string(),
            NotificationType::Success,
            HashMap::new(),
        );
        hub.publish(notification.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, notification.id);
        assert_eq!(received.user_id, "user-1");
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let hub = NotificationHub::new(8);
        hub.publish(Notification::new(
            "user-1".to_string(),
            "t".to_string(),
            "m".to_string(),
            NotificationType::Info,
            HashMap::new(),
        ));
    }
}
