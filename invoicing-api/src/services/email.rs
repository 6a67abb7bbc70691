use std::time::Duration;

use invoicing_core::error::AppError;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;

use crate::config::SmtpConfig;
use crate::models::{Client, Invoice, User};

#[derive(Clone)]
pub struct EmailService {
    mailer: Option<SmtpTransport>,
    from: String,
}

/// Renders the invoice delivery email. Returns (subject, html body).
pub fn render_invoice_email(user: &User, client: &Client, invoice: &Invoice) -> (String, String) {
    let company = if user.company_name.is_empty() {
        format!("{} {}", user.first_name, user.last_name)
    } else {
        user.company_name.clone()
    };

    let subject = format!("Invoice #{} from {}", invoice.invoice_number, company);

    let html = format!(
        r###"<html>
    <body style="font-family: Arial, sans-serif; color: #333;">
        <h2>{company}</h2>
        <p>Dear {contact},</p>
        <p>Please find attached invoice <strong>#{number}</strong>.</p>
        <table style="border-collapse: collapse; margin: 16px 0;">
            <tr><td style="padding: 4px 12px 4px 0;">Invoice number</td><td><strong>{number}</strong></td></tr>
            <tr><td style="padding: 4px 12px 4px 0;">Due date</td><td>{due}</td></tr>
            <tr><td style="padding: 4px 12px 4px 0;">Amount due</td><td><strong>{currency} {total:.2}</strong></td></tr>
        </table>
        <p>Thank you for your business.</p>
        <p style="color: #666; font-size: 12px;">{company}</p>
    </body>
</html>
"###,
        company = company,
        contact = if client.contact_person.is_empty() {
            &client.company_name
        } else {
            &client.contact_person
        },
        number = invoice.invoice_number,
        due = invoice.due_date.format("%B %d, %Y"),
        currency = invoice.currency,
        total = invoice.total_amount,
    );

    (subject, html)
}

impl EmailService {
    /// Builds the SMTP transport. When delivery is disabled in config, the
    /// service is constructed without a mailer and sends become no-ops.
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from = format!("{} <{}>", config.from_name, config.from_email);

        if !config.enabled {
            tracing::info!("Email delivery disabled, invoices will not be mailed");
            return Ok(Self { mailer: None, from });
        }

        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let mailer = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer: Some(mailer),
            from,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Sends the invoice to the client with the rendered PDF attached.
    /// Returns false when delivery is disabled.
    pub async fn send_invoice_email(
        &self,
        user: &User,
        client: &Client,
        invoice: &Invoice,
        pdf: Vec<u8>,
    ) -> Result<bool, AppError> {
        let Some(mailer) = &self.mailer else {
            tracing::debug!(
                invoice_number = %invoice.invoice_number,
                "Email delivery disabled, skipping send"
            );
            return Ok(false);
        };

        let (subject, html) = render_invoice_email(user, client, invoice);

        let attachment = Attachment::new(format!("invoice_{}.pdf", invoice.invoice_number)).body(
            pdf,
            ContentType::parse("application/pdf")
                .map_err(|e| AppError::EmailError(e.to_string()))?,
        );

        let email = Message::builder()
            .from(self
                .from
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .to(client
                .email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .subject(&subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    )
                    .singlepart(attachment),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send in the blocking pool to keep the async runtime free
        let mailer = mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(
                    to = %client.email,
                    invoice_number = %invoice.invoice_number,
                    "Invoice email sent"
                );
                Ok(true)
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %client.email,
                    "Failed to send invoice email"
                );
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceItem, NewClient, NewInvoice, NewUser};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use secrecy::Secret;

    fn disabled_config() -> SmtpConfig {
        SmtpConfig {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: Secret::new(String::new()),
            from_email: "billing@acme.example".to_string(),
            from_name: "Acme Billing".to_string(),
        }
    }

    fn sample_user() -> User {
        User::new(NewUser {
            username: "jo".to_string(),
            email: "jo@acme.example".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Doe".to_string(),
            company_name: "Acme Consulting".to_string(),
            company_address: String::new(),
            company_phone: String::new(),
            company_website: String::new(),
            default_currency: "USD".to_string(),
            default_tax_rate: Decimal::ZERO,
            invoice_prefix: "INV".to_string(),
        })
    }

    fn sample_client() -> Client {
        Client::new(NewClient {
            user_id: "user-1".to_string(),
            company_name: "Globex".to_string(),
            contact_person: "Hank Scorpio".to_string(),
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
            invoice_number: "INV-0007".to_string(),
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            due_date: Utc::now(),
            currency: "USD".to_string(),
            items: vec![InvoiceItem {
                description: "Consulting".to_string(),
                quantity: dec!(1),
                unit_price: dec!(500),
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
    fn subject_carries_number_and_company() {
        let (subject, _) = render_invoice_email(&sample_user(), &sample_client(), &sample_invoice());
        assert_eq!(subject, "Invoice #INV-0007 from Acme Consulting");
    }

    #[test]
    fn body_addresses_contact_and_shows_total() {
        let (_, html) = render_invoice_email(&sample_user(), &sample_client(), &sample_invoice());
        assert!(html.contains("Hank Scorpio"));
        assert!(html.contains("INV-0007"));
        assert!(html.contains("USD 500.00"));
    }

    #[tokio::test]
    async fn disabled_service_skips_delivery() {
        let service = EmailService::new(&disabled_config()).unwrap();
        assert!(!service.is_enabled());

        let sent = service
            .send_invoice_email(&sample_user(), &sample_client(), &sample_invoice(), vec![])
            .await
            .unwrap();
        assert!(!sent);
    }
}
