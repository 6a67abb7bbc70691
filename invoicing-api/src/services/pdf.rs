//! Invoice PDF rendering.
//!
//! Lays the invoice out on a single A4 page with the builtin Helvetica
//! fonts, writing text line by line from the top of the page.

use anyhow::{Result, anyhow};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_decimal::Decimal;

use crate::models::{Client, Invoice, User};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 6.0;

struct PdfWriter {
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PdfWriter {
    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
        self.y -= LINE_HEIGHT_MM;
    }

    fn columns(&mut self, cells: &[(f32, &str)], size: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        for (x, text) in cells {
            self.layer.use_text(*text, size, Mm(*x), Mm(self.y), font);
        }
        self.y -= LINE_HEIGHT_MM;
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Renders the invoice as PDF bytes.
pub fn render_invoice_pdf(user: &User, client: &Client, invoice: &Invoice) -> Result<Vec<u8>> {
    let title = format!("Invoice {}", invoice.invoice_number);
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("{}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("{}", e))?;

    let mut w = PdfWriter {
        layer: doc.get_page(page).get_layer(layer),
        regular,
        bold,
        y: PAGE_HEIGHT_MM - MARGIN_MM,
    };

    // Company header
    let company = if user.company_name.is_empty() {
        format!("{} {}", user.first_name, user.last_name)
    } else {
        user.company_name.clone()
    };
    w.line(&company, 16.0, true);
    if !user.company_address.is_empty() {
        w.line(&user.company_address, 9.0, false);
    }
    if !user.company_phone.is_empty() {
        w.line(&user.company_phone, 9.0, false);
    }
    if !user.company_website.is_empty() {
        w.line(&user.company_website, 9.0, false);
    }
    w.gap(6.0);

    // Invoice details
    w.line("INVOICE", 20.0, true);
    w.line(&format!("Invoice Number: {}", invoice.invoice_number), 10.0, false);
    w.line(
        &format!("Issue Date: {}", invoice.issue_date.format("%B %d, %Y")),
        10.0,
        false,
    );
    w.line(
        &format!("Due Date: {}", invoice.due_date.format("%B %d, %Y")),
        10.0,
        false,
    );
    w.gap(6.0);

    // Bill-to block
    w.line("Bill To:", 11.0, true);
    if !client.contact_person.is_empty() {
        w.line(&client.contact_person, 10.0, false);
    }
    w.line(&client.company_name, 10.0, false);
    w.line(&client.billing_address, 10.0, false);
    let city_line: Vec<&str> = [
        client.billing_city.as_str(),
        client.billing_state.as_str(),
        client.billing_zip_code.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();
    if !city_line.is_empty() {
        w.line(&city_line.join(", "), 10.0, false);
    }
    w.line(&client.billing_country, 10.0, false);
    w.gap(6.0);

    // Items table
    const COL_DESC: f32 = MARGIN_MM;
    const COL_QTY: f32 = 95.0;
    const COL_PRICE: f32 = 115.0;
    const COL_TAX: f32 = 140.0;
    const COL_DISCOUNT: f32 = 155.0;
    const COL_TOTAL: f32 = 175.0;

    w.columns(
        &[
            (COL_DESC, "Description"),
            (COL_QTY, "Qty"),
            (COL_PRICE, "Unit Price"),
            (COL_TAX, "Tax %"),
            (COL_DISCOUNT, "Disc %"),
            (COL_TOTAL, "Total"),
        ],
        10.0,
        true,
    );

    for item in &invoice.items {
        let qty = item.quantity.to_string();
        let price = money(item.unit_price);
        let tax = item.tax_rate.to_string();
        let discount = item.discount_rate.to_string();
        let total = money(item.total());
        w.columns(
            &[
                (COL_DESC, item.description.as_str()),
                (COL_QTY, qty.as_str()),
                (COL_PRICE, price.as_str()),
                (COL_TAX, tax.as_str()),
                (COL_DISCOUNT, discount.as_str()),
                (COL_TOTAL, total.as_str()),
            ],
            10.0,
            false,
        );
    }
    w.gap(6.0);

    // Totals block
    let mut totals: Vec<(String, Decimal, bool)> = vec![
        ("Subtotal".to_string(), invoice.subtotal, false),
        ("Tax Total".to_string(), invoice.tax_total, false),
        ("Discount Total".to_string(), invoice.discount_total, false),
    ];
    if invoice.shipping_fee > Decimal::ZERO {
        totals.push(("Shipping Fee".to_string(), invoice.shipping_fee, false));
    }
    if invoice.handling_fee > Decimal::ZERO {
        totals.push(("Handling Fee".to_string(), invoice.handling_fee, false));
    }
    totals.push(("Total Amount".to_string(), invoice.total_amount, true));
    totals.push(("Paid Amount".to_string(), invoice.paid_amount, false));
    totals.push(("Balance Due".to_string(), invoice.balance_due, true));

    for (label, amount, emphasized) in totals {
        let value = format!("{} {}", invoice.currency, money(amount));
        w.columns(
            &[(COL_TAX, label.as_str()), (COL_TOTAL, value.as_str())],
            10.0,
            emphasized,
        );
    }
    w.gap(6.0);

    if !invoice.notes.is_empty() {
        w.line("Notes", 11.0, true);
        w.line(&invoice.notes, 9.0, false);
        w.gap(3.0);
    }
    if !invoice.terms_conditions.is_empty() {
        w.line("Terms & Conditions", 11.0, true);
        w.line(&invoice.terms_conditions, 9.0, false);
    }

    let bytes = doc.save_to_bytes().map_err(|e| anyhow!("{}", e))?;
    Ok(bytes)
}

/// Download filename for an invoice PDF.
pub fn invoice_pdf_filename(invoice: &Invoice) -> String {
    format!("invoice_{}.pdf", invoice.invoice_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceItem, NewClient, NewInvoice, NewUser};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn fixtures() -> (User, Client, Invoice) {
        let user = User::new(NewUser {
            username: "jo".to_string(),
            email: "jo@acme.example".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Doe".to_string(),
            company_name: "Acme Consulting".to_string(),
            company_address: "1 Main St".to_string(),
            company_phone: "+1 555 0100".to_string(),
            company_website: "https://acme.example".to_string(),
            default_currency: "USD".to_string(),
            default_tax_rate: Decimal::ZERO,
            invoice_prefix: "INV".to_string(),
        });
        let client = Client::new(NewClient {
            user_id: user.id.clone(),
            company_name: "Globex".to_string(),
            contact_person: "Hank Scorpio".to_string(),
            email: "ap@globex.example".to_string(),
            phone: String::new(),
            billing_address: "1 Volcano Way".to_string(),
            billing_city: "Cypress Creek".to_string(),
            billing_state: "OR".to_string(),
            billing_zip_code: "97000".to_string(),
            billing_country: "US".to_string(),
            shipping_address: None,
            shipping_city: None,
            shipping_state: None,
            shipping_zip_code: None,
            shipping_country: None,
            tax_id: String::new(),
            notes: String::new(),
            tags: Vec::new(),
        });
        let invoice = Invoice::new(NewInvoice {
            invoice_number: "INV-0001".to_string(),
            user_id: user.id.clone(),
            client_id: client.id.clone(),
            due_date: Utc::now(),
            currency: "USD".to_string(),
            items: vec![InvoiceItem {
                description: "Consulting".to_string(),
                quantity: dec!(3),
                unit_price: dec!(19.99),
                tax_rate: dec!(10),
                discount_rate: Decimal::ZERO,
            }],
            notes: "Thanks for your business".to_string(),
            terms_conditions: "Net 30".to_string(),
            shipping_fee: Decimal::ZERO,
            handling_fee: Decimal::ZERO,
        });
        (user, client, invoice)
    }

    #[test]
    fn renders_a_valid_pdf_document() {
        let (user, client, invoice) = fixtures();
        let bytes = render_invoice_pdf(&user, &client, &invoice).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn filename_carries_invoice_number() {
        let (_, _, invoice) = fixtures();
        assert_eq!(invoice_pdf_filename(&invoice), "invoice_INV-0001.pdf");
    }
}
