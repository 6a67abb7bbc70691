use anyhow::Result;

use super::repository::{InvoiceRepository, UserRepository};

/// Formats a sequence value as a display number, e.g. `INV-0042`.
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    format!("{}-{:04}", prefix, sequence)
}

/// Allocates a unique invoice number for a user.
///
/// Each attempt claims a fresh sequence value with a server-side `$inc`, so
/// concurrent allocations never observe the same value. The existence check
/// skips over numbers already taken by legacy data; the unique index on
/// `invoice_number` backstops the insert itself.
pub async fn allocate_invoice_number(
    users: &UserRepository,
    invoices: &InvoiceRepository,
    user_id: &str,
    prefix: &str,
) -> Result<Option<String>> {
    loop {
        let Some(sequence) = users.allocate_invoice_sequence(user_id).await? else {
            return Ok(None);
        };

        let number = format_invoice_number(prefix, sequence);
        if !invoices.number_exists(&number).await? {
            return Ok(Some(number));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_zero_padded_to_four_digits() {
        assert_eq!(format_invoice_number("INV", 1), "INV-0001");
        assert_eq!(format_invoice_number("INV", 42), "INV-0042");
        assert_eq!(format_invoice_number("ACME", 9999), "ACME-9999");
    }

    #[test]
    fn large_sequences_grow_past_four_digits() {
        assert_eq!(format_invoice_number("INV", 10000), "INV-10000");
    }
}
