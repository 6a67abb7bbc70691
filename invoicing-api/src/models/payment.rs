use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::opt_chrono_datetime_as_bson_datetime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Processing => write!(f, "processing"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid payment transition from {from} to {to}")]
pub struct PaymentTransitionError {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    /// Provider-facing identifier (e.g. the Stripe PaymentIntent id).
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

    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub completed_at: Option<DateTime<Utc>>,

    pub description: String,
    pub error_message: Option<String>,

    // Refund information
    pub refunded_amount: Decimal,
    pub refund_reason: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub refunded_at: Option<DateTime<Utc>>,
}

pub struct NewPayment {
    pub payment_id: String,
    pub invoice_id: String,
    pub user_id: String,
    pub client_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub provider: String,
    pub provider_payment_id: String,
    pub description: String,
}

impl Payment {
    pub fn new(fields: NewPayment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_id: fields.payment_id,
            invoice_id: fields.invoice_id,
            user_id: fields.user_id,
            client_id: fields.client_id,
            amount: fields.amount,
            currency: fields.currency,
            payment_method: fields.payment_method,
            status: PaymentStatus::Pending,
            provider: fields.provider,
            provider_payment_id: fields.provider_payment_id,
            provider_transaction_id: String::new(),
            created_at: Utc::now(),
            processed_at: None,
            completed_at: None,
            description: fields.description,
            error_message: None,
            refunded_amount: Decimal::ZERO,
            refund_reason: None,
            refunded_at: None,
        }
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<(), PaymentTransitionError> {
        let allowed = matches!(
            (self.status, to),
            (PaymentStatus::Pending, PaymentStatus::Processing)
                | (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
                | (PaymentStatus::Processing, PaymentStatus::Completed)
                | (PaymentStatus::Processing, PaymentStatus::Failed)
                | (PaymentStatus::Processing, PaymentStatus::Cancelled)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        );
        if !allowed {
            return Err(PaymentTransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn mark_processing(&mut self) -> Result<(), PaymentTransitionError> {
        self.transition(PaymentStatus::Processing)?;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self) -> Result<(), PaymentTransitionError> {
        self.transition(PaymentStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        error_message: Option<String>,
    ) -> Result<(), PaymentTransitionError> {
        self.transition(PaymentStatus::Failed)?;
        self.error_message = error_message;
        Ok(())
    }

    pub fn mark_cancelled(&mut self) -> Result<(), PaymentTransitionError> {
        self.transition(PaymentStatus::Cancelled)
    }

    pub fn mark_refunded(
        &mut self,
        amount: Option<Decimal>,
        reason: Option<String>,
    ) -> Result<(), PaymentTransitionError> {
        self.transition(PaymentStatus::Refunded)?;
        self.refunded_amount = amount.unwrap_or(self.amount);
        self.refund_reason = reason;
        self.refunded_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        Payment::new(NewPayment {
            payment_id: "pi_test_123".to_string(),
            invoice_id: "invoice-1".to_string(),
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
            amount: dec!(100.00),
            currency: "EUR".to_string(),
            payment_method: "stripe".to_string(),
            provider: "stripe".to_string(),
            provider_payment_id: "pi_test_123".to_string(),
            description: String::new(),
        })
    }

    #[test]
    fn happy_path_pending_processing_completed() {
        let mut p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        p.mark_processing().unwrap();
        assert!(p.processed_at.is_some());
        p.mark_completed().unwrap();
        assert_eq!(p.status, PaymentStatus::Completed);
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn refund_only_after_completion() {
        let mut p = payment();
        assert!(p.mark_refunded(None, None).is_err());

        p.mark_completed().unwrap();
        p.mark_refunded(Some(dec!(40)), Some("duplicate charge".to_string()))
            .unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
        assert_eq!(p.refunded_amount, dec!(40));
        assert!(p.refunded_at.is_some());
    }

    #[test]
    fn refund_defaults_to_full_amount() {
        let mut p = payment();
        p.mark_completed().unwrap();
        p.mark_refunded(None, None).unwrap();
        assert_eq!(p.refunded_amount, dec!(100.00));
    }

    #[test]
    fn failed_payment_records_error() {
        let mut p = payment();
        p.mark_failed(Some("card declined".to_string())).unwrap();
        assert_eq!(p.status, PaymentStatus::Failed);
        assert_eq!(p.error_message.as_deref(), Some("card declined"));
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut p = payment();
        p.mark_failed(None).unwrap();
        assert!(p.mark_completed().is_err());
        assert!(p.mark_processing().is_err());

        let mut q = payment();
        q.mark_cancelled().unwrap();
        assert!(q.mark_completed().is_err());
    }

    #[test]
    fn completed_payment_cannot_fail() {
        let mut p = payment();
        p.mark_completed().unwrap();
        assert!(p.mark_failed(None).is_err());
    }
}
