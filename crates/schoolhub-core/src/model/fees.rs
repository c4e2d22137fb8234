//! Fee invoices and the payments made against them.
//!
//! Amounts are integer cents. An invoice is never overpaid; that rule spans
//! documents and is enforced by the billing service, not here.

use super::{check_length, require_text};
use crate::primitives::{MAX_NAME_LENGTH, MAX_TITLE_LENGTH};
use crate::{Collection, Document, RecordId, Reference, SchoolError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInvoice {
    pub student_id: RecordId,
    /// e.g. "Tuition - Term 1".
    pub title: String,
    pub amount_cents: u64,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
}

impl Document for FeeInvoice {
    const COLLECTION: Collection = Collection::FeeInvoices;

    fn validate(&self) -> Result<(), SchoolError> {
        require_text("title", &self.title, MAX_TITLE_LENGTH)?;
        if self.amount_cents == 0 {
            return Err(SchoolError::Validation(
                "amount_cents must be positive".to_string(),
            ));
        }
        if self.due_on < self.issued_on {
            return Err(SchoolError::Validation(
                "due_on must not be before issued_on".to_string(),
            ));
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new(Collection::Students, self.student_id)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Cheque,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub invoice_id: RecordId,
    pub amount_cents: u64,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    /// Receipt, cheque or transfer reference.
    #[serde(default)]
    pub reference: Option<String>,
}

impl Document for Payment {
    const COLLECTION: Collection = Collection::Payments;

    fn validate(&self) -> Result<(), SchoolError> {
        if self.amount_cents == 0 {
            return Err(SchoolError::Validation(
                "amount_cents must be positive".to_string(),
            ));
        }
        if let Some(reference) = &self.reference {
            check_length("reference", reference, MAX_NAME_LENGTH)?;
        }
        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new(Collection::FeeInvoices, self.invoice_id)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn invoice_due_before_issue_rejected() {
        let invoice = FeeInvoice {
            student_id: RecordId(1),
            title: "Tuition".to_string(),
            amount_cents: 10_000,
            issued_on: date(2025, 9, 1),
            due_on: date(2025, 8, 31),
        };
        assert!(invoice.validate().is_err());
    }

    #[test]
    fn zero_amounts_rejected() {
        let payment = Payment {
            invoice_id: RecordId(1),
            amount_cents: 0,
            paid_on: date(2025, 9, 2),
            method: PaymentMethod::Cash,
            reference: None,
        };
        assert!(payment.validate().is_err());
    }

    #[test]
    fn payment_method_uses_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
    }
}
