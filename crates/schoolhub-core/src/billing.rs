//! # Billing Module
//!
//! Fee invoices, payments and collection reports.
//!
//! All amounts are integer cents. The invariant maintained here is that the
//! payments recorded against an invoice never add up to more than the
//! invoice amount.

use crate::model::{FeeInvoice, Payment, Student};
use crate::primitives::ratio_bp;
use crate::{Record, RecordId, School, SchoolError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    PartiallyPaid,
    Unpaid,
    /// Money still owed after the due date.
    Overdue,
}

impl InvoiceStatus {
    /// Classify an invoice given what has been paid against it.
    #[must_use]
    pub fn classify(invoice: &FeeInvoice, paid_cents: u64, today: NaiveDate) -> Self {
        let outstanding = invoice.amount_cents.saturating_sub(paid_cents);
        if outstanding == 0 {
            Self::Paid
        } else if today > invoice.due_on {
            Self::Overdue
        } else if paid_cents > 0 {
            Self::PartiallyPaid
        } else {
            Self::Unpaid
        }
    }
}

/// An invoice with its payment position on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStatement {
    pub invoice: Record<FeeInvoice>,
    pub payments: Vec<Record<Payment>>,
    pub paid_cents: u64,
    pub outstanding_cents: u64,
    pub status: InvoiceStatus,
}

/// Every invoice of one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLedger {
    pub student_id: RecordId,
    pub statements: Vec<InvoiceStatement>,
    pub billed_cents: u64,
    pub paid_cents: u64,
    pub outstanding_cents: u64,
    pub overdue_cents: u64,
}

/// School-wide (or class-wide) fee position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSummary {
    pub invoice_count: usize,
    pub billed_cents: u64,
    pub collected_cents: u64,
    pub outstanding_cents: u64,
    pub overdue_cents: u64,
    pub collection_rate_bp: u32,
}

/// A student with money owed past its due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaulter {
    pub student_id: RecordId,
    pub student_name: String,
    pub class_id: Option<RecordId>,
    pub overdue_cents: u64,
    pub overdue_invoices: u32,
}

/// Payments received in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCollection {
    pub month: u32,
    pub collected_cents: u64,
    pub payment_count: u32,
}

/// Sum of payments per invoice.
fn paid_by_invoice(payments: &[Record<Payment>]) -> BTreeMap<RecordId, u64> {
    let mut paid = BTreeMap::new();
    for payment in payments {
        let total: &mut u64 = paid.entry(payment.data.invoice_id).or_default();
        *total = total.saturating_add(payment.data.amount_cents);
    }
    paid
}

impl School {
    fn paid_on_invoice(&self, invoice_id: RecordId) -> Result<u64, SchoolError> {
        Ok(self
            .list_where::<Payment>(|p| p.invoice_id == invoice_id)?
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.data.amount_cents)))
    }

    /// Record a payment, refusing any that would overpay the invoice.
    pub fn record_payment(&mut self, payment: Payment) -> Result<Record<Payment>, SchoolError> {
        let invoice = self.get::<FeeInvoice>(payment.invoice_id)?;
        let paid = self.paid_on_invoice(invoice.id)?;
        let outstanding = invoice.data.amount_cents.saturating_sub(paid);
        if payment.amount_cents > outstanding {
            return Err(SchoolError::Validation(format!(
                "payment of {} cents exceeds outstanding balance of {} cents on invoice {}",
                payment.amount_cents, outstanding, invoice.id
            )));
        }
        self.insert(payment)
    }

    /// Replace an invoice, refusing to drop its amount below what is paid.
    pub fn revise_invoice(
        &mut self,
        id: RecordId,
        invoice: FeeInvoice,
    ) -> Result<Record<FeeInvoice>, SchoolError> {
        let current = self.get::<FeeInvoice>(id)?;
        let paid = self.paid_on_invoice(id)?;
        if invoice.amount_cents < paid {
            return Err(SchoolError::Validation(format!(
                "amount {} cents is below the {} cents already paid",
                invoice.amount_cents, paid
            )));
        }
        if paid > 0 && invoice.student_id != current.data.student_id {
            return Err(SchoolError::Conflict(format!(
                "invoice {} has payments and cannot move to another student",
                id
            )));
        }
        self.replace(id, invoice)
    }

    /// An invoice with its payments and status.
    pub fn invoice_statement(
        &self,
        id: RecordId,
        today: NaiveDate,
    ) -> Result<InvoiceStatement, SchoolError> {
        let invoice = self.get::<FeeInvoice>(id)?;
        let payments = self.list_where::<Payment>(|p| p.invoice_id == id)?;
        let paid = payments
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.data.amount_cents));
        Ok(statement(invoice, payments, paid, today))
    }

    /// Every invoice of a student, with totals.
    pub fn student_ledger(
        &self,
        student_id: RecordId,
        today: NaiveDate,
    ) -> Result<StudentLedger, SchoolError> {
        self.get::<Student>(student_id)?;
        let invoices = self.list_where::<FeeInvoice>(|i| i.student_id == student_id)?;
        let payments = self.list::<Payment>()?;

        let mut ledger = StudentLedger {
            student_id,
            statements: Vec::with_capacity(invoices.len()),
            billed_cents: 0,
            paid_cents: 0,
            outstanding_cents: 0,
            overdue_cents: 0,
        };
        for invoice in invoices {
            let own: Vec<Record<Payment>> = payments
                .iter()
                .filter(|p| p.data.invoice_id == invoice.id)
                .cloned()
                .collect();
            let paid = own
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.data.amount_cents));
            let st = statement(invoice, own, paid, today);
            ledger.billed_cents = ledger
                .billed_cents
                .saturating_add(st.invoice.data.amount_cents);
            ledger.paid_cents = ledger.paid_cents.saturating_add(st.paid_cents);
            ledger.outstanding_cents = ledger.outstanding_cents.saturating_add(st.outstanding_cents);
            if st.status == InvoiceStatus::Overdue {
                ledger.overdue_cents = ledger.overdue_cents.saturating_add(st.outstanding_cents);
            }
            ledger.statements.push(st);
        }
        Ok(ledger)
    }

    /// Fee position across the school, or across one class.
    ///
    /// Class membership is taken from the students' current class.
    pub fn fee_summary(
        &self,
        today: NaiveDate,
        class_id: Option<RecordId>,
    ) -> Result<FeeSummary, SchoolError> {
        let invoices = match class_id {
            Some(class_id) => {
                let members: Vec<RecordId> = self
                    .list_where::<Student>(|s| s.class_id == Some(class_id))?
                    .into_iter()
                    .map(|s| s.id)
                    .collect();
                self.list_where::<FeeInvoice>(|i| members.contains(&i.student_id))?
            }
            None => self.list::<FeeInvoice>()?,
        };
        let paid = paid_by_invoice(&self.list::<Payment>()?);

        let mut summary = FeeSummary::default();
        for invoice in &invoices {
            let paid_cents = paid.get(&invoice.id).copied().unwrap_or(0);
            let outstanding = invoice.data.amount_cents.saturating_sub(paid_cents);
            summary.invoice_count += 1;
            summary.billed_cents = summary.billed_cents.saturating_add(invoice.data.amount_cents);
            summary.collected_cents = summary.collected_cents.saturating_add(paid_cents);
            summary.outstanding_cents = summary.outstanding_cents.saturating_add(outstanding);
            if InvoiceStatus::classify(&invoice.data, paid_cents, today) == InvoiceStatus::Overdue
            {
                summary.overdue_cents = summary.overdue_cents.saturating_add(outstanding);
            }
        }
        summary.collection_rate_bp = ratio_bp(summary.collected_cents, summary.billed_cents);
        Ok(summary)
    }

    /// Students owing money past its due date, largest debt first.
    pub fn defaulters(&self, today: NaiveDate) -> Result<Vec<Defaulter>, SchoolError> {
        let paid = paid_by_invoice(&self.list::<Payment>()?);
        let mut owed: BTreeMap<RecordId, (u64, u32)> = BTreeMap::new();
        for invoice in self.list::<FeeInvoice>()? {
            let paid_cents = paid.get(&invoice.id).copied().unwrap_or(0);
            if InvoiceStatus::classify(&invoice.data, paid_cents, today) != InvoiceStatus::Overdue {
                continue;
            }
            let entry = owed.entry(invoice.data.student_id).or_insert((0, 0));
            entry.0 = entry
                .0
                .saturating_add(invoice.data.amount_cents.saturating_sub(paid_cents));
            entry.1 = entry.1.saturating_add(1);
        }

        let mut out = Vec::with_capacity(owed.len());
        for (student_id, (overdue_cents, overdue_invoices)) in owed {
            let student = self.get::<Student>(student_id)?;
            out.push(Defaulter {
                student_id,
                student_name: student.data.full_name(),
                class_id: student.data.class_id,
                overdue_cents,
                overdue_invoices,
            });
        }
        out.sort_by(|a, b| {
            b.overdue_cents
                .cmp(&a.overdue_cents)
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(out)
    }

    /// Payments received per month of a calendar year. Always 12 rows.
    pub fn monthly_collections(&self, year: i32) -> Result<Vec<MonthlyCollection>, SchoolError> {
        let mut months: Vec<MonthlyCollection> = (1..=12)
            .map(|month| MonthlyCollection {
                month,
                collected_cents: 0,
                payment_count: 0,
            })
            .collect();
        for payment in self.list_where::<Payment>(|p| p.paid_on.year() == year)? {
            let index = payment.data.paid_on.month0() as usize;
            if let Some(row) = months.get_mut(index) {
                row.collected_cents = row.collected_cents.saturating_add(payment.data.amount_cents);
                row.payment_count = row.payment_count.saturating_add(1);
            }
        }
        Ok(months)
    }
}

fn statement(
    invoice: Record<FeeInvoice>,
    payments: Vec<Record<Payment>>,
    paid_cents: u64,
    today: NaiveDate,
) -> InvoiceStatement {
    let status = InvoiceStatus::classify(&invoice.data, paid_cents, today);
    InvoiceStatement {
        outstanding_cents: invoice.data.amount_cents.saturating_sub(paid_cents),
        invoice,
        payments,
        paid_cents,
        status,
    }
}
