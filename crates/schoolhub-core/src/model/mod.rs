//! # Document Model
//!
//! Stored document types, one submodule per area of the school:
//!
//! - `people` - students, guardians and employees
//! - `class` - classes (grade + section + academic year)
//! - `attendance` - daily attendance marks
//! - `fees` - fee invoices and payments
//! - `exams` - exams and per-student results
//! - `homework` - homework assignments and submissions
//! - `notifications` - notifications, audiences and inbox deliveries
//! - `messages` - direct messages between members

pub mod attendance;
pub mod class;
pub mod exams;
pub mod fees;
pub mod homework;
pub mod messages;
pub mod notifications;
pub mod people;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use class::SchoolClass;
pub use exams::{Exam, ExamResult, Grade};
pub use fees::{FeeInvoice, Payment, PaymentMethod};
pub use homework::{Homework, Submission};
pub use messages::Message;
pub use notifications::{Audience, Delivery, Notification};
pub use people::{Employee, EmployeeRole, Gender, Guardian, Student};

use crate::SchoolError;

/// Require a non-blank text field no longer than `max` bytes.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> Result<(), SchoolError> {
    if value.trim().is_empty() {
        return Err(SchoolError::Validation(format!("{} must not be empty", field)));
    }
    check_length(field, value, max)
}

/// Reject text longer than `max` bytes.
pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<(), SchoolError> {
    if value.len() > max {
        return Err(SchoolError::Validation(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            value.len(),
            max
        )));
    }
    Ok(())
}

/// Normalize text for unique keys and case-insensitive matching.
pub(crate) fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}
