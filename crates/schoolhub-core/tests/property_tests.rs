//! # Property-Based Tests
//!
//! Invariants that must hold for any input sequence.

use chrono::NaiveDate;
use proptest::collection::vec;
use proptest::prelude::*;
use schoolhub_core::primitives::BASIS_POINTS;
use schoolhub_core::{
    AttendanceEntry, AttendanceStatus, AttendanceTally, Exam, FeeInvoice, Gender, Guardian,
    Payment, PaymentMethod, RecordId, School, SchoolClass, Student, export_snapshot,
    snapshot_checksum,
};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).expect("valid date")
}

fn status(code: u8) -> AttendanceStatus {
    match code % 4 {
        0 => AttendanceStatus::Present,
        1 => AttendanceStatus::Absent,
        2 => AttendanceStatus::Late,
        _ => AttendanceStatus::Excused,
    }
}

/// A class with `n` students.
fn class_of(n: usize) -> (School, RecordId, Vec<RecordId>) {
    let mut school = School::new();
    let class_id = school
        .insert(SchoolClass {
            name: "Grade 3".to_string(),
            section: "P".to_string(),
            academic_year: "2025-2026".to_string(),
            class_teacher_id: None,
        })
        .expect("class")
        .id;
    let students = (0..n)
        .map(|i| {
            school
                .insert(Student {
                    admission_no: format!("P{}", i),
                    first_name: "Prop".to_string(),
                    last_name: format!("Test{}", i),
                    gender: Gender::Other,
                    date_of_birth: None,
                    class_id: Some(class_id),
                    guardian: Guardian {
                        name: "G".to_string(),
                        phone: "0".to_string(),
                        email: None,
                    },
                    enrolled_on: date(1, 1),
                    active: true,
                })
                .expect("student")
                .id
        })
        .collect();
    (school, class_id, students)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Whatever payments are attempted, an invoice is never overpaid.
    #[test]
    fn payments_never_exceed_invoice(
        amount in 1u64..1_000_000,
        attempts in vec(1u64..400_000, 1..30)
    ) {
        let (mut school, _, students) = class_of(1);
        let invoice = school
            .insert(FeeInvoice {
                student_id: students[0],
                title: "Fees".to_string(),
                amount_cents: amount,
                issued_on: date(9, 1),
                due_on: date(9, 30),
            })
            .expect("invoice")
            .id;

        let mut accepted = 0u64;
        for cents in attempts {
            let fits = accepted + cents <= amount;
            let result = school.record_payment(Payment {
                invoice_id: invoice,
                amount_cents: cents,
                paid_on: date(9, 2),
                method: PaymentMethod::Cash,
                reference: None,
            });
            prop_assert_eq!(result.is_ok(), fits);
            if fits {
                accepted += cents;
            }
        }

        let statement = school.invoice_statement(invoice, date(9, 15)).expect("statement");
        prop_assert_eq!(statement.paid_cents, accepted);
        prop_assert!(statement.paid_cents <= amount);
        prop_assert_eq!(statement.outstanding_cents, amount - accepted);
    }

    /// Attendance rates are always within 0..=10000 basis points.
    #[test]
    fn attendance_rate_is_bounded(codes in vec(any::<u8>(), 0..200)) {
        let mut tally = AttendanceTally::default();
        for code in &codes {
            tally.add(status(*code));
        }
        match tally.rate_bp() {
            Some(rate) => prop_assert!(rate <= BASIS_POINTS),
            None => prop_assert_eq!(tally.total(), tally.excused),
        }
    }

    /// Stored registers give bounded per-student rates over any range.
    #[test]
    fn student_rates_bounded_after_marking(days in vec(any::<u8>(), 1..20)) {
        let (mut school, class_id, students) = class_of(2);
        for (offset, code) in days.iter().enumerate() {
            let day = date(9, 1 + offset as u32);
            let entries: Vec<AttendanceEntry> = students
                .iter()
                .map(|id| AttendanceEntry {
                    student_id: *id,
                    status: status(code.wrapping_add(id.0 as u8)),
                    remark: None,
                })
                .collect();
            school
                .mark_attendance(class_id, day, &entries, None, date(12, 31))
                .expect("mark");
        }
        for id in &students {
            let summary = school
                .student_attendance(*id, date(9, 1), date(9, 30))
                .expect("summary");
            prop_assert_eq!(summary.tally.total() as usize, days.len());
            if let Some(rate) = summary.rate_bp {
                prop_assert!(rate <= BASIS_POINTS);
            }
        }
    }

    /// Rankings are ordered by marks and ranks never decrease.
    #[test]
    fn ranking_is_monotonic(marks in vec(0u32..=100, 1..25)) {
        let (mut school, class_id, students) = class_of(marks.len());
        let exam = school
            .insert(Exam {
                name: "Prop exam".to_string(),
                class_id,
                subject: "Logic".to_string(),
                held_on: date(10, 1),
                max_marks: 100,
                pass_marks: 40,
            })
            .expect("exam")
            .id;
        for (student, mark) in students.iter().zip(&marks) {
            school.record_result(exam, *student, *mark, None).expect("result");
        }

        let ranking = school.exam_ranking(exam).expect("ranking");
        prop_assert_eq!(ranking.len(), marks.len());
        prop_assert_eq!(ranking[0].rank, 1);
        for pair in ranking.windows(2) {
            prop_assert!(pair[0].marks >= pair[1].marks);
            prop_assert!(pair[0].rank <= pair[1].rank);
            if pair[0].marks == pair[1].marks {
                prop_assert_eq!(pair[0].rank, pair[1].rank);
            }
        }
        for (position, row) in ranking.iter().enumerate() {
            prop_assert!(row.rank as usize <= position + 1);
        }
    }

    /// Same inserts produce the same snapshot bytes and checksum.
    #[test]
    fn snapshot_checksum_is_deterministic(n in 0usize..15) {
        let (a, _, _) = class_of(n);
        let (b, _, _) = class_of(n);
        prop_assert_eq!(
            snapshot_checksum(&a).expect("checksum"),
            snapshot_checksum(&b).expect("checksum")
        );
        prop_assert_eq!(
            export_snapshot(&a).expect("export"),
            export_snapshot(&b).expect("export")
        );
    }
}
