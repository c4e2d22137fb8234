//! # Integrity Tests
//!
//! End-to-end school scenarios, each run against both storage backends.
//!
//! ## Areas
//! - Referential integrity and cascades
//! - Atomic batches (a rejected register writes nothing)
//! - Notification dispatch across a reopen
//! - Snapshot round-trips between backends

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use schoolhub_core::{
    AttendanceEntry, AttendanceStatus, Audience, Collection, Employee, EmployeeRole, Exam,
    FeeInvoice, Gender, Guardian, Homework, Member, Notification, Payment, PaymentMethod,
    RecordId, School, SchoolClass, SchoolError, Student, export_snapshot, snapshot_checksum,
};
use tempfile::TempDir;

// =============================================================================
// FIXTURES
// =============================================================================

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).expect("valid date")
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0)
        .single()
        .expect("valid time")
}

/// Run a scenario on a fresh in-memory school and a fresh redb school.
fn on_each_backend(scenario: impl Fn(&mut School)) {
    let mut memory = School::new();
    scenario(&mut memory);

    let dir = TempDir::new().expect("tempdir");
    let mut persistent = School::with_redb(dir.path().join("school.redb")).expect("open redb");
    scenario(&mut persistent);
}

struct Seed {
    teacher: RecordId,
    class_id: RecordId,
    students: Vec<RecordId>,
}

fn seed(school: &mut School) -> Seed {
    let teacher = school
        .insert(Employee {
            employee_no: "T-001".to_string(),
            first_name: "Maria".to_string(),
            last_name: "Montessori".to_string(),
            role: EmployeeRole::Teacher,
            email: "maria@school.test".to_string(),
            phone: "555-0100".to_string(),
            joined_on: date(1, 6),
            active: true,
        })
        .expect("teacher")
        .id;
    let class_id = school
        .insert(SchoolClass {
            name: "Grade 5".to_string(),
            section: "A".to_string(),
            academic_year: "2025-2026".to_string(),
            class_teacher_id: Some(teacher),
        })
        .expect("class")
        .id;
    let students = ["Ito", "Bauer", "Costa"]
        .iter()
        .enumerate()
        .map(|(i, last)| {
            school
                .insert(Student {
                    admission_no: format!("2025-{:03}", i + 1),
                    first_name: "Alex".to_string(),
                    last_name: (*last).to_string(),
                    gender: Gender::Other,
                    date_of_birth: Some(date(3, 1) - chrono::Days::new(365 * 10)),
                    class_id: Some(class_id),
                    guardian: Guardian {
                        name: "Parent".to_string(),
                        phone: "555-0199".to_string(),
                        email: Some("parent@home.test".to_string()),
                    },
                    enrolled_on: date(9, 1),
                    active: true,
                })
                .expect("student")
                .id
        })
        .collect();
    Seed {
        teacher,
        class_id,
        students,
    }
}

// =============================================================================
// REFERENTIAL INTEGRITY
// =============================================================================

mod referential_integrity {
    use super::*;

    #[test]
    fn class_with_students_cannot_be_removed() {
        on_each_backend(|school| {
            let s = seed(school);
            let err = school
                .remove::<SchoolClass>(s.class_id)
                .expect_err("class is referenced");
            assert!(matches!(err, SchoolError::Conflict(_)));
            assert_eq!(school.count(Collection::Classes).expect("count"), 1);
        });
    }

    #[test]
    fn exam_removal_cascades_to_results() {
        on_each_backend(|school| {
            let s = seed(school);
            let exam = school
                .insert(Exam {
                    name: "Unit test".to_string(),
                    class_id: s.class_id,
                    subject: "History".to_string(),
                    held_on: date(10, 3),
                    max_marks: 20,
                    pass_marks: 8,
                })
                .expect("exam");
            for (i, student) in s.students.iter().enumerate() {
                school
                    .record_result(exam.id, *student, 10 + i as u32, None)
                    .expect("result");
            }
            assert_eq!(school.count(Collection::ExamResults).expect("count"), 3);

            school.remove::<Exam>(exam.id).expect("remove exam");
            assert_eq!(school.count(Collection::ExamResults).expect("count"), 0);
        });
    }

    #[test]
    fn invoice_with_payments_cannot_be_removed() {
        on_each_backend(|school| {
            let s = seed(school);
            let invoice = school
                .insert(FeeInvoice {
                    student_id: s.students[0],
                    title: "Term 1".to_string(),
                    amount_cents: 50_000,
                    issued_on: date(9, 1),
                    due_on: date(9, 30),
                })
                .expect("invoice");
            school
                .record_payment(Payment {
                    invoice_id: invoice.id,
                    amount_cents: 10_000,
                    paid_on: date(9, 2),
                    method: PaymentMethod::BankTransfer,
                    reference: Some("TX-1".to_string()),
                })
                .expect("payment");
            assert!(matches!(
                school.remove::<FeeInvoice>(invoice.id),
                Err(SchoolError::Conflict(_))
            ));
        });
    }

    #[test]
    fn homework_for_unknown_class_is_rejected() {
        on_each_backend(|school| {
            let err = school
                .insert(Homework {
                    class_id: RecordId(77),
                    subject: "Art".to_string(),
                    title: "Sketch".to_string(),
                    description: String::new(),
                    assigned_by: None,
                    assigned_on: date(9, 1),
                    due_on: date(9, 8),
                })
                .expect_err("missing class");
            assert!(matches!(err, SchoolError::Validation(_)));
        });
    }

    fn second_class(school: &mut School) -> RecordId {
        school
            .insert(SchoolClass {
                name: "Grade 6".to_string(),
                section: "A".to_string(),
                academic_year: "2025-2026".to_string(),
                class_teacher_id: None,
            })
            .expect("second class")
            .id
    }

    #[test]
    fn exam_revision_keeps_results_consistent() {
        on_each_backend(|school| {
            let s = seed(school);
            let other = second_class(school);
            let exam = school
                .insert(Exam {
                    name: "Midterm".to_string(),
                    class_id: s.class_id,
                    subject: "Maths".to_string(),
                    held_on: date(10, 3),
                    max_marks: 100,
                    pass_marks: 40,
                })
                .expect("exam");
            school
                .record_result(exam.id, s.students[0], 90, None)
                .expect("result");

            let shrunk = Exam {
                max_marks: 50,
                pass_marks: 20,
                ..exam.data.clone()
            };
            assert!(matches!(
                school.revise_exam(exam.id, shrunk),
                Err(SchoolError::Validation(_))
            ));
            let moved = Exam {
                class_id: other,
                ..exam.data.clone()
            };
            assert!(matches!(
                school.revise_exam(exam.id, moved),
                Err(SchoolError::Conflict(_))
            ));

            let stored = school.get::<Exam>(exam.id).expect("exam");
            assert_eq!(stored.data, exam.data);
            let card = school.report_card(s.students[0]).expect("report card");
            assert_eq!(card.overall_percentage_bp, 9_000);

            let renamed = Exam {
                name: "Midterm (revised)".to_string(),
                ..exam.data.clone()
            };
            school.revise_exam(exam.id, renamed).expect("rename");
        });
    }

    #[test]
    fn homework_with_submissions_keeps_its_class() {
        on_each_backend(|school| {
            let s = seed(school);
            let other = second_class(school);
            let homework = school
                .insert(Homework {
                    class_id: s.class_id,
                    subject: "Art".to_string(),
                    title: "Sketch".to_string(),
                    description: String::new(),
                    assigned_by: Some(s.teacher),
                    assigned_on: date(9, 1),
                    due_on: date(9, 8),
                })
                .expect("homework");
            school
                .submit_homework(homework.id, s.students[1], "tree".to_string(), date(9, 4))
                .expect("submission");

            let moved = Homework {
                class_id: other,
                ..homework.data.clone()
            };
            assert!(matches!(
                school.revise_homework(homework.id, moved),
                Err(SchoolError::Conflict(_))
            ));
            let status = school.homework_status(homework.id).expect("status");
            assert_eq!(status.submitted.len(), 1);
            assert_eq!(status.missing.len(), 2);
        });
    }
}

// =============================================================================
// ATOMIC BATCHES
// =============================================================================

mod atomic_batches {
    use super::*;

    #[test]
    fn rejected_register_writes_nothing() {
        on_each_backend(|school| {
            let s = seed(school);
            let entries = vec![
                AttendanceEntry {
                    student_id: s.students[0],
                    status: AttendanceStatus::Present,
                    remark: None,
                },
                AttendanceEntry {
                    student_id: RecordId(999),
                    status: AttendanceStatus::Absent,
                    remark: None,
                },
            ];
            assert!(school
                .mark_attendance(s.class_id, date(10, 1), &entries, Some(s.teacher), date(10, 1))
                .is_err());
            assert_eq!(school.count(Collection::Attendance).expect("count"), 0);
        });
    }

    #[test]
    fn remarking_a_day_overwrites_in_place() {
        on_each_backend(|school| {
            let s = seed(school);
            let register = |status| {
                s.students
                    .iter()
                    .map(|id| AttendanceEntry {
                        student_id: *id,
                        status,
                        remark: None,
                    })
                    .collect::<Vec<_>>()
            };
            school
                .mark_attendance(
                    s.class_id,
                    date(10, 1),
                    &register(AttendanceStatus::Absent),
                    None,
                    date(10, 1),
                )
                .expect("first register");
            school
                .mark_attendance(
                    s.class_id,
                    date(10, 1),
                    &register(AttendanceStatus::Present),
                    None,
                    date(10, 2),
                )
                .expect("second register");

            assert_eq!(school.count(Collection::Attendance).expect("count"), 3);
            let sheet = school.class_day_sheet(s.class_id, date(10, 1)).expect("sheet");
            assert_eq!(sheet.tally.present, 3);
            assert_eq!(sheet.unmarked, 0);
        });
    }

    #[test]
    fn promotion_moves_everyone_or_no_one() {
        on_each_backend(|school| {
            let s = seed(school);
            let next = school
                .insert(SchoolClass {
                    name: "Grade 6".to_string(),
                    section: "A".to_string(),
                    academic_year: "2026-2027".to_string(),
                    class_teacher_id: None,
                })
                .expect("class")
                .id;
            let listed = [s.students[0], RecordId(404)];
            assert!(school.promote_students(s.class_id, next, Some(&listed)).is_err());
            assert!(school.class_roster(next).expect("roster").is_empty());

            let promotion = school
                .promote_students(s.class_id, next, None)
                .expect("promote");
            assert_eq!(promotion.moved.len(), 3);
            assert_eq!(school.class_roster(next).expect("roster").len(), 3);
        });
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

mod notifications {
    use super::*;

    fn notice(audience: Audience, scheduled_for: Option<DateTime<Utc>>) -> Notification {
        Notification {
            title: "Parent evening".to_string(),
            body: "Thursday at six".to_string(),
            audience,
            created_by: None,
            created_at: at(1, 8),
            scheduled_for,
            sent_at: None,
            recipient_count: 0,
        }
    }

    #[test]
    fn scheduled_fan_out_reaches_each_member_once() {
        on_each_backend(|school| {
            let s = seed(school);
            school
                .publish_notification(notice(Audience::Everyone, Some(at(2, 9))), at(1, 8))
                .expect("publish");
            school
                .publish_notification(notice(Audience::Class(s.class_id), Some(at(3, 9))), at(1, 8))
                .expect("publish");

            let first = school.dispatch_due(at(2, 9)).expect("dispatch");
            assert_eq!(first.sent.len(), 1);
            assert_eq!(first.deliveries, 4);

            let second = school.dispatch_due(at(5, 0)).expect("dispatch");
            assert_eq!(second.sent.len(), 1);
            assert_eq!(second.deliveries, 3);

            assert!(school.dispatch_due(at(6, 0)).expect("dispatch").is_empty());

            let student = Member::Student(s.students[0]);
            assert_eq!(school.unread_count(student).expect("unread"), 2);
            assert_eq!(
                school
                    .unread_count(Member::Employee(s.teacher))
                    .expect("unread"),
                1
            );
        });
    }

    #[test]
    fn pending_notification_survives_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("school.redb");
        {
            let mut school = School::with_redb(&path).expect("open");
            seed(&mut school);
            school
                .publish_notification(notice(Audience::AllStudents, Some(at(4, 7))), at(1, 8))
                .expect("publish");
        }

        let mut reopened = School::with_redb(&path).expect("reopen");
        let report = reopened.dispatch_due(at(4, 7)).expect("dispatch");
        assert_eq!(report.deliveries, 3);
        assert_eq!(reopened.count(Collection::Deliveries).expect("count"), 3);
    }
}

// =============================================================================
// PERSISTENCE AND SNAPSHOTS
// =============================================================================

mod snapshots {
    use super::*;

    #[test]
    fn ids_are_never_reused_after_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("school.redb");
        let removed;
        {
            let mut school = School::with_redb(&path).expect("open");
            let s = seed(&mut school);
            removed = s.students[2];
            school.remove::<Student>(removed).expect("remove");
        }
        let mut school = School::with_redb(&path).expect("reopen");
        let template = school.get::<Student>(RecordId(1)).expect("student").data;
        let added = school
            .insert(Student {
                admission_no: "2025-900".to_string(),
                ..template
            })
            .expect("insert");
        assert!(added.id > removed);
    }

    #[test]
    fn memory_and_redb_export_identical_bytes() {
        let mut memory = School::new();
        seed(&mut memory);

        let dir = TempDir::new().expect("tempdir");
        let mut persistent = School::with_redb(dir.path().join("school.redb")).expect("open");
        seed(&mut persistent);

        assert_eq!(
            export_snapshot(&memory).expect("export"),
            export_snapshot(&persistent).expect("export")
        );
        assert_eq!(
            snapshot_checksum(&memory).expect("checksum"),
            snapshot_checksum(&persistent).expect("checksum")
        );
    }

    #[test]
    fn snapshot_restores_into_redb() {
        let mut memory = School::new();
        let s = seed(&mut memory);
        let bytes = export_snapshot(&memory).expect("export");

        let dir = TempDir::new().expect("tempdir");
        let mut persistent = School::with_redb(dir.path().join("school.redb")).expect("open");
        let restored = schoolhub_core::import_snapshot(&mut persistent, &bytes).expect("import");
        assert_eq!(restored, 5);
        assert_eq!(
            persistent.class_roster(s.class_id).expect("roster").len(),
            3
        );
    }
}
