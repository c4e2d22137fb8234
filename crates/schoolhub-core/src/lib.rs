//! # schoolhub-core
//!
//! The school records engine for SchoolHub.
//!
//! This crate holds every rule of the domain: the document model, the
//! storage backends, referential integrity between documents and the
//! services built on top (attendance, fees, exams, homework,
//! notifications, messaging, reports, snapshots).
//!
//! ## Architectural Constraints
//!
//! - Synchronous and free of network code; the server wraps a `School` in a
//!   lock and drives it from async handlers
//! - No floating point: money is integer cents, rates are basis points
//! - Time is passed in: operations needing "now" or "today" take it as an
//!   argument, so every result is reproducible
//! - Every multi-record change is committed as one atomic `WriteBatch`

// =============================================================================
// MODULES
// =============================================================================

pub mod attendance;
pub mod billing;
pub mod coursework;
pub mod export;
pub mod grading;
pub mod messaging;
pub mod model;
pub mod notify;
pub mod primitives;
pub mod reports;
pub mod roster;
pub mod school;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Collection, Document, Member, Record, RecordId, Reference, SchoolError};

// =============================================================================
// RE-EXPORTS: Documents
// =============================================================================

pub use model::{
    AttendanceRecord, AttendanceStatus, Audience, Delivery, Employee, EmployeeRole, Exam,
    ExamResult, FeeInvoice, Gender, Grade, Guardian, Homework, Message, Notification, Payment,
    PaymentMethod, SchoolClass, Student, Submission,
};

// =============================================================================
// RE-EXPORTS: Engine and Services
// =============================================================================

pub use attendance::{
    AttendanceEntry, AttendanceSummary, AttendanceTally, ClassAttendanceReport, ClassDaySheet,
};
pub use billing::{Defaulter, FeeSummary, InvoiceStatement, InvoiceStatus, StudentLedger};
pub use coursework::{HomeworkStatus, SubmissionEntry};
pub use export::{
    Snapshot, SnapshotHeader, export_snapshot, import_snapshot, read_snapshot, snapshot_checksum,
    verify_snapshot,
};
pub use grading::{ExamStatistics, RankedResult, ReportCard};
pub use messaging::Folder;
pub use notify::{DispatchReport, InboxItem};
pub use reports::{ClassStrength, Dashboard, StaffRow, StoreMetrics};
pub use roster::{Promotion, StudentFilter};
pub use school::{School, StorageBackend};
pub use storage::{DocumentStore, MemoryStore, RedbStore, WriteBatch};
