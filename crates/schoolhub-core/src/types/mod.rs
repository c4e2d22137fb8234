//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the SchoolHub engine:
//! - Record identifiers and collection names (`RecordId`, `Collection`)
//! - The `Document` trait implemented by every stored type
//! - Stored-record wrapper (`Record<T>`) and cross-document references
//! - School members that can receive notifications and messages (`Member`)
//! - Error types (`SchoolError`)
//!
//! ## Determinism Guarantees
//!
//! - Identifiers implement `Ord` so collections iterate in a stable order
//! - Amounts are integers (cents, basis points); nothing here uses floats

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a stored document, unique within its collection.
///
/// Ids are allocated from 1 upwards and are never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Get the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// The named document collections held by a school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Students,
    Employees,
    Classes,
    Attendance,
    FeeInvoices,
    Payments,
    Exams,
    ExamResults,
    Homework,
    Submissions,
    Notifications,
    Deliveries,
    Messages,
}

impl Collection {
    /// Every collection, in storage order.
    pub const ALL: [Collection; 13] = [
        Self::Students,
        Self::Employees,
        Self::Classes,
        Self::Attendance,
        Self::FeeInvoices,
        Self::Payments,
        Self::Exams,
        Self::ExamResults,
        Self::Homework,
        Self::Submissions,
        Self::Notifications,
        Self::Deliveries,
        Self::Messages,
    ];

    /// Stable storage name (also the redb table name).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Employees => "employees",
            Self::Classes => "classes",
            Self::Attendance => "attendance",
            Self::FeeInvoices => "fee_invoices",
            Self::Payments => "payments",
            Self::Exams => "exams",
            Self::ExamResults => "exam_results",
            Self::Homework => "homework",
            Self::Submissions => "submissions",
            Self::Notifications => "notifications",
            Self::Deliveries => "deliveries",
            Self::Messages => "messages",
        }
    }

    /// Parse a storage name back into a collection.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Collections whose documents are owned by a document of this collection.
    ///
    /// Removing the owner removes these children with it; any other
    /// referrer blocks the removal.
    #[must_use]
    pub const fn owned_children(self) -> &'static [Collection] {
        match self {
            Self::Notifications => &[Self::Deliveries],
            Self::Homework => &[Self::Submissions],
            Self::Exams => &[Self::ExamResults],
            _ => &[],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pointer from one document to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub collection: Collection,
    pub id: RecordId,
}

impl Reference {
    #[must_use]
    pub const fn new(collection: Collection, id: RecordId) -> Self {
        Self { collection, id }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// =============================================================================
// DOCUMENT TRAIT
// =============================================================================

/// A type that can be stored in a school collection.
///
/// Stored documents are encoded with postcard, so implementors must not
/// rely on self-describing serde features (`flatten`, `untagged`,
/// internally tagged enums, `skip_serializing_if`).
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection this document lives in.
    const COLLECTION: Collection;

    /// Check local field invariants.
    fn validate(&self) -> Result<(), SchoolError> {
        Ok(())
    }

    /// Documents this document points at. Each must exist when stored.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// A key that must be unique within the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// A stored document together with its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    #[must_use]
    pub const fn new(id: RecordId, data: T) -> Self {
        Self { id, data }
    }
}

// =============================================================================
// MEMBERS
// =============================================================================

/// A person who can receive notifications and exchange messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Member {
    Student(RecordId),
    Employee(RecordId),
}

impl Member {
    /// Build a member from a path-style kind (`student` / `employee`).
    pub fn parse(kind: &str, id: u64) -> Result<Self, SchoolError> {
        match kind {
            "student" | "students" => Ok(Self::Student(RecordId(id))),
            "employee" | "employees" => Ok(Self::Employee(RecordId(id))),
            other => Err(SchoolError::Validation(format!(
                "unknown member kind '{}'",
                other
            ))),
        }
    }

    /// The document this member is backed by.
    #[must_use]
    pub const fn reference(self) -> Reference {
        match self {
            Self::Student(id) => Reference::new(Collection::Students, id),
            Self::Employee(id) => Reference::new(Collection::Employees, id),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student(id) => write!(f, "student:{}", id),
            Self::Employee(id) => write!(f, "employee:{}", id),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the SchoolHub engine.
///
/// - No silent failures
/// - Use `Result<T, SchoolError>` for fallible operations
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum SchoolError {
    /// The requested document does not exist.
    #[error("{collection} record {id} not found")]
    NotFound {
        collection: Collection,
        id: RecordId,
    },

    /// The input violates a field or domain rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation would break uniqueness or referential integrity.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is not allowed to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl SchoolError {
    /// Shorthand for a missing document.
    #[must_use]
    pub const fn not_found(collection: Collection, id: RecordId) -> Self {
        Self::NotFound { collection, id }
    }
}

// =============================================================================
// TESTS
// =============================================================================
