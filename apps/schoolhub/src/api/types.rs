//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use chrono::{NaiveDate, Utc};
use schoolhub_core::{
    AttendanceEntry, Audience, EmployeeRole, Member, Notification, RecordId,
    primitives::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};
use serde::{Deserialize, Serialize};

// =============================================================================
// ENVELOPE
// =============================================================================

/// Every response body: `{ success, data, error }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    /// Matches before paging.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    /// Cut one page out of `items`. The limit is capped at `MAX_PAGE_SIZE`.
    pub fn page(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Self {
        let total = items.len();
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let items = items.into_iter().skip(offset).take(limit).collect();
        Self {
            total,
            offset,
            limit,
            items,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub class_id: Option<u64>,
    pub q: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub role: Option<EmployeeRole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub student_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub invoice_id: Option<u64>,
}

// =============================================================================
// DATE QUERIES
// =============================================================================

/// Today's date on the server clock.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `?today=` override for "as of" reports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodayQuery {
    pub today: Option<NaiveDate>,
}

impl TodayQuery {
    #[must_use]
    pub fn resolve(&self) -> NaiveDate {
        self.today.unwrap_or_else(today)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DueFromQuery {
    pub due_from: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeSummaryQuery {
    pub today: Option<NaiveDate>,
    pub class_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderQuery {
    #[serde(default)]
    pub folder: schoolhub_core::Folder,
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

/// Move students between classes. Without `student_ids` the whole class moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteRequest {
    pub from_class_id: RecordId,
    pub to_class_id: RecordId,
    #[serde(default)]
    pub student_ids: Option<Vec<RecordId>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendanceRequest {
    pub date: NaiveDate,
    pub entries: Vec<AttendanceEntry>,
    #[serde(default)]
    pub marked_by: Option<RecordId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRequest {
    pub student_id: RecordId,
    pub marks: u32,
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub student_id: RecordId,
    pub content: String,
    /// Defaults to today.
    #[serde(default)]
    pub submitted_on: Option<NaiveDate>,
}

/// A notification as posted by a client; server-side fields are filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub audience: Audience,
    #[serde(default)]
    pub created_by: Option<RecordId>,
    #[serde(default)]
    pub scheduled_for: Option<chrono::DateTime<Utc>>,
}

impl NotificationRequest {
    #[must_use]
    pub fn into_notification(self, now: chrono::DateTime<Utc>) -> Notification {
        Notification {
            title: self.title,
            body: self.body,
            audience: self.audience,
            created_by: self.created_by,
            created_at: now,
            scheduled_for: self.scheduled_for,
            sent_at: None,
            recipient_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender: Member,
    pub recipient: Member,
    pub subject: String,
    pub body: String,
}

/// Who is marking something as read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    pub member: Member,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Canonical snapshot, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub data: String,
    pub checksum: u64,
    pub record_count: u64,
}

impl ExportResponse {
    #[must_use]
    pub fn new(data: &[u8], checksum: u64, record_count: u64) -> Self {
        Self {
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data),
            checksum,
            record_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashResponse {
    pub checksum: u64,
    /// BLAKE3 of the canonical snapshot, hex encoded.
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub member: Member,
    pub unread: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub id: RecordId,
}

// =============================================================================
// TESTS
// =============================================================================
