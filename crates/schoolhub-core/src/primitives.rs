//! # Fixed Limits and Constants
//!
//! Hardcoded runtime constants for the SchoolHub engine.
//!
//! These are compiled into the binary and immutable at runtime. They bound
//! every input that reaches the store so a single request cannot exhaust
//! memory or produce unbounded scans.

/// One hundred percent, expressed in basis points.
///
/// All rates (attendance, collection, pass rate) are integers in
/// `0..=BASIS_POINTS`.
pub const BASIS_POINTS: u32 = 10_000;

/// `part / whole` in basis points, rounded down. Zero when `whole` is zero.
#[must_use]
pub fn ratio_bp(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let bp = part.saturating_mul(u64::from(BASIS_POINTS)) / whole;
    u32::try_from(bp).unwrap_or(u32::MAX)
}

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for person names and short identifiers (bytes).
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum length for titles, subjects and other one-line text (bytes).
pub const MAX_TITLE_LENGTH: usize = 256;

/// Maximum length for free-text bodies (notification, message, homework).
pub const MAX_BODY_LENGTH: usize = 16 * 1024;

/// Maximum number of entries in a single attendance submission.
pub const MAX_ATTENDANCE_BATCH: usize = 500;

/// Maximum number of students moved by one promotion.
pub const MAX_PROMOTION_BATCH: usize = 2_000;

// =============================================================================
// PAGINATION
// =============================================================================

/// Page size used when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a listing will return.
pub const MAX_PAGE_SIZE: usize = 500;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the canonical snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"SHUB";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum number of records accepted by a snapshot import.
pub const MAX_IMPORT_RECORDS: u64 = 5_000_000;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Default period of the notification poller, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
