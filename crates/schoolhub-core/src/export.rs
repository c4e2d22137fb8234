//! # Snapshot Export Module
//!
//! Deterministic, bit-exact serialization of a whole school.
//!
//! `redb` files are not guaranteed to be byte-identical across runs, so the
//! snapshot is the portable form: it backs the `file` storage backend, the
//! `/export` endpoint and the `hash` command.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [SnapshotHeader (postcard)] [Snapshot (postcard)]
//! ```
//!
//! Records are carried as their stored postcard bytes, in collection order
//! and then id order, so two schools with the same content export the
//! same bytes.

use crate::model::{
    AttendanceRecord, Delivery, Employee, Exam, ExamResult, FeeInvoice, Homework, Message,
    Notification, Payment, SchoolClass, Student, Submission,
};
use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_IMPORT_RECORDS};
use crate::school::decode;
use crate::storage::WriteBatch;
use crate::{Collection, Document, RecordId, School, SchoolError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// FORMAT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
    /// Records across all collections.
    pub record_count: u64,
    /// `Snapshot::checksum` of the data section.
    pub checksum: u64,
}

impl SnapshotHeader {
    #[must_use]
    pub fn new(record_count: u64, checksum: u64) -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
            record_count,
            checksum,
        }
    }

    /// Reject foreign or future files.
    ///
    /// Messages stay generic so they do not describe the format.
    pub fn validate(&self) -> Result<(), SchoolError> {
        if &self.magic != MAGIC_BYTES {
            return Err(SchoolError::DeserializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(SchoolError::DeserializationError(
                "Unsupported file version".to_string(),
            ));
        }
        if self.record_count > MAX_IMPORT_RECORDS {
            return Err(SchoolError::DeserializationError(format!(
                "Record count {} exceeds maximum allowed {}",
                self.record_count, MAX_IMPORT_RECORDS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: u64,
    /// The document's stored postcard encoding.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotCollection {
    pub collection: Collection,
    pub next_id: u64,
    /// Sorted by id.
    pub records: Vec<SnapshotRecord>,
}

/// Every collection of a school, in `Collection::ALL` order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub collections: Vec<SnapshotCollection>,
}

impl Snapshot {
    /// Capture the current content of a school.
    pub fn capture(school: &School) -> Result<Self, SchoolError> {
        let store = school.store();
        let mut collections = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let records = store
                .scan(collection)?
                .into_iter()
                .map(|(id, bytes)| SnapshotRecord { id: id.0, bytes })
                .collect();
            collections.push(SnapshotCollection {
                collection,
                next_id: store.next_id(collection)?.0,
                records,
            });
        }
        Ok(Self { collections })
    }

    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.collections
            .iter()
            .map(|c| c.records.len() as u64)
            .sum()
    }

    /// Deterministic 64-bit rolling checksum of the data.
    ///
    /// This detects accidental corruption. It is not collision resistant;
    /// enable `crypto-hash` for a BLAKE3 digest.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        fn mix(hash: u64, value: u64) -> u64 {
            (hash.rotate_left(13) ^ value).wrapping_mul(PRIME)
        }

        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for collection in &self.collections {
            for byte in collection.collection.name().bytes() {
                hash = mix(hash, u64::from(byte));
            }
            hash = mix(hash, collection.next_id);
            for record in &collection.records {
                hash = mix(hash, record.id);
                hash = mix(hash, record.bytes.len() as u64);
                for byte in &record.bytes {
                    hash = mix(hash, u64::from(*byte));
                }
            }
        }
        hash
    }

    /// Structural checks that do not need the store.
    fn validate(&self) -> Result<(), SchoolError> {
        let mut seen = BTreeSet::new();
        for collection in &self.collections {
            if !seen.insert(collection.collection) {
                return Err(SchoolError::DeserializationError(format!(
                    "Collection {} appears twice",
                    collection.collection
                )));
            }
            let mut previous = 0u64;
            for record in &collection.records {
                if record.id == 0 || record.id <= previous {
                    return Err(SchoolError::DeserializationError(format!(
                        "{} ids are not strictly increasing",
                        collection.collection
                    )));
                }
                if record.id >= collection.next_id {
                    return Err(SchoolError::DeserializationError(format!(
                        "{} record {} is beyond next id {}",
                        collection.collection, record.id, collection.next_id
                    )));
                }
                check_record(collection.collection, RecordId(record.id), &record.bytes)?;
                previous = record.id;
            }
        }
        Ok(())
    }
}

/// Decode a record as its collection's document type.
fn check_record(collection: Collection, id: RecordId, bytes: &[u8]) -> Result<(), SchoolError> {
    fn check<T: Document>(id: RecordId, bytes: &[u8]) -> Result<(), SchoolError> {
        decode::<T>(id, bytes).map(|_| ())
    }
    match collection {
        Collection::Students => check::<Student>(id, bytes),
        Collection::Employees => check::<Employee>(id, bytes),
        Collection::Classes => check::<SchoolClass>(id, bytes),
        Collection::Attendance => check::<AttendanceRecord>(id, bytes),
        Collection::FeeInvoices => check::<FeeInvoice>(id, bytes),
        Collection::Payments => check::<Payment>(id, bytes),
        Collection::Exams => check::<Exam>(id, bytes),
        Collection::ExamResults => check::<ExamResult>(id, bytes),
        Collection::Homework => check::<Homework>(id, bytes),
        Collection::Submissions => check::<Submission>(id, bytes),
        Collection::Notifications => check::<Notification>(id, bytes),
        Collection::Deliveries => check::<Delivery>(id, bytes),
        Collection::Messages => check::<Message>(id, bytes),
    }
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Serialize a school to the snapshot format.
pub fn export_snapshot(school: &School) -> Result<Vec<u8>, SchoolError> {
    let snapshot = Snapshot::capture(school)?;
    let header = SnapshotHeader::new(snapshot.record_count(), snapshot.checksum());

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| SchoolError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&snapshot)
        .map_err(|e| SchoolError::SerializationError(format!("Data: {}", e)))?;
    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| SchoolError::SerializationError("Header too large".to_string()))?;

    let mut out = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&data_bytes);
    Ok(out)
}

/// Parse and verify snapshot bytes without touching a store.
pub fn read_snapshot(data: &[u8]) -> Result<Snapshot, SchoolError> {
    let (len_bytes, rest) = data
        .split_first_chunk::<4>()
        .ok_or_else(|| SchoolError::DeserializationError("Data too short".to_string()))?;
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(SchoolError::DeserializationError(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, data_bytes) = rest.split_at(header_len);

    let header: SnapshotHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| SchoolError::DeserializationError(format!("Header: {}", e)))?;
    header.validate()?;

    let snapshot: Snapshot = postcard::from_bytes(data_bytes)
        .map_err(|e| SchoolError::DeserializationError(format!("Data: {}", e)))?;

    let computed = snapshot.checksum();
    if computed != header.checksum {
        return Err(SchoolError::DeserializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if snapshot.record_count() != header.record_count {
        return Err(SchoolError::DeserializationError(
            "Record count mismatch".to_string(),
        ));
    }
    snapshot.validate()?;
    Ok(snapshot)
}

/// Restore a snapshot into an empty school in one batch.
///
/// Returns the number of records written.
pub fn import_snapshot(school: &mut School, data: &[u8]) -> Result<u64, SchoolError> {
    let snapshot = read_snapshot(data)?;
    if !school.is_empty()? {
        return Err(SchoolError::Conflict(
            "snapshots can only be imported into an empty school".to_string(),
        ));
    }

    let count = snapshot.record_count();
    let mut batch = WriteBatch::new();
    for collection in snapshot.collections {
        for record in collection.records {
            batch.put(collection.collection, RecordId(record.id), record.bytes);
        }
        batch.set_next_id(collection.collection, RecordId(collection.next_id));
    }
    school.commit(batch)?;
    Ok(count)
}

impl School {
    /// An in-memory school restored from snapshot bytes.
    pub fn from_snapshot(data: &[u8]) -> Result<Self, SchoolError> {
        let mut school = Self::new();
        import_snapshot(&mut school, data)?;
        Ok(school)
    }
}

/// Whether a school's content matches snapshot bytes.
pub fn verify_snapshot(school: &School, data: &[u8]) -> Result<bool, SchoolError> {
    let theirs = read_snapshot(data)?;
    Ok(Snapshot::capture(school)? == theirs)
}

/// Checksum of a school's current content.
pub fn snapshot_checksum(school: &School) -> Result<u64, SchoolError> {
    Ok(Snapshot::capture(school)?.checksum())
}

// =============================================================================
// CRYPTOGRAPHIC HASH
// =============================================================================

/// BLAKE3 hex digest of the school's snapshot bytes.
#[cfg(feature = "crypto-hash")]
pub fn snapshot_crypto_hash(school: &School) -> Result<String, SchoolError> {
    Ok(compute_blake3_hash(&export_snapshot(school)?))
}

/// BLAKE3 hex digest of arbitrary bytes.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Gender, Guardian};
    use chrono::NaiveDate;

    fn sample() -> School {
        let mut school = School::new();
        let c = school
            .insert(SchoolClass {
                name: "Grade 9".to_string(),
                section: "A".to_string(),
                academic_year: "2025-2026".to_string(),
                class_teacher_id: None,
            })
            .unwrap();
        for no in ["X1", "X2", "X3"] {
            school
                .insert(Student {
                    admission_no: no.to_string(),
                    first_name: "Eve".to_string(),
                    last_name: no.to_string(),
                    gender: Gender::Female,
                    date_of_birth: None,
                    class_id: Some(c.id),
                    guardian: Guardian {
                        name: "G".to_string(),
                        phone: "1".to_string(),
                        email: None,
                    },
                    enrolled_on: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                    active: true,
                })
                .unwrap();
        }
        school.remove::<Student>(RecordId(2)).unwrap();
        school
    }

    #[test]
    fn export_import_preserves_ids_and_sequences() {
        let school = sample();
        let bytes = export_snapshot(&school).unwrap();
        let mut restored = School::from_snapshot(&bytes).unwrap();

        assert_eq!(restored.count(Collection::Students).unwrap(), 2);
        assert!(restored.find::<Student>(RecordId(2)).unwrap().is_none());
        assert!(verify_snapshot(&restored, &bytes).unwrap());

        // the deleted id stays retired
        let template = restored.get::<Student>(RecordId(1)).unwrap().data;
        let next = restored
            .insert(Student {
                admission_no: "X4".to_string(),
                ..template
            })
            .unwrap();
        assert_eq!(next.id, RecordId(4));
    }

    #[test]
    fn export_is_deterministic() {
        let a = export_snapshot(&sample()).unwrap();
        let b = export_snapshot(&sample()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            snapshot_checksum(&sample()).unwrap(),
            snapshot_checksum(&sample()).unwrap()
        );
    }

    #[test]
    fn corrupted_data_rejected() {
        let mut bytes = export_snapshot(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(read_snapshot(&bytes).is_err());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = export_snapshot(&sample()).unwrap();
        // first header byte after the length prefix is the magic
        bytes[4] = b'X';
        assert!(read_snapshot(&bytes).is_err());
    }

    #[test]
    fn short_input_rejected() {
        assert!(read_snapshot(&[1, 0]).is_err());
        assert!(read_snapshot(&[200, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn import_requires_empty_school() {
        let bytes = export_snapshot(&sample()).unwrap();
        let mut target = sample();
        assert!(matches!(
            import_snapshot(&mut target, &bytes),
            Err(SchoolError::Conflict(_))
        ));
    }

    #[test]
    fn empty_school_round_trips() {
        let bytes = export_snapshot(&School::new()).unwrap();
        let restored = School::from_snapshot(&bytes).unwrap();
        assert!(restored.is_empty().unwrap());
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn blake3_digest_is_hex() {
        let hash = snapshot_crypto_hash(&sample()).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
