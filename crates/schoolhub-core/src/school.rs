//! # School Module
//!
//! The typed facade over a document store.
//!
//! `School` owns the storage backend and enforces the rules every document
//! obeys, whatever its collection:
//! - local validation (`Document::validate`)
//! - referenced documents must exist (`Document::references`)
//! - unique keys stay unique (`Document::unique_key`)
//! - removal cascades to owned children and is refused while anything
//!   else still points at the document
//!
//! The domain services (`attendance`, `billing`, `grading`, ...) add
//! `impl School` blocks on top of these primitives.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile unless exported)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)

use crate::model::{
    AttendanceRecord, Delivery, Employee, Exam, ExamResult, FeeInvoice, Homework, Message,
    Notification, Payment, SchoolClass, Student, Submission,
};
use crate::storage::{DocumentStore, MemoryStore, RedbStore, WriteBatch};
use crate::{Collection, Document, RecordId, Record, Reference, SchoolError};
use std::collections::BTreeSet;
use std::path::Path;

/// Storage backend for a School.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn DocumentStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn DocumentStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

/// Encode a document for storage.
pub(crate) fn encode<T: Document>(doc: &T) -> Result<Vec<u8>, SchoolError> {
    postcard::to_allocvec(doc).map_err(|e| {
        SchoolError::SerializationError(format!("{}: {}", T::COLLECTION, e))
    })
}

/// Decode a stored document.
pub(crate) fn decode<T: Document>(id: RecordId, bytes: &[u8]) -> Result<T, SchoolError> {
    postcard::from_bytes(bytes).map_err(|e| {
        SchoolError::DeserializationError(format!("{} record {}: {}", T::COLLECTION, id, e))
    })
}

/// A school: every collection behind one storage backend.
#[derive(Debug, Default)]
pub struct School {
    backend: StorageBackend,
}

impl School {
    /// Create an empty school with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or create) a school backed by a redb database file.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, SchoolError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Whether writes reach disk without an explicit export.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    // =========================================================================
    // RAW ACCESS
    // =========================================================================

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.backend.store()
    }

    /// Apply a prepared batch.
    pub(crate) fn commit(&mut self, batch: WriteBatch) -> Result<Vec<RecordId>, SchoolError> {
        self.backend.store_mut().commit(batch)
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: Collection) -> Result<usize, SchoolError> {
        self.store().count(collection)
    }

    /// Whether a referenced document exists.
    pub fn exists(&self, reference: Reference) -> Result<bool, SchoolError> {
        Ok(self.store().get(reference.collection, reference.id)?.is_some())
    }

    /// Whether every collection is empty.
    pub fn is_empty(&self) -> Result<bool, SchoolError> {
        for collection in Collection::ALL {
            if self.count(collection)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // =========================================================================
    // TYPED READS
    // =========================================================================

    /// Fetch a document, or `None` if it does not exist.
    pub fn find<T: Document>(&self, id: RecordId) -> Result<Option<T>, SchoolError> {
        self.store()
            .get(T::COLLECTION, id)?
            .map(|bytes| decode(id, &bytes))
            .transpose()
    }

    /// Fetch a document, failing with `NotFound` if it does not exist.
    pub fn get<T: Document>(&self, id: RecordId) -> Result<Record<T>, SchoolError> {
        self.find(id)?
            .map(|data| Record::new(id, data))
            .ok_or_else(|| SchoolError::not_found(T::COLLECTION, id))
    }

    /// Every document of a collection, ordered by id.
    pub fn list<T: Document>(&self) -> Result<Vec<Record<T>>, SchoolError> {
        self.store()
            .scan(T::COLLECTION)?
            .into_iter()
            .map(|(id, bytes)| decode(id, &bytes).map(|data| Record::new(id, data)))
            .collect()
    }

    /// Documents matching a predicate, ordered by id.
    pub fn list_where<T: Document>(
        &self,
        predicate: impl Fn(&T) -> bool,
    ) -> Result<Vec<Record<T>>, SchoolError> {
        let mut out = Vec::new();
        for (id, bytes) in self.store().scan(T::COLLECTION)? {
            let data: T = decode(id, &bytes)?;
            if predicate(&data) {
                out.push(Record::new(id, data));
            }
        }
        Ok(out)
    }

    // =========================================================================
    // TYPED WRITES
    // =========================================================================

    /// Check a document against the school before it is written.
    ///
    /// `exclude` is the document's own id when replacing, so it does not
    /// collide with its own unique key.
    pub(crate) fn check<T: Document>(
        &self,
        doc: &T,
        exclude: Option<RecordId>,
    ) -> Result<(), SchoolError> {
        doc.validate()?;

        for reference in doc.references() {
            if !self.exists(reference)? {
                return Err(SchoolError::Validation(format!(
                    "referenced {} record {} does not exist",
                    reference.collection, reference.id
                )));
            }
        }

        if let Some(key) = doc.unique_key() {
            if let Some(existing) = self.find_by_key::<T>(&key)? {
                if Some(existing) != exclude {
                    return Err(SchoolError::Conflict(format!(
                        "{} record {} already uses key '{}'",
                        T::COLLECTION,
                        existing,
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    /// Id of the document holding a unique key, if any.
    pub(crate) fn find_by_key<T: Document>(
        &self,
        key: &str,
    ) -> Result<Option<RecordId>, SchoolError> {
        for (id, bytes) in self.store().scan(T::COLLECTION)? {
            let doc: T = decode(id, &bytes)?;
            if doc.unique_key().as_deref() == Some(key) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Validate and store a new document.
    pub fn insert<T: Document>(&mut self, doc: T) -> Result<Record<T>, SchoolError> {
        self.check(&doc, None)?;
        let mut batch = WriteBatch::new();
        batch.insert(T::COLLECTION, encode(&doc)?);
        let ids = self.commit(batch)?;
        let id = ids.first().copied().ok_or_else(|| {
            SchoolError::IoError(format!("{} insert assigned no id", T::COLLECTION))
        })?;
        Ok(Record::new(id, doc))
    }

    /// Validate and store several documents of one collection in one batch.
    ///
    /// Either every document is stored or none is. Unique keys must also be
    /// distinct within the batch.
    pub fn insert_all<T: Document>(&mut self, docs: Vec<T>) -> Result<Vec<Record<T>>, SchoolError> {
        let mut keys = BTreeSet::new();
        let mut batch = WriteBatch::new();
        for doc in &docs {
            self.check(doc, None)?;
            if let Some(key) = doc.unique_key() {
                if !keys.insert(key.clone()) {
                    return Err(SchoolError::Conflict(format!(
                        "{} key '{}' appears twice in the batch",
                        T::COLLECTION,
                        key
                    )));
                }
            }
            batch.insert(T::COLLECTION, encode(doc)?);
        }
        let ids = self.commit(batch)?;
        if ids.len() != docs.len() {
            return Err(SchoolError::IoError(format!(
                "{} batch assigned {} ids for {} documents",
                T::COLLECTION,
                ids.len(),
                docs.len()
            )));
        }
        Ok(ids.into_iter().zip(docs).map(|(id, doc)| Record::new(id, doc)).collect())
    }

    /// Validate and overwrite an existing document.
    pub fn replace<T: Document>(&mut self, id: RecordId, doc: T) -> Result<Record<T>, SchoolError> {
        if self.find::<T>(id)?.is_none() {
            return Err(SchoolError::not_found(T::COLLECTION, id));
        }
        self.check(&doc, Some(id))?;
        let mut batch = WriteBatch::new();
        batch.put(T::COLLECTION, id, encode(&doc)?);
        self.commit(batch)?;
        Ok(Record::new(id, doc))
    }

    /// Remove a document together with the children it owns.
    ///
    /// Fails with `Conflict` while documents outside the owned collections
    /// still reference it.
    pub fn remove<T: Document>(&mut self, id: RecordId) -> Result<Record<T>, SchoolError> {
        let record = self.get::<T>(id)?;
        let target = Reference::new(T::COLLECTION, id);
        let owned = T::COLLECTION.owned_children();

        let referrers = self.referrers(target)?;
        let (cascade, blocking): (Vec<Reference>, Vec<Reference>) = referrers
            .into_iter()
            .partition(|r| owned.contains(&r.collection));

        if !blocking.is_empty() {
            let names: Vec<String> = blocking.iter().map(ToString::to_string).collect();
            return Err(SchoolError::Conflict(format!(
                "{} is still referenced by {}",
                target,
                names.join(", ")
            )));
        }

        let mut batch = WriteBatch::new();
        for child in cascade {
            batch.delete(child.collection, child.id);
        }
        batch.delete(T::COLLECTION, id);
        self.commit(batch)?;
        Ok(record)
    }

    // =========================================================================
    // REFERENTIAL INTEGRITY
    // =========================================================================

    /// Every document that references `target`, ordered by collection then id.
    pub fn referrers(&self, target: Reference) -> Result<Vec<Reference>, SchoolError> {
        let mut found = BTreeSet::new();
        self.collect_referrers::<Student>(target, &mut found)?;
        self.collect_referrers::<Employee>(target, &mut found)?;
        self.collect_referrers::<SchoolClass>(target, &mut found)?;
        self.collect_referrers::<AttendanceRecord>(target, &mut found)?;
        self.collect_referrers::<FeeInvoice>(target, &mut found)?;
        self.collect_referrers::<Payment>(target, &mut found)?;
        self.collect_referrers::<Exam>(target, &mut found)?;
        self.collect_referrers::<ExamResult>(target, &mut found)?;
        self.collect_referrers::<Homework>(target, &mut found)?;
        self.collect_referrers::<Submission>(target, &mut found)?;
        self.collect_referrers::<Notification>(target, &mut found)?;
        self.collect_referrers::<Delivery>(target, &mut found)?;
        self.collect_referrers::<Message>(target, &mut found)?;
        Ok(found.into_iter().collect())
    }

    fn collect_referrers<T: Document>(
        &self,
        target: Reference,
        found: &mut BTreeSet<Reference>,
    ) -> Result<(), SchoolError> {
        for (id, bytes) in self.store().scan(T::COLLECTION)? {
            let doc: T = decode(id, &bytes)?;
            if doc.references().contains(&target) {
                found.insert(Reference::new(T::COLLECTION, id));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
