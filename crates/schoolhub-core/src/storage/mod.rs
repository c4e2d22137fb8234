//! # Storage Module
//!
//! Document storage backends.
//!
//! Stores deal in raw postcard bytes keyed by `(Collection, RecordId)`;
//! typing and integrity checks live one layer up in `School`.
//!
//! - `MemoryStore`: BTreeMap-backed, volatile
//! - `RedbStore`: redb-backed, ACID, persistent

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{Collection, RecordId, SchoolError};

/// A single write inside a `WriteBatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store a new document under the collection's next id.
    Insert(Collection, Vec<u8>),
    /// Store (or overwrite) a document under a known id.
    Put(Collection, RecordId, Vec<u8>),
    /// Remove a document. Removing a missing document is not an error.
    Delete(Collection, RecordId),
    /// Move the id sequence of a collection. Only ever moves forward.
    SetNextId(Collection, RecordId),
}

/// An ordered group of writes applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: Collection, bytes: Vec<u8>) {
        self.ops.push(WriteOp::Insert(collection, bytes));
    }

    pub fn put(&mut self, collection: Collection, id: RecordId, bytes: Vec<u8>) {
        self.ops.push(WriteOp::Put(collection, id, bytes));
    }

    pub fn delete(&mut self, collection: Collection, id: RecordId) {
        self.ops.push(WriteOp::Delete(collection, id));
    }

    pub fn set_next_id(&mut self, collection: Collection, next: RecordId) {
        self.ops.push(WriteOp::SetNextId(collection, next));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch, yielding its operations in order.
    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Raw document storage.
///
/// Implementations must:
/// - iterate `scan` results in ascending id order
/// - apply a `WriteBatch` entirely or not at all
/// - hand out ids from 1 upwards, never reusing one
pub trait DocumentStore {
    /// Fetch one document.
    fn get(&self, collection: Collection, id: RecordId) -> Result<Option<Vec<u8>>, SchoolError>;

    /// Fetch every document of a collection, ordered by id.
    fn scan(&self, collection: Collection) -> Result<Vec<(RecordId, Vec<u8>)>, SchoolError>;

    /// Number of documents in a collection.
    fn count(&self, collection: Collection) -> Result<usize, SchoolError>;

    /// The id the next insert into `collection` will receive.
    fn next_id(&self, collection: Collection) -> Result<RecordId, SchoolError>;

    /// Apply a batch atomically.
    ///
    /// Returns the ids assigned to `Insert` operations, in batch order.
    fn commit(&mut self, batch: WriteBatch) -> Result<Vec<RecordId>, SchoolError>;
}

/// Sequence value after applying `SetNextId` to `current`.
pub(crate) fn advance_sequence(current: u64, requested: RecordId) -> u64 {
    current.max(requested.0)
}

/// Sequences start at 1 so that id 0 is never handed out.
pub(crate) const FIRST_ID: u64 = 1;
