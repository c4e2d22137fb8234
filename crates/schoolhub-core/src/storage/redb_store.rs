//! # redb-backed Document Storage
//!
//! A disk-backed document store using the redb embedded database, providing:
//! - ACID transactions (one write transaction per `WriteBatch`)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! ## Layout
//!
//! - one table per `Collection`: `u64 id -> postcard bytes`
//! - `sequences`: `collection name -> next id`

use super::{DocumentStore, FIRST_ID, WriteBatch, WriteOp, advance_sequence};
use crate::{Collection, RecordId, SchoolError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Table for id sequences: collection name -> next id
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Table holding the documents of one collection.
fn documents(collection: Collection) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(collection.name())
}

fn io(e: impl fmt::Display) -> SchoolError {
    SchoolError::IoError(e.to_string())
}

/// A disk-backed document store using redb.
///
/// Sequence counters are cached in memory and written back inside the
/// same transaction as the documents that consumed them.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Cached next id per collection.
    sequences: BTreeMap<Collection, u64>,
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore")
            .field("sequences", &self.sequences)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a school database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SchoolError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            for collection in Collection::ALL {
                let _ = write_txn.open_table(documents(collection)).map_err(io)?;
            }
            let _ = write_txn.open_table(SEQUENCES).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        // Load sequences
        let sequences = {
            let read_txn = db.begin_read().map_err(io)?;
            let table = read_txn.open_table(SEQUENCES).map_err(io)?;
            let mut sequences = BTreeMap::new();
            for entry in table.iter().map_err(io)? {
                let (key, value) = entry.map_err(io)?;
                // Unknown names come from a newer schema; leave them alone.
                if let Some(collection) = Collection::from_name(key.value()) {
                    sequences.insert(collection, value.value());
                }
            }
            sequences
        };

        Ok(Self { db, sequences })
    }

    fn sequence(&self, collection: Collection) -> u64 {
        self.sequences
            .get(&collection)
            .copied()
            .unwrap_or(FIRST_ID)
    }
}

impl DocumentStore for RedbStore {
    fn get(&self, collection: Collection, id: RecordId) -> Result<Option<Vec<u8>>, SchoolError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(documents(collection)).map_err(io)?;
        Ok(table
            .get(id.0)
            .map_err(io)?
            .map(|guard| guard.value().to_vec()))
    }

    fn scan(&self, collection: Collection) -> Result<Vec<(RecordId, Vec<u8>)>, SchoolError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(documents(collection)).map_err(io)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io)? {
            let (key, value) = entry.map_err(io)?;
            out.push((RecordId(key.value()), value.value().to_vec()));
        }
        Ok(out)
    }

    fn count(&self, collection: Collection) -> Result<usize, SchoolError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let table = read_txn.open_table(documents(collection)).map_err(io)?;
        let len = table.len().map_err(io)?;
        usize::try_from(len).map_err(io)
    }

    fn next_id(&self, collection: Collection) -> Result<RecordId, SchoolError> {
        Ok(RecordId(self.sequence(collection)))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<Vec<RecordId>, SchoolError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut staged: BTreeMap<Collection, u64> = BTreeMap::new();
        let mut assigned = Vec::new();

        let write_txn = self.db.begin_write().map_err(io)?;
        {
            let mut tables = BTreeMap::new();

            for op in batch.into_ops() {
                let collection = match &op {
                    WriteOp::Insert(c, _)
                    | WriteOp::Put(c, _, _)
                    | WriteOp::Delete(c, _)
                    | WriteOp::SetNextId(c, _) => *c,
                };
                if !tables.contains_key(&collection) {
                    let table = write_txn.open_table(documents(collection)).map_err(io)?;
                    tables.insert(collection, table);
                }
                let table = tables
                    .get_mut(&collection)
                    .ok_or_else(|| io(format!("table {} not open", collection)))?;
                let current = staged
                    .get(&collection)
                    .copied()
                    .unwrap_or_else(|| self.sequence(collection));

                let next = match op {
                    WriteOp::Insert(_, bytes) => {
                        table.insert(current, bytes.as_slice()).map_err(io)?;
                        assigned.push(RecordId(current));
                        current.checked_add(1).ok_or_else(|| {
                            io(format!("{} id space exhausted", collection))
                        })?
                    }
                    WriteOp::Put(_, id, bytes) => {
                        table.insert(id.0, bytes.as_slice()).map_err(io)?;
                        advance_sequence(current, RecordId(id.0.saturating_add(1)))
                    }
                    WriteOp::Delete(_, id) => {
                        table.remove(id.0).map_err(io)?;
                        current
                    }
                    WriteOp::SetNextId(_, requested) => advance_sequence(current, requested),
                };
                staged.insert(collection, next);
            }

            let mut seq_table = write_txn.open_table(SEQUENCES).map_err(io)?;
            for (collection, next) in &staged {
                seq_table.insert(collection.name(), *next).map_err(io)?;
            }
        }
        write_txn.commit().map_err(io)?;

        // Only publish new sequences once the transaction is durable.
        self.sequences.extend(staged);
        Ok(assigned)
    }
}
