//! In-memory document store.

use super::{DocumentStore, FIRST_ID, WriteBatch, WriteOp, advance_sequence};
use crate::{Collection, RecordId, SchoolError};
use std::collections::BTreeMap;

/// A volatile store backed by nested `BTreeMap`s.
///
/// Batches are applied to a copy of the touched collections and swapped in
/// only once every operation succeeded.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<Collection, BTreeMap<u64, Vec<u8>>>,
    sequences: BTreeMap<Collection, u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sequence(&self, collection: Collection) -> u64 {
        self.sequences
            .get(&collection)
            .copied()
            .unwrap_or(FIRST_ID)
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: Collection, id: RecordId) -> Result<Option<Vec<u8>>, SchoolError> {
        Ok(self
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(&id.0))
            .cloned())
    }

    fn scan(&self, collection: Collection) -> Result<Vec<(RecordId, Vec<u8>)>, SchoolError> {
        Ok(self
            .collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, bytes)| (RecordId(*id), bytes.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn count(&self, collection: Collection) -> Result<usize, SchoolError> {
        Ok(self.collections.get(&collection).map_or(0, BTreeMap::len))
    }

    fn next_id(&self, collection: Collection) -> Result<RecordId, SchoolError> {
        Ok(RecordId(self.sequence(collection)))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<Vec<RecordId>, SchoolError> {
        let mut staged_docs: BTreeMap<Collection, BTreeMap<u64, Vec<u8>>> = BTreeMap::new();
        let mut staged_seqs: BTreeMap<Collection, u64> = BTreeMap::new();
        let mut assigned = Vec::new();

        for op in batch.into_ops() {
            let collection = match &op {
                WriteOp::Insert(c, _)
                | WriteOp::Put(c, _, _)
                | WriteOp::Delete(c, _)
                | WriteOp::SetNextId(c, _) => *c,
            };
            let docs = staged_docs.entry(collection).or_insert_with(|| {
                self.collections
                    .get(&collection)
                    .cloned()
                    .unwrap_or_default()
            });
            let seq = staged_seqs
                .entry(collection)
                .or_insert_with(|| self.sequence(collection));

            match op {
                WriteOp::Insert(_, bytes) => {
                    let id = *seq;
                    *seq = seq.checked_add(1).ok_or_else(|| {
                        SchoolError::IoError(format!("{} id space exhausted", collection))
                    })?;
                    docs.insert(id, bytes);
                    assigned.push(RecordId(id));
                }
                WriteOp::Put(_, id, bytes) => {
                    docs.insert(id.0, bytes);
                    *seq = advance_sequence(*seq, RecordId(id.0.saturating_add(1)));
                }
                WriteOp::Delete(_, id) => {
                    docs.remove(&id.0);
                }
                WriteOp::SetNextId(_, next) => {
                    *seq = advance_sequence(*seq, next);
                }
            }
        }

        for (collection, docs) in staged_docs {
            self.collections.insert(collection, docs);
        }
        self.sequences.extend(staged_seqs);
        Ok(assigned)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn inserts_get_sequential_ids_from_one() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.insert(Collection::Students, vec![1]);
        batch.insert(Collection::Students, vec![2]);
        batch.insert(Collection::Employees, vec![3]);

        let ids = store.commit(batch).unwrap();
        assert_eq!(ids, vec![RecordId(1), RecordId(2), RecordId(1)]);
        assert_eq!(store.count(Collection::Students).unwrap(), 2);
        assert_eq!(store.next_id(Collection::Students).unwrap(), RecordId(3));
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.insert(Collection::Exams, vec![1]);
        store.commit(batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete(Collection::Exams, RecordId(1));
        batch.insert(Collection::Exams, vec![2]);
        let ids = store.commit(batch).unwrap();

        assert_eq!(ids, vec![RecordId(2)]);
        assert!(store.get(Collection::Exams, RecordId(1)).unwrap().is_none());
    }

    #[test]
    fn put_moves_sequence_past_explicit_ids() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Collection::Classes, RecordId(10), vec![9]);
        store.commit(batch).unwrap();
        assert_eq!(store.next_id(Collection::Classes).unwrap(), RecordId(11));
    }

    #[test]
    fn scan_is_ordered_by_id() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Collection::Messages, RecordId(5), vec![5]);
        batch.put(Collection::Messages, RecordId(2), vec![2]);
        batch.put(Collection::Messages, RecordId(9), vec![9]);
        store.commit(batch).unwrap();

        let ids: Vec<u64> = store
            .scan(Collection::Messages)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.0)
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn set_next_id_never_moves_backwards() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set_next_id(Collection::Payments, RecordId(40));
        batch.set_next_id(Collection::Payments, RecordId(7));
        store.commit(batch).unwrap();
        assert_eq!(store.next_id(Collection::Payments).unwrap(), RecordId(40));
    }
}
