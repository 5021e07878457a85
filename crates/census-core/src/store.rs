// File: crates/census-core/src/store.rs
// Summary: Immutable record store produced by ingestion and shared by the engine.

use std::ops::Index;
use std::rc::Rc;

/// Position of a record in its store; stable for the store's lifetime.
pub type RecordId = usize;

pub struct RecordStore<R> {
    records: Rc<[R]>,
    dropped: usize,
}

impl<R> RecordStore<R> {
    /// Map raw rows into records, skipping rows the mapper rejects.
    pub fn ingest<I, T, M>(rows: I, mut mapper: M) -> Self
    where
        I: IntoIterator<Item = T>,
        M: FnMut(T) -> Option<R>,
    {
        let mut records = Vec::new();
        let mut dropped = 0usize;
        for row in rows {
            match mapper(row) {
                Some(r) => records.push(r),
                None => dropped += 1,
            }
        }
        log::info!("ingested {} records ({} rows dropped)", records.len(), dropped);
        Self { records: records.into(), dropped }
    }

    pub fn from_records(records: Vec<R>) -> Self {
        Self { records: records.into(), dropped: 0 }
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Number of raw rows the ingestion mapper skipped.
    pub fn dropped(&self) -> usize { self.dropped }

    pub fn get(&self, id: RecordId) -> Option<&R> { self.records.get(id) }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &R)> + '_ {
        self.records.iter().enumerate()
    }

    pub fn records(&self) -> &[R] { &self.records }
}

// Manual impl: sharing the slice does not need `R: Clone`.
impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self { records: Rc::clone(&self.records), dropped: self.dropped }
    }
}

impl<R> Index<RecordId> for RecordStore<R> {
    type Output = R;
    fn index(&self, id: RecordId) -> &R { &self.records[id] }
}
