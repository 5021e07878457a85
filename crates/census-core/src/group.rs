// File: crates/census-core/src/group.rs
// Summary: Per-dimension groups holding one accumulator per facet value, plus typed handles.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::dimension::{DimensionId, KeyId};
use crate::error::ReduceError;
use crate::facet::FacetValue;
use crate::reduce::Reducer;
use crate::store::RecordId;

/// Typed handle to a group registered on a `Crossfilter`.
pub struct GroupId<F> {
    pub(crate) index: usize,
    _reducer: PhantomData<fn() -> F>,
}

impl<F> GroupId<F> {
    pub(crate) fn new(index: usize) -> Self {
        Self { index, _reducer: PhantomData }
    }

    pub fn index(&self) -> usize { self.index }
}

impl<F> Clone for GroupId<F> {
    fn clone(&self) -> Self { *self }
}

impl<F> Copy for GroupId<F> {}

impl<F> fmt::Debug for GroupId<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.index)
    }
}

/// Aggregator attached to one dimension.
pub struct Group<R, F: Reducer<R>> {
    dimension: DimensionId,
    keys: Rc<[FacetValue]>,
    reducer: F,
    values: Vec<F::Value>,
    // records currently folded into each key
    tallies: Vec<u32>,
    _record: PhantomData<fn(&R)>,
}

impl<R, F: Reducer<R>> Group<R, F> {
    pub(crate) fn new(dimension: DimensionId, keys: Rc<[FacetValue]>, reducer: F) -> Self {
        let values = (0..keys.len()).map(|_| reducer.init()).collect();
        let tallies = vec![0; keys.len()];
        Self { dimension, keys, reducer, values, tallies, _record: PhantomData }
    }

    pub fn dimension(&self) -> DimensionId { self.dimension }

    pub fn reducer(&self) -> &F { &self.reducer }

    /// Number of keys (including ones whose value is back at `init()`).
    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    pub fn get(&self, key: &FacetValue) -> Option<&F::Value> {
        self.keys.binary_search(key).ok().map(|k| &self.values[k])
    }

    /// Active records currently folded into `key`.
    pub fn tally(&self, key: &FacetValue) -> u32 {
        self.keys.binary_search(key).map(|k| self.tallies[k]).unwrap_or(0)
    }

    /// Every key with its value, ascending by key.
    pub fn all(&self) -> Vec<(&FacetValue, &F::Value)> {
        self.keys.iter().zip(self.values.iter()).collect()
    }

    pub fn all_where<P>(&self, mut keep: P) -> Vec<(&FacetValue, &F::Value)>
    where
        P: FnMut(&F::Value) -> bool,
    {
        self.keys
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| keep(v))
            .collect()
    }

    /// The `n` entries ranked greatest by `cmp`; ties keep key order.
    /// `usize::MAX` returns every entry.
    pub fn top_by<C>(&self, n: usize, mut cmp: C) -> Vec<(&FacetValue, &F::Value)>
    where
        C: FnMut(&F::Value, &F::Value) -> Ordering,
    {
        let mut entries = self.all();
        entries.sort_by(|a, b| cmp(b.1, a.1));
        entries.truncate(n);
        entries
    }

    pub fn top(&self, n: usize) -> Vec<(&FacetValue, &F::Value)>
    where
        F::Value: Ord,
    {
        self.top_by(n, |a, b| a.cmp(b))
    }

    fn fold_in(&mut self, id: RecordId, record: &R, keys: &[KeyId]) {
        for &k in keys {
            self.reducer.add(&mut self.values[k], id, record);
            self.tallies[k] += 1;
        }
    }

    fn fold_out(&mut self, id: RecordId, record: &R, keys: &[KeyId]) {
        for &k in keys {
            if self.tallies[k] == 0 {
                self.violation(k, id, ReduceError::Underflow);
                continue;
            }
            match self.reducer.remove(&mut self.values[k], id, record) {
                Ok(()) => self.tallies[k] -= 1,
                Err(e) => self.violation(k, id, e),
            }
        }
    }

    fn violation(&self, key: KeyId, id: RecordId, err: ReduceError) {
        log::error!(
            "group on dimension #{} rejected removal of record {} from key {:?}: {}",
            self.dimension.0,
            id,
            self.keys[key],
            err
        );
        if cfg!(debug_assertions) {
            panic!("stale remove of record {id} from key {:?}: {err}", self.keys[key]);
        }
    }
}

impl<R, F> fmt::Debug for Group<R, F>
where
    F: Reducer<R>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("dimension", &self.dimension)
            .field("values", &self.all())
            .finish()
    }
}

/// Object-safe face of `Group` so one engine can own groups of mixed reducers.
pub(crate) trait Aggregate<R> {
    fn dimension(&self) -> DimensionId;
    fn enter(&mut self, id: RecordId, record: &R, keys: &[KeyId]);
    fn leave(&mut self, id: RecordId, record: &R, keys: &[KeyId]);
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
}

impl<R: 'static, F: Reducer<R> + 'static> Aggregate<R> for Group<R, F> {
    fn dimension(&self) -> DimensionId { self.dimension }

    fn enter(&mut self, id: RecordId, record: &R, keys: &[KeyId]) {
        self.fold_in(id, record, keys);
    }

    fn leave(&mut self, id: RecordId, record: &R, keys: &[KeyId]) {
        self.fold_out(id, record, keys);
    }

    fn clear(&mut self) {
        for v in self.values.iter_mut() {
            *v = self.reducer.init();
        }
        self.tallies.iter_mut().for_each(|t| *t = 0);
    }

    fn as_any(&self) -> &dyn Any { self }
}
