// File: crates/census-core/src/dimension.rs
// Summary: Dimension = projection of records to facet values plus its current filter.
// Notes:
// - Distinct facet values are indexed once at construction (sorted key table
//   plus per-key posting lists), so a filter change only evaluates the filter
//   per distinct key and touches the records of keys whose verdict flipped.
// - A faceted record passes when ANY of its facet values passes; `hits` counts
//   the passing facets of each record.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use crate::facet::{FacetValue, Filter};
use crate::store::{RecordId, RecordStore};

/// Index into a dimension's sorted key table.
pub(crate) type KeyId = usize;

/// Handle naming a dimension of one `Crossfilter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DimensionId(pub(crate) usize);

impl DimensionId {
    pub fn index(self) -> usize { self.0 }
}

type Projection<R> = Box<dyn Fn(&R) -> Vec<FacetValue>>;

pub struct Dimension<R> {
    name: String,
    faceted: bool,
    projection: Projection<R>,
    keys: Rc<[FacetValue]>,
    postings: Vec<Vec<RecordId>>,
    facets: Vec<Vec<KeyId>>,
    // records with no facet value at all; they only pass `Filter::All`
    bare: Vec<RecordId>,
    key_pass: Vec<bool>,
    hits: Vec<u32>,
    filter: Filter,
}

impl<R> Dimension<R> {
    pub(crate) fn build(
        name: String,
        faceted: bool,
        projection: Projection<R>,
        store: &RecordStore<R>,
    ) -> Self {
        let mut projected: Vec<Vec<FacetValue>> = Vec::with_capacity(store.len());
        let mut postings_by_key: BTreeMap<FacetValue, Vec<RecordId>> = BTreeMap::new();
        for (id, record) in store.iter() {
            let values: BTreeSet<FacetValue> = projection(record).into_iter().collect();
            for v in &values {
                postings_by_key.entry(v.clone()).or_default().push(id);
            }
            projected.push(values.into_iter().collect());
        }

        let keys: Vec<FacetValue> = postings_by_key.keys().cloned().collect();
        let postings: Vec<Vec<RecordId>> = postings_by_key.into_values().collect();
        let facets: Vec<Vec<KeyId>> = projected
            .iter()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| keys.binary_search(v).ok())
                    .collect()
            })
            .collect();
        let bare = facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_empty())
            .map(|(id, _)| id)
            .collect();
        let hits = facets.iter().map(|f| f.len() as u32).collect();

        log::debug!("dimension '{}' indexed {} distinct keys", name, keys.len());
        Self {
            name,
            faceted,
            projection,
            key_pass: vec![true; keys.len()],
            keys: keys.into(),
            postings,
            facets,
            bare,
            hits,
            filter: Filter::All,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn is_faceted(&self) -> bool { self.faceted }

    pub fn filter(&self) -> &Filter { &self.filter }

    /// Distinct facet values observed at construction, ascending.
    pub fn keys(&self) -> &[FacetValue] { &self.keys }

    pub(crate) fn shared_keys(&self) -> Rc<[FacetValue]> { Rc::clone(&self.keys) }

    /// Facet values of an arbitrary record under this dimension's projection.
    pub fn project(&self, record: &R) -> Vec<FacetValue> {
        let values: BTreeSet<FacetValue> = (self.projection)(record).into_iter().collect();
        values.into_iter().collect()
    }

    /// Facet values of an ingested record.
    pub fn facets(&self, id: RecordId) -> impl Iterator<Item = &FacetValue> + '_ {
        self.facet_ids(id).iter().map(move |&k| &self.keys[k])
    }

    pub(crate) fn facet_ids(&self, id: RecordId) -> &[KeyId] {
        self.facets.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True iff the record's facet value(s) satisfy this dimension's filter.
    pub fn passes(&self, id: RecordId) -> bool {
        match self.hits.get(id) {
            Some(&h) if h > 0 => true,
            Some(_) => self.filter.is_all() && self.facets[id].is_empty(),
            None => false,
        }
    }

    /// Replace the filter; returns the records whose `passes` verdict changed,
    /// in ascending id order, with their new verdict.
    pub(crate) fn refilter(&mut self, filter: Filter) -> Vec<(RecordId, bool)> {
        let next_pass: Vec<bool> = self.keys.iter().map(|k| filter.matches(k)).collect();
        let flipped: Vec<KeyId> = (0..self.keys.len())
            .filter(|&k| next_pass[k] != self.key_pass[k])
            .collect();
        let bare_flipped = self.filter.is_all() != filter.is_all() && !self.bare.is_empty();

        let mut before: BTreeMap<RecordId, bool> = BTreeMap::new();
        for &k in &flipped {
            for &id in &self.postings[k] {
                before.entry(id).or_insert_with(|| self.passes(id));
            }
        }
        if bare_flipped {
            for &id in &self.bare {
                before.entry(id).or_insert_with(|| self.passes(id));
            }
        }

        for &k in &flipped {
            for &id in &self.postings[k] {
                if next_pass[k] {
                    self.hits[id] += 1;
                } else {
                    self.hits[id] -= 1;
                }
            }
        }
        self.key_pass = next_pass;
        self.filter = filter;

        before
            .into_iter()
            .filter_map(|(id, was)| {
                let now = self.passes(id);
                (now != was).then_some((id, now))
            })
            .collect()
    }
}

impl<R> fmt::Debug for Dimension<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dimension")
            .field("name", &self.name)
            .field("faceted", &self.faceted)
            .field("keys", &self.keys.len())
            .field("filter", &self.filter)
            .finish()
    }
}
