// File: crates/census-core/src/crossfilter.rs
// Summary: Filter coordinator owning the store, dimensions, and groups; propagates filter changes.
// Notes:
// - A record is active iff it passes the filter of every dimension (the
//   aggregator's own dimension included). `failing` counts, per record, the
//   dimensions it currently fails.
// - A filter change costs O(distinct keys of the changed dimension + records
//   whose verdict on that dimension flipped), plus the fan-out to groups for
//   records whose active status differs once the whole call has settled.

use std::collections::BTreeMap;
use std::fmt;

use crate::dimension::{Dimension, DimensionId};
use crate::error::{CensusError, Result};
use crate::facet::{FacetValue, Filter};
use crate::group::{Aggregate, Group, GroupId};
use crate::reduce::Reducer;
use crate::store::{RecordId, RecordStore};

/// Outcome of one settled `filter`/`apply` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterChange {
    pub dimensions: Vec<DimensionId>,
    /// Records that became active.
    pub entered: usize,
    /// Records that left the active set.
    pub left: usize,
}

impl FilterChange {
    /// True when no record crossed the active boundary.
    pub fn is_empty(&self) -> bool { self.entered == 0 && self.left == 0 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transition {
    Enter,
    Leave,
}

type Listener<R> = Box<dyn FnMut(&Crossfilter<R>, &FilterChange)>;

pub struct Crossfilter<R> {
    store: RecordStore<R>,
    dimensions: Vec<Dimension<R>>,
    groups: Vec<Box<dyn Aggregate<R>>>,
    failing: Vec<u32>,
    active: usize,
    listeners: Vec<Listener<R>>,
}

impl<R: 'static> Crossfilter<R> {
    pub fn new(store: RecordStore<R>) -> Self {
        let failing = vec![0; store.len()];
        let active = store.len();
        Self {
            store,
            dimensions: Vec::new(),
            groups: Vec::new(),
            failing,
            active,
            listeners: Vec::new(),
        }
    }

    pub fn store(&self) -> &RecordStore<R> { &self.store }

    /// Total number of records, active or not.
    pub fn size(&self) -> usize { self.store.len() }

    /// Add a single-valued dimension. It starts unfiltered, so the active set
    /// is unchanged.
    pub fn dimension<P, V>(&mut self, name: impl Into<String>, project: P) -> DimensionId
    where
        P: Fn(&R) -> V + 'static,
        V: Into<FacetValue>,
    {
        let projection = Box::new(move |r: &R| -> Vec<FacetValue> { vec![project(r).into()] });
        self.push_dimension(name.into(), false, projection)
    }

    /// Add a faceted dimension: each record maps to a set of facet values and
    /// appears in every one of their groups.
    pub fn faceted_dimension<P, I, V>(&mut self, name: impl Into<String>, project: P) -> DimensionId
    where
        P: Fn(&R) -> I + 'static,
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        let projection = Box::new(move |r: &R| -> Vec<FacetValue> {
            project(r).into_iter().map(Into::into).collect()
        });
        self.push_dimension(name.into(), true, projection)
    }

    fn push_dimension(
        &mut self,
        name: String,
        faceted: bool,
        projection: Box<dyn Fn(&R) -> Vec<FacetValue>>,
    ) -> DimensionId {
        let dim = Dimension::build(name, faceted, projection, &self.store);
        self.dimensions.push(dim);
        DimensionId(self.dimensions.len() - 1)
    }

    pub fn dimension_ref(&self, id: DimensionId) -> Result<&Dimension<R>> {
        self.dimensions
            .get(id.0)
            .ok_or_else(|| CensusError::UnknownDimension(format!("#{}", id.0)))
    }

    pub fn dimension_id(&self, name: &str) -> Result<DimensionId> {
        self.dimensions
            .iter()
            .position(|d| d.name() == name)
            .map(DimensionId)
            .ok_or_else(|| CensusError::UnknownDimension(name.to_string()))
    }

    /// Attach a group to `dimension`, folding in the records active right now.
    pub fn group<F>(&mut self, dimension: DimensionId, reducer: F) -> Result<GroupId<F>>
    where
        F: Reducer<R> + 'static,
    {
        let dim = self.dimension_ref(dimension)?;
        let mut group = Group::new(dimension, dim.shared_keys(), reducer);
        for (id, record) in self.store.iter() {
            if self.failing[id] == 0 {
                Aggregate::enter(&mut group, id, record, dim.facet_ids(id));
            }
        }
        self.groups.push(Box::new(group));
        Ok(GroupId::new(self.groups.len() - 1))
    }

    pub fn group_ref<F>(&self, id: &GroupId<F>) -> Result<&Group<R, F>>
    where
        F: Reducer<R> + 'static,
    {
        self.groups
            .get(id.index)
            .and_then(|g| g.as_any().downcast_ref::<Group<R, F>>())
            .ok_or(CensusError::UnknownGroup(id.index))
    }

    /// Register a callback run once after every settled filter call.
    pub fn on_change<L>(&mut self, listener: L)
    where
        L: FnMut(&Crossfilter<R>, &FilterChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn filter(&mut self, dimension: DimensionId, filter: Filter) -> Result<FilterChange> {
        self.apply([(dimension, filter)])
    }

    /// Apply several filters as one batch; listeners run once at the end.
    /// Each record's verdict is settled over the whole batch before groups see
    /// it, so a record that leaves and comes back within one call yields no event.
    pub fn apply<I>(&mut self, filters: I) -> Result<FilterChange>
    where
        I: IntoIterator<Item = (DimensionId, Filter)>,
    {
        let filters: Vec<(DimensionId, Filter)> = filters.into_iter().collect();
        for (dim, _) in &filters {
            self.dimension_ref(*dim)?;
        }

        let mut change = FilterChange::default();
        // status of every touched record before the batch began
        let mut touched: BTreeMap<RecordId, bool> = BTreeMap::new();
        for (dim, filter) in filters {
            log::debug!("filter '{}' <- {:?}", self.dimensions[dim.0].name(), filter);
            for (id, passes) in self.dimensions[dim.0].refilter(filter) {
                touched.entry(id).or_insert(self.failing[id] == 0);
                if passes {
                    self.failing[id] -= 1;
                } else {
                    self.failing[id] += 1;
                }
            }
            if !change.dimensions.contains(&dim) {
                change.dimensions.push(dim);
            }
        }

        for (id, was_active) in touched {
            match (was_active, self.failing[id] == 0) {
                (false, true) => {
                    self.active += 1;
                    self.propagate(id, Transition::Enter);
                    change.entered += 1;
                }
                (true, false) => {
                    self.active -= 1;
                    self.propagate(id, Transition::Leave);
                    change.left += 1;
                }
                _ => {}
            }
        }

        log::debug!(
            "filter change settled: {} entered, {} left, {} active of {}",
            change.entered,
            change.left,
            self.active_count(),
            self.size()
        );
        self.settle(&change);
        Ok(change)
    }

    /// Alias of [`Crossfilter::clear_filters`].
    pub fn filter_all(&mut self) -> Result<FilterChange> { self.clear_filters() }

    /// Clear the filter on every dimension.
    pub fn clear_filters(&mut self) -> Result<FilterChange> {
        let all: Vec<(DimensionId, Filter)> = (0..self.dimensions.len())
            .map(|d| (DimensionId(d), Filter::All))
            .collect();
        self.apply(all)
    }

    /// Rebuild every group from `init()` over the current active set.
    pub fn reset_groups(&mut self) {
        for group in self.groups.iter_mut() {
            group.clear();
            let dim = &self.dimensions[group.dimension().0];
            for (id, record) in self.store.iter() {
                if self.failing[id] == 0 {
                    group.enter(id, record, dim.facet_ids(id));
                }
            }
        }
    }

    pub fn is_active(&self, id: RecordId) -> bool {
        self.failing.get(id).is_some_and(|&f| f == 0)
    }

    pub fn active_count(&self) -> usize { self.active }

    pub fn active_records(&self) -> impl Iterator<Item = (RecordId, &R)> + '_ {
        self.store.iter().filter(move |(id, _)| self.failing[*id] == 0)
    }

    fn propagate(&mut self, id: RecordId, transition: Transition) {
        let record = &self.store[id];
        for group in self.groups.iter_mut() {
            let keys = self.dimensions[group.dimension().0].facet_ids(id);
            match transition {
                Transition::Enter => group.enter(id, record, keys),
                Transition::Leave => group.leave(id, record, keys),
            }
        }
    }

    fn settle(&mut self, change: &FilterChange) {
        // taken out for the loop so each listener can borrow the settled engine
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in listeners.iter_mut() {
            listener(&*self, change);
        }
        self.listeners = listeners;
    }
}

impl<R> fmt::Debug for Crossfilter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crossfilter")
            .field("records", &self.store.len())
            .field("dimensions", &self.dimensions)
            .field("groups", &self.groups.len())
            .finish()
    }
}
