// File: crates/census-core/src/dashboard.rs
// Summary: School dashboard: fixed dimensions/groups over the census engine and the derived view rows.
// Notes:
// - `DashboardBuilder` is the readiness barrier: the dashboard only exists once
//   both the school records and the known district keys have been supplied.
// - View rows here are plain data; formatting and drawing belong to the caller.

use std::collections::BTreeSet;

use crate::crossfilter::{Crossfilter, FilterChange};
use crate::dimension::DimensionId;
use crate::error::{CensusError, Result};
use crate::facet::{FacetValue, Filter};
use crate::group::GroupId;
use crate::reduce::{Answer, Count, Membership, Rollup, RollupEntry, Sum};
use crate::school::{CsResponse, GradeBand, School};
use crate::store::RecordStore;

pub type PopulationSum = Sum<fn(&School) -> i64>;
pub type DistrictRollup = Rollup<fn(&School) -> Answer>;
pub type SchoolMembers = Membership<fn(&School) -> bool>;

/// Dimensions the dashboard filters on.
#[derive(Clone, Copy, Debug)]
pub struct Dimensions {
    pub district: DimensionId,
    pub school: DimensionId,
    pub grade_bands: DimensionId,
    pub cs_responses: DimensionId,
}

#[derive(Clone, Copy, Debug)]
pub struct Groups {
    pub grade_bands: GroupId<Count>,
    pub cs_responses: GroupId<Count>,
    pub schools: GroupId<SchoolMembers>,
    pub population: GroupId<PopulationSum>,
    pub rollup: GroupId<DistrictRollup>,
}

/// One row of the district table.
#[derive(Clone, Debug, PartialEq)]
pub struct DistrictRow {
    pub district: String,
    pub population: u64,
    pub schools: usize,
    pub responded: usize,
    pub cs_yes: usize,
    /// `cs_yes / schools`; `None` without schools.
    pub teaching_share: Option<f64>,
}

/// Map shading input for one known district key.
#[derive(Clone, Debug, PartialEq)]
pub struct Shade {
    pub district: String,
    pub population: u64,
    pub rollup: RollupEntry,
    pub teaching_share: Option<f64>,
}

/// Schools of one district with at least one active member.
#[derive(Clone, Debug)]
pub struct DistrictSchools<'a> {
    pub district: &'a str,
    pub schools: Vec<&'a School>,
}

impl DistrictSchools<'_> {
    pub fn population(&self) -> u64 {
        self.schools.iter().map(|s| u64::from(s.population)).sum()
    }
}

#[derive(Default)]
pub struct DashboardBuilder {
    records: Option<RecordStore<School>>,
    districts: Option<BTreeSet<String>>,
}

impl DashboardBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn records(mut self, records: RecordStore<School>) -> Self {
        self.records = Some(records);
        self
    }

    /// Known district keys from the boundary dataset.
    pub fn districts<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.districts = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_ready(&self) -> bool { self.records.is_some() && self.districts.is_some() }

    pub fn build(self) -> Result<Dashboard> {
        let records = self.records.ok_or(CensusError::MissingInput("school records"))?;
        let districts = self.districts.ok_or(CensusError::MissingInput("district keys"))?;
        Dashboard::new(records, districts)
    }
}

type RenderHook = Box<dyn FnMut(&Dashboard, &FilterChange)>;

pub struct Dashboard {
    engine: Crossfilter<School>,
    known_districts: BTreeSet<String>,
    dims: Dimensions,
    groups: Groups,
    render_hooks: Vec<RenderHook>,
}

impl Dashboard {
    fn new(records: RecordStore<School>, known_districts: BTreeSet<String>) -> Result<Self> {
        let mut engine = Crossfilter::new(records);
        let dims = Dimensions {
            district: engine.dimension("district", |s: &School| s.district.clone()),
            school: engine.dimension("school", |s: &School| s.school.clone()),
            grade_bands: engine.faceted_dimension("grade_bands", |s: &School| {
                s.grade_bands.iter().map(|b| b.as_str()).collect::<Vec<_>>()
            }),
            cs_responses: engine.dimension("cs_responses", |s: &School| s.cs_response.as_str()),
        };
        let keep: fn(&School) -> bool = School::has_students;
        let measure: fn(&School) -> i64 = School::population_measure;
        let classify: fn(&School) -> Answer = School::answer_of;
        let groups = Groups {
            grade_bands: engine.group(dims.grade_bands, Count)?,
            cs_responses: engine.group(dims.cs_responses, Count)?,
            schools: engine.group(dims.district, Membership::new(keep))?,
            population: engine.group(dims.district, Sum::new(measure))?,
            rollup: engine.group(dims.district, Rollup::new(classify))?,
        };
        log::info!(
            "dashboard ready: {} schools, {} known districts",
            engine.size(),
            known_districts.len()
        );
        Ok(Self { engine, known_districts, dims, groups, render_hooks: Vec::new() })
    }

    pub fn engine(&self) -> &Crossfilter<School> { &self.engine }

    pub fn dimensions(&self) -> Dimensions { self.dims }

    pub fn groups(&self) -> Groups { self.groups }

    pub fn known_districts(&self) -> &BTreeSet<String> { &self.known_districts }

    /// Register a render trigger, run once per settled filter change.
    pub fn on_render<F>(&mut self, hook: F)
    where
        F: FnMut(&Dashboard, &FilterChange) + 'static,
    {
        self.render_hooks.push(Box::new(hook));
    }

    // ---- filters ---------------------------------------------------------

    pub fn filter_grade_bands(&mut self, bands: &[GradeBand]) -> Result<FilterChange> {
        let filter = Filter::any_of(bands.iter().map(|b| b.as_str()));
        self.apply(vec![(self.dims.grade_bands, filter)])
    }

    pub fn filter_cs_responses(&mut self, responses: &[CsResponse]) -> Result<FilterChange> {
        let filter = Filter::any_of(responses.iter().map(|r| r.as_str()));
        self.apply(vec![(self.dims.cs_responses, filter)])
    }

    pub fn filter_districts<S: AsRef<str>>(&mut self, districts: &[S]) -> Result<FilterChange> {
        let filter = Filter::any_of(districts.iter().map(|d| d.as_ref()));
        self.apply(vec![(self.dims.district, filter)])
    }

    pub fn filter_school(&mut self, school: Option<&str>) -> Result<FilterChange> {
        let filter = school.map(Filter::exact).unwrap_or_default();
        self.apply(vec![(self.dims.school, filter)])
    }

    pub fn clear_filters(&mut self) -> Result<FilterChange> {
        let change = self.engine.clear_filters()?;
        self.render(&change);
        Ok(change)
    }

    /// Apply filters on several dimensions with a single render.
    pub fn apply(&mut self, filters: Vec<(DimensionId, Filter)>) -> Result<FilterChange> {
        let change = self.engine.apply(filters)?;
        self.render(&change);
        Ok(change)
    }

    fn render(&mut self, change: &FilterChange) {
        let mut hooks = std::mem::take(&mut self.render_hooks);
        for hook in hooks.iter_mut() {
            hook(&*self, change);
        }
        self.render_hooks = hooks;
    }

    // ---- views -----------------------------------------------------------

    /// Grade band counts in chart order (High, Middle, Elementary).
    pub fn grade_band_counts(&self) -> Result<Vec<(GradeBand, u64)>> {
        let group = self.engine.group_ref(&self.groups.grade_bands)?;
        let mut rows: Vec<(GradeBand, u64)> = group
            .all()
            .into_iter()
            .filter_map(|(k, &v)| k.as_str()?.parse::<GradeBand>().ok().map(|b| (b, v)))
            .collect();
        rows.sort_by_key(|(b, _)| b.display_rank());
        Ok(rows)
    }

    /// Response counts ordered Yes, No, Inconsistent, Unknown.
    pub fn cs_response_counts(&self) -> Result<Vec<(CsResponse, u64)>> {
        let group = self.engine.group_ref(&self.groups.cs_responses)?;
        let mut rows: Vec<(CsResponse, u64)> = group
            .all()
            .into_iter()
            .filter_map(|(k, &v)| k.as_str()?.parse::<CsResponse>().ok().map(|r| (r, v)))
            .collect();
        rows.sort_by_key(|(r, _)| *r);
        Ok(rows)
    }

    /// Districts with at least one active school, ascending by name.
    pub fn district_schools(&self) -> Result<Vec<DistrictSchools<'_>>> {
        let group = self.engine.group_ref(&self.groups.schools)?;
        let store = self.engine.store();
        Ok(group
            .all_where(|members| !members.is_empty())
            .into_iter()
            .filter_map(|(k, members)| {
                Some(DistrictSchools {
                    district: k.as_str()?,
                    schools: members.iter().filter_map(|&id| store.get(id)).collect(),
                })
            })
            .collect())
    }

    /// The `n` non-empty districts with the largest active population.
    pub fn top_districts(&self, n: usize) -> Result<Vec<DistrictSchools<'_>>> {
        let mut rows = self.district_schools()?;
        rows.sort_by(|a, b| b.population().cmp(&a.population()));
        rows.truncate(n);
        Ok(rows)
    }

    pub fn district_table(&self) -> Result<Vec<DistrictRow>> {
        Ok(self
            .district_schools()?
            .into_iter()
            .map(|d| {
                let schools = d.schools.len();
                let responded =
                    d.schools.iter().filter(|s| s.cs_response != CsResponse::Unknown).count();
                let cs_yes = d.schools.iter().filter(|s| s.cs_response == CsResponse::Yes).count();
                DistrictRow {
                    district: d.district.to_string(),
                    population: d.population(),
                    schools,
                    responded,
                    cs_yes,
                    teaching_share: (schools > 0).then(|| cs_yes as f64 / schools as f64),
                }
            })
            .collect())
    }

    pub fn population_by_district(&self) -> Result<Vec<(String, u64)>> {
        let group = self.engine.group_ref(&self.groups.population)?;
        Ok(group.all().into_iter().map(|(k, &v)| (k.to_string(), non_negative(v))).collect())
    }

    pub fn rollups(&self) -> Result<Vec<(String, RollupEntry)>> {
        let group = self.engine.group_ref(&self.groups.rollup)?;
        Ok(group.all().into_iter().map(|(k, &v)| (k.to_string(), v)).collect())
    }

    /// One entry per known district key, joined to its active aggregates.
    pub fn district_shading(&self) -> Result<Vec<Shade>> {
        let population = self.engine.group_ref(&self.groups.population)?;
        let rollup = self.engine.group_ref(&self.groups.rollup)?;
        Ok(self
            .known_districts
            .iter()
            .map(|name| {
                let key: FacetValue = name.as_str().into();
                let entry = rollup.get(&key).copied().unwrap_or_default();
                Shade {
                    district: name.clone(),
                    population: population.get(&key).copied().map_or(0, non_negative),
                    rollup: entry,
                    teaching_share: entry.affirmative_share(),
                }
            })
            .collect())
    }

    /// Record districts with no matching key in the boundary dataset.
    pub fn unmatched_districts(&self) -> Result<Vec<&str>> {
        let dim = self.engine.dimension_ref(self.dims.district)?;
        Ok(dim
            .keys()
            .iter()
            .filter_map(|k| k.as_str())
            .filter(|k| !self.known_districts.contains(*k))
            .collect())
    }
}

// Population sums only ever fold in positive student counts.
fn non_negative(sum: i64) -> u64 { u64::try_from(sum).unwrap_or(0) }
