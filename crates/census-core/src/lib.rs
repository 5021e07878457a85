// File: crates/census-core/src/lib.rs
// Summary: Core library entry point; exports the incremental crossfilter engine and the school dashboard.

pub mod crossfilter;
pub mod dashboard;
pub mod dimension;
pub mod error;
pub mod facet;
pub mod group;
pub mod reduce;
pub mod school;
pub mod store;

pub use crossfilter::{Crossfilter, FilterChange};
pub use dashboard::{Dashboard, DashboardBuilder, DistrictRow, DistrictSchools, Shade};
pub use dimension::{Dimension, DimensionId};
pub use error::{CensusError, ReduceError};
pub use facet::{FacetValue, Filter};
pub use group::{Group, GroupId};
pub use reduce::{Answer, Count, Membership, Reducer, Rollup, RollupEntry, Sum};
pub use school::{Columns, CsResponse, GradeBand, RawRow, School, SchoolRowMapper};
pub use store::{RecordId, RecordStore};
