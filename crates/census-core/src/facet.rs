// File: crates/census-core/src/facet.rs
// Summary: Facet values (group keys) and the filter predicates evaluated against them.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

/// A single category a record maps to along one dimension.
/// Integers order before text, so a dimension should stick to one kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacetValue {
    Int(i64),
    Text(String),
}

impl FacetValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FacetValue::Text(s) => Some(s),
            FacetValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            FacetValue::Int(v) => Some(v),
            FacetValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetValue::Int(v) => write!(f, "{v}"),
            FacetValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FacetValue {
    fn from(s: &str) -> Self { FacetValue::Text(s.to_string()) }
}

impl From<String> for FacetValue {
    fn from(s: String) -> Self { FacetValue::Text(s) }
}

impl From<&String> for FacetValue {
    fn from(s: &String) -> Self { FacetValue::Text(s.clone()) }
}

impl From<i64> for FacetValue {
    fn from(v: i64) -> Self { FacetValue::Int(v) }
}

impl From<u32> for FacetValue {
    fn from(v: u32) -> Self { FacetValue::Int(i64::from(v)) }
}

/// Active filter of a dimension. `All` accepts every facet value.
#[derive(Clone, Default)]
pub enum Filter {
    #[default]
    All,
    Exact(FacetValue),
    In(BTreeSet<FacetValue>),
    /// Half-open: `start <= v < end`.
    Range(Range<FacetValue>),
    Custom(Rc<dyn Fn(&FacetValue) -> bool>),
}

impl Filter {
    pub fn exact(value: impl Into<FacetValue>) -> Self {
        Filter::Exact(value.into())
    }

    /// Accept any of `values`. An empty set clears the filter, matching a
    /// chart with nothing selected.
    pub fn any_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        let set: BTreeSet<FacetValue> = values.into_iter().map(Into::into).collect();
        if set.is_empty() { Filter::All } else { Filter::In(set) }
    }

    pub fn range(start: impl Into<FacetValue>, end: impl Into<FacetValue>) -> Self {
        Filter::Range(start.into()..end.into())
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&FacetValue) -> bool + 'static,
    {
        Filter::Custom(Rc::new(predicate))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    pub fn matches(&self, value: &FacetValue) -> bool {
        match self {
            Filter::All => true,
            Filter::Exact(v) => v == value,
            Filter::In(set) => set.contains(value),
            Filter::Range(r) => r.contains(value),
            Filter::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("All"),
            Filter::Exact(v) => f.debug_tuple("Exact").field(v).finish(),
            Filter::In(set) => f.debug_tuple("In").field(set).finish(),
            Filter::Range(r) => f.debug_tuple("Range").field(r).finish(),
            Filter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
