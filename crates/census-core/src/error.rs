// File: crates/census-core/src/error.rs
// Summary: Error types for engine construction, lookups, and reducer removals.

use thiserror::Error;

use crate::store::RecordId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CensusError {
    /// The dashboard barrier was asked to build before every input arrived.
    #[error("missing input: {0}")]
    MissingInput(&'static str),
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),
    /// No group at the handle's index, or the group there has another reducer type.
    /// A same-typed handle taken from another engine is not detected.
    #[error("unknown group #{0}")]
    UnknownGroup(usize),
}

/// Raised by a reducer whose `remove` has no matching prior `add`.
/// The accumulator is left untouched when this is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReduceError {
    #[error("accumulator would drop below its initial value")]
    Underflow,
    #[error("record {0} is not a member of this group")]
    NotMember(RecordId),
}

pub type Result<T, E = CensusError> = std::result::Result<T, E>;
