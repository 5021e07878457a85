// File: crates/census-core/src/reduce.rs
// Summary: Reducer strategies (count, sum, district rollup, membership list) behind one trait.

use std::fmt;

use crate::error::ReduceError;
use crate::store::RecordId;

/// `{init, add, remove}` triple folding records into a per-key value.
///
/// `remove` must exactly undo `add` for the same record, and must leave the
/// accumulator untouched when it returns an error.
pub trait Reducer<R> {
    type Value: Clone + fmt::Debug + PartialEq;

    fn init(&self) -> Self::Value;
    fn add(&self, acc: &mut Self::Value, id: RecordId, record: &R);
    fn remove(&self, acc: &mut Self::Value, id: RecordId, record: &R) -> Result<(), ReduceError>;
}

/// Number of active records in the group.
#[derive(Clone, Copy, Debug, Default)]
pub struct Count;

impl<R> Reducer<R> for Count {
    type Value = u64;

    fn init(&self) -> u64 { 0 }

    fn add(&self, acc: &mut u64, _id: RecordId, _record: &R) {
        *acc += 1;
    }

    fn remove(&self, acc: &mut u64, _id: RecordId, _record: &R) -> Result<(), ReduceError> {
        *acc = acc.checked_sub(1).ok_or(ReduceError::Underflow)?;
        Ok(())
    }
}

/// Sum of a per-record measure.
#[derive(Clone, Copy)]
pub struct Sum<M> {
    measure: M,
}

impl<M> Sum<M> {
    pub fn new(measure: M) -> Self { Self { measure } }
}

impl<R, M: Fn(&R) -> i64> Reducer<R> for Sum<M> {
    type Value = i64;

    fn init(&self) -> i64 { 0 }

    fn add(&self, acc: &mut i64, _id: RecordId, record: &R) {
        *acc += (self.measure)(record);
    }

    fn remove(&self, acc: &mut i64, _id: RecordId, record: &R) -> Result<(), ReduceError> {
        *acc -= (self.measure)(record);
        Ok(())
    }
}

/// How a record answered the survey, as seen by the rollup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Unanswered,
    Negative,
    Affirmative,
}

/// Per-district bucket. Invariant: `cs_yes <= responded <= count`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollupEntry {
    pub count: u32,
    pub responded: u32,
    pub cs_yes: u32,
}

impl RollupEntry {
    /// Share of counted records answering affirmatively; `None` when empty.
    pub fn affirmative_share(&self) -> Option<f64> {
        (self.count > 0).then(|| f64::from(self.cs_yes) / f64::from(self.count))
    }
}

/// Total, responded, and affirmative counts, classified per record.
#[derive(Clone, Copy)]
pub struct Rollup<C> {
    classify: C,
}

impl<C> Rollup<C> {
    pub fn new(classify: C) -> Self { Self { classify } }
}

impl<R, C: Fn(&R) -> Answer> Reducer<R> for Rollup<C> {
    type Value = RollupEntry;

    fn init(&self) -> RollupEntry { RollupEntry::default() }

    fn add(&self, acc: &mut RollupEntry, _id: RecordId, record: &R) {
        let answer = (self.classify)(record);
        acc.count += 1;
        if answer != Answer::Unanswered {
            acc.responded += 1;
        }
        if answer == Answer::Affirmative {
            acc.cs_yes += 1;
        }
    }

    fn remove(&self, acc: &mut RollupEntry, _id: RecordId, record: &R) -> Result<(), ReduceError> {
        let answer = (self.classify)(record);
        let responded = u32::from(answer != Answer::Unanswered);
        let cs_yes = u32::from(answer == Answer::Affirmative);
        if acc.count == 0 || acc.responded < responded || acc.cs_yes < cs_yes {
            return Err(ReduceError::Underflow);
        }
        acc.count -= 1;
        acc.responded -= responded;
        acc.cs_yes -= cs_yes;
        Ok(())
    }
}

/// Ordered list of the ids of contributing records that satisfy `keep`.
#[derive(Clone, Copy)]
pub struct Membership<P> {
    keep: P,
}

impl<P> Membership<P> {
    pub fn new(keep: P) -> Self { Self { keep } }
}

impl<R, P: Fn(&R) -> bool> Reducer<R> for Membership<P> {
    type Value = Vec<RecordId>;

    fn init(&self) -> Vec<RecordId> { Vec::new() }

    fn add(&self, acc: &mut Vec<RecordId>, id: RecordId, record: &R) {
        if (self.keep)(record) {
            acc.push(id);
        }
    }

    fn remove(&self, acc: &mut Vec<RecordId>, id: RecordId, record: &R) -> Result<(), ReduceError> {
        if !(self.keep)(record) {
            return Ok(());
        }
        let pos = acc.iter().position(|&m| m == id).ok_or(ReduceError::NotMember(id))?;
        acc.remove(pos);
        Ok(())
    }
}
