//! The `Interval` type (§3/§4.1): a half-open `[start_ms, end_ms)` range of
//! UTC epoch-milliseconds. The algebra over lists of intervals (add, remove,
//! merge, missing) lives in `strata-intervals`, which depends on this crate
//! only for the type.

use serde::{Deserialize, Serialize};

/// A half-open time range, in UTC epoch-milliseconds. `start_ms < end_ms`
/// is an invariant enforced by every constructor; use `CoreError::InvalidInterval`
/// for call sites that can observe a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Interval {
    pub fn new(start_ms: i64, end_ms: i64) -> Option<Self> {
        if start_ms < end_ms {
            Some(Self { start_ms, end_ms })
        } else {
            None
        }
    }

    pub fn len_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    /// True when the two intervals overlap or touch end-to-end (mergeable).
    pub fn is_adjacent_or_overlapping(&self, other: &Interval) -> bool {
        self.start_ms <= other.end_ms && other.start_ms <= self.end_ms
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        self.start_ms <= ts_ms && ts_ms < self.end_ms
    }
}

/// A sorted, pairwise-disjoint list of intervals, as stored on a `Snapshot`.
pub type IntervalSet = Vec<Interval>;
