//! The `Snapshot` aggregate (§3/§4.4). This crate defines the shape only;
//! the operations that mutate it (`categorize_as`, `table_name`,
//! `add_interval`, `missing_intervals`, `merge_intervals`,
//! `remove_interval`) are implemented as the `SnapshotOps` extension trait
//! in `strata-snapshot`, which depends on this crate plus
//! `strata-intervals`/`strata-fingerprint` — keeping this crate free of
//! those dependencies and avoiding a cycle.

use serde::{Deserialize, Serialize};

use crate::fingerprint::{ChangeCategory, SnapshotFingerprint};
use crate::ids::SnapshotId;
use crate::interval::IntervalSet;
use crate::model::Model;

/// One entry of a snapshot's `previous_versions[]`: the version identity it
/// carried before its most recent (re-)categorization, kept so that
/// forward-only re-categorizations can still recover the original
/// `physical_schema` (§4.4 "once set it persists ... via
/// previous_versions[0].physical_schema").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotVersion {
    pub version: String,
    pub data_hash: String,
    pub physical_schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub fingerprint: SnapshotFingerprint,
    /// `None` until the snapshot has been categorized at least once.
    pub version: Option<String>,
    pub previous_versions: Vec<SnapshotVersion>,
    pub physical_schema: String,
    pub intervals: IntervalSet,
    pub dev_intervals: IntervalSet,
    pub change_category: Option<ChangeCategory>,
    pub created_ts: i64,
    pub updated_ts: i64,
    /// Milliseconds of inactivity after which this snapshot becomes eligible
    /// for deletion, once no environment references it (§3, §4.5).
    pub ttl_ms: i64,
    pub effective_from: Option<i64>,
    /// `None` means paused (dev only); once set it cannot be cleared (§4.4).
    pub unpaused_ts: Option<i64>,
    pub model: Model,
    pub parents: Vec<SnapshotId>,
    /// Parent name -> parent version in effect when this snapshot's
    /// `change_category` was last derived; used to tell
    /// `IndirectNonBreaking` from `IndirectBreaking` without re-walking the
    /// whole parent chain on every query.
    pub indirect_versions: std::collections::BTreeMap<String, String>,
}

pub const DEFAULT_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

impl Snapshot {
    pub fn snapshot_id(&self) -> SnapshotId {
        SnapshotId::new(self.name.clone(), self.fingerprint.clone())
    }

    /// `UNCATEGORIZED` state per the §4.4 state machine.
    pub fn is_uncategorized(&self) -> bool {
        self.change_category.is_none()
    }

    pub fn is_paused_forward_only(&self) -> bool {
        matches!(self.change_category, Some(ChangeCategory::ForwardOnly)) && self.unpaused_ts.is_none()
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.updated_ts >= self.ttl_ms
    }
}
