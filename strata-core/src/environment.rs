//! `Environment` and `Versions` (§3): a named pointer from an environment to
//! a set of snapshots, and the single-row schema/library version gate.

use serde::{Deserialize, Serialize};

use crate::ids::SnapshotId;

/// A lightweight, store-independent view of one snapshot as referenced by
/// an environment — environments hold these, not full `Snapshot`s (§3
/// "Environments hold weak references (by SnapshotId) to Snapshots").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTableInfo {
    pub snapshot_id: SnapshotId,
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub snapshots: Vec<SnapshotTableInfo>,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    pub plan_id: String,
    pub previous_plan_id: Option<String>,
    pub expiration_ts: Option<i64>,
    pub finalized_ts: Option<i64>,
}

impl Environment {
    pub fn is_finalized(&self) -> bool {
        self.finalized_ts.is_some()
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expiration_ts.map(|ts| ts <= now_ms).unwrap_or(false)
    }

    pub fn snapshot_names(&self) -> impl Iterator<Item = &str> {
        self.snapshots.iter().map(|s| s.snapshot_id.name.as_str())
    }
}

/// Single-row version gate used by `StateStoreRead::get_versions` (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub schema_version: u32,
    pub engine_library_version: String,
}
