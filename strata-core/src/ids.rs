//! `SnapshotId` (§3): `(name, fingerprint)`. Snapshots only ever reference
//! each other by this id, never by direct pointer (§9 "ownership of
//! cyclic-looking references") — resolution always goes back through the
//! state store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::SnapshotFingerprint;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId {
    pub name: String,
    pub fingerprint: SnapshotFingerprint,
}

impl SnapshotId {
    pub fn new(name: impl Into<String>, fingerprint: SnapshotFingerprint) -> Self {
        Self {
            name: name.into(),
            fingerprint,
        }
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.fingerprint.data_hash)
    }
}

// Deterministic total order so `BTreeMap<SnapshotId, _>` iteration (used for
// plan/promotion output) doesn't depend on insertion order or hash state.
impl PartialOrd for SnapshotId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SnapshotId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.name, &self.fingerprint.data_hash).cmp(&(&other.name, &other.fingerprint.data_hash))
    }
}
