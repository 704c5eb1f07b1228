//! State store capability set (§4.6): read and write traits implemented by
//! `strata-storage::SqliteStateStore`. Split into `StateStoreRead` /
//! `StateStoreWrite` the way the teacher splits `IDriftReader` from the
//! mutating storage traits — planners only need read access, schedulers
//! need both.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::environment::{Environment, SnapshotTableInfo, Versions};
use crate::errors::CoreError;
use crate::ids::SnapshotId;
use crate::snapshot::Snapshot;

/// One row of `get_snapshot_intervals` (§4.6): a snapshot's intervals keyed
/// by name+version rather than by full snapshot identity, since many
/// snapshot fingerprints can share one version.
#[derive(Debug, Clone)]
pub struct SnapshotIntervals {
    pub name: String,
    pub version: String,
    pub intervals: Vec<(i64, i64)>,
    pub dev_intervals: Vec<(i64, i64)>,
}

pub trait StateStoreRead: Send + Sync {
    fn get_snapshots(
        &self,
        ids: Option<&[SnapshotId]>,
        hydrate_seeds: bool,
    ) -> Result<BTreeMap<SnapshotId, Snapshot>, CoreError>;

    fn snapshots_exist(&self, ids: &[SnapshotId]) -> Result<BTreeSet<SnapshotId>, CoreError>;

    fn models_exist(
        &self,
        names: &[String],
        exclude_external: bool,
    ) -> Result<BTreeSet<String>, CoreError>;

    fn get_environment(&self, name: &str) -> Result<Option<Environment>, CoreError>;

    fn get_environments(&self) -> Result<Vec<Environment>, CoreError>;

    fn get_snapshot_intervals(
        &self,
        snapshots: Option<&[SnapshotId]>,
    ) -> Result<Vec<SnapshotIntervals>, CoreError>;

    fn get_versions(&self, validate: bool) -> Result<Versions, CoreError>;
}

pub trait StateStoreWrite: StateStoreRead {
    /// Rejects duplicates — pushing a snapshot whose id already exists is
    /// a `CoreError::StoreError`, not an upsert (§4.6).
    fn push_snapshots(&self, snapshots: &[Snapshot]) -> Result<(), CoreError>;

    fn delete_snapshots(&self, ids: &[SnapshotId]) -> Result<(), CoreError>;

    fn delete_expired_snapshots(&self, now_ms: i64) -> Result<Vec<SnapshotId>, CoreError>;

    fn add_interval(
        &self,
        snapshot: &SnapshotId,
        start_ms: i64,
        end_ms: i64,
        is_dev: bool,
    ) -> Result<(), CoreError>;

    /// Removal fans out to every snapshot sharing the target version unless
    /// `all_snapshots` narrows the candidate set (§4.6).
    fn remove_interval(
        &self,
        snapshots: &[SnapshotId],
        start_ms: i64,
        end_ms: i64,
        all_snapshots: Option<&[SnapshotId]>,
    ) -> Result<(), CoreError>;

    fn promote(
        &self,
        env: &Environment,
        no_gaps: bool,
    ) -> Result<(Vec<SnapshotTableInfo>, Vec<SnapshotTableInfo>), CoreError>;

    fn finalize(&self, env: &str, now_ms: i64) -> Result<(), CoreError>;

    fn invalidate_environment(&self, name: &str, now_ms: i64) -> Result<(), CoreError>;

    fn unpause_snapshots(&self, snapshots: &[SnapshotId], now_ms: i64) -> Result<(), CoreError>;

    /// Merges append-only interval deltas into base rows and deletes the deltas.
    fn compact_intervals(&self) -> Result<(), CoreError>;

    fn migrate(&self, skip_backup: bool) -> Result<(), CoreError>;

    fn rollback(&self) -> Result<(), CoreError>;
}

// Blanket impls so trait objects behind an `Arc` satisfy the trait too —
// the scheduler/promotion logic in downstream crates stores
// `Arc<dyn StateStoreWrite>`, not a concrete backend type.
impl<T: StateStoreRead + ?Sized> StateStoreRead for Arc<T> {
    fn get_snapshots(
        &self,
        ids: Option<&[SnapshotId]>,
        hydrate_seeds: bool,
    ) -> Result<BTreeMap<SnapshotId, Snapshot>, CoreError> {
        (**self).get_snapshots(ids, hydrate_seeds)
    }

    fn snapshots_exist(&self, ids: &[SnapshotId]) -> Result<BTreeSet<SnapshotId>, CoreError> {
        (**self).snapshots_exist(ids)
    }

    fn models_exist(
        &self,
        names: &[String],
        exclude_external: bool,
    ) -> Result<BTreeSet<String>, CoreError> {
        (**self).models_exist(names, exclude_external)
    }

    fn get_environment(&self, name: &str) -> Result<Option<Environment>, CoreError> {
        (**self).get_environment(name)
    }

    fn get_environments(&self) -> Result<Vec<Environment>, CoreError> {
        (**self).get_environments()
    }

    fn get_snapshot_intervals(
        &self,
        snapshots: Option<&[SnapshotId]>,
    ) -> Result<Vec<SnapshotIntervals>, CoreError> {
        (**self).get_snapshot_intervals(snapshots)
    }

    fn get_versions(&self, validate: bool) -> Result<Versions, CoreError> {
        (**self).get_versions(validate)
    }
}

impl<T: StateStoreWrite + ?Sized> StateStoreWrite for Arc<T> {
    fn push_snapshots(&self, snapshots: &[Snapshot]) -> Result<(), CoreError> {
        (**self).push_snapshots(snapshots)
    }

    fn delete_snapshots(&self, ids: &[SnapshotId]) -> Result<(), CoreError> {
        (**self).delete_snapshots(ids)
    }

    fn delete_expired_snapshots(&self, now_ms: i64) -> Result<Vec<SnapshotId>, CoreError> {
        (**self).delete_expired_snapshots(now_ms)
    }

    fn add_interval(
        &self,
        snapshot: &SnapshotId,
        start_ms: i64,
        end_ms: i64,
        is_dev: bool,
    ) -> Result<(), CoreError> {
        (**self).add_interval(snapshot, start_ms, end_ms, is_dev)
    }

    fn remove_interval(
        &self,
        snapshots: &[SnapshotId],
        start_ms: i64,
        end_ms: i64,
        all_snapshots: Option<&[SnapshotId]>,
    ) -> Result<(), CoreError> {
        (**self).remove_interval(snapshots, start_ms, end_ms, all_snapshots)
    }

    fn promote(
        &self,
        env: &Environment,
        no_gaps: bool,
    ) -> Result<(Vec<SnapshotTableInfo>, Vec<SnapshotTableInfo>), CoreError> {
        (**self).promote(env, no_gaps)
    }

    fn finalize(&self, env: &str, now_ms: i64) -> Result<(), CoreError> {
        (**self).finalize(env, now_ms)
    }

    fn invalidate_environment(&self, name: &str, now_ms: i64) -> Result<(), CoreError> {
        (**self).invalidate_environment(name, now_ms)
    }

    fn unpause_snapshots(&self, snapshots: &[SnapshotId], now_ms: i64) -> Result<(), CoreError> {
        (**self).unpause_snapshots(snapshots, now_ms)
    }

    fn compact_intervals(&self) -> Result<(), CoreError> {
        (**self).compact_intervals()
    }

    fn migrate(&self, skip_backup: bool) -> Result<(), CoreError> {
        (**self).migrate(skip_backup)
    }

    fn rollback(&self) -> Result<(), CoreError> {
        (**self).rollback()
    }
}
