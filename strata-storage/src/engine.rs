//! `SqliteStateStore` — implements `StateStoreRead`/`StateStoreWrite` from
//! the foundation crate. Wraps `DatabaseManager` (read/write routing) plus
//! `BatchWriter` (batched writes on a dedicated thread); reads go through
//! `with_reader`, most writes through the batch channel, and structural
//! writes (promote, finalize, migrate) go straight through `with_writer`
//! since they're infrequent and need to observe their own result immediately.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use strata_core::environment::{Environment, SnapshotTableInfo, Versions};
use strata_core::errors::CoreError;
use strata_core::ids::SnapshotId;
use strata_core::snapshot::Snapshot;
use strata_core::traits::state_store::{SnapshotIntervals, StateStoreRead, StateStoreWrite};

use crate::batch::{BatchCommand, BatchWriter};
use crate::connection::DatabaseManager;
use crate::{migrations, queries};

pub struct SqliteStateStore {
    db: DatabaseManager,
    batch: BatchWriter,
    db_path: Option<std::path::PathBuf>,
}

impl SqliteStateStore {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let db = DatabaseManager::open(path)?;
        db.with_writer(|conn| migrations::migrate(conn, Some(path), false))?;
        db.with_writer(|conn| queries::versions::ensure_versions_row(conn, migrations::schema_version()))?;
        let batch_conn = db.open_batch_connection()?;
        let batch = BatchWriter::new(batch_conn);
        Ok(Self {
            db,
            batch,
            db_path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        let db = DatabaseManager::open_in_memory()?;
        db.with_writer(|conn| migrations::migrate(conn, None, true))?;
        db.with_writer(|conn| queries::versions::ensure_versions_row(conn, migrations::schema_version()))?;
        let batch_conn = db.open_batch_connection()?;
        let batch = BatchWriter::new(batch_conn);
        Ok(Self {
            db,
            batch,
            db_path: None,
        })
    }

    pub fn flush(&self) -> Result<(), CoreError> {
        self.batch.flush()
    }

    pub fn flush_sync(&self) -> Result<(), CoreError> {
        self.batch.flush_sync()
    }

    pub fn checkpoint(&self) -> Result<(), CoreError> {
        self.db.checkpoint()
    }
}

impl StateStoreRead for SqliteStateStore {
    fn get_snapshots(
        &self,
        ids: Option<&[SnapshotId]>,
        _hydrate_seeds: bool,
    ) -> Result<BTreeMap<SnapshotId, Snapshot>, CoreError> {
        self.flush_sync()?;
        self.db.with_reader(|conn| {
            let mut snapshots = queries::snapshots::get_snapshots(conn, ids)?;
            let all_ids: Vec<SnapshotId> = snapshots.keys().cloned().collect();
            let intervals = queries::intervals::intervals_by_id(conn, &all_ids)?;
            for (id, snapshot) in snapshots.iter_mut() {
                if let Some(iv) = intervals.get(id) {
                    snapshot.intervals = iv.clone();
                }
            }
            Ok(snapshots)
        })
    }

    fn snapshots_exist(&self, ids: &[SnapshotId]) -> Result<BTreeSet<SnapshotId>, CoreError> {
        self.flush_sync()?;
        self.db.with_reader(|conn| queries::snapshots::snapshots_exist(conn, ids))
    }

    fn models_exist(&self, names: &[String], exclude_external: bool) -> Result<BTreeSet<String>, CoreError> {
        self.flush_sync()?;
        self.db
            .with_reader(|conn| queries::snapshots::models_exist(conn, names, exclude_external))
    }

    fn get_environment(&self, name: &str) -> Result<Option<Environment>, CoreError> {
        self.db.with_reader(|conn| queries::environments::get_environment(conn, name))
    }

    fn get_environments(&self) -> Result<Vec<Environment>, CoreError> {
        self.db.with_reader(queries::environments::get_environments)
    }

    fn get_snapshot_intervals(&self, snapshots: Option<&[SnapshotId]>) -> Result<Vec<SnapshotIntervals>, CoreError> {
        self.flush_sync()?;
        self.db
            .with_reader(|conn| queries::intervals::get_snapshot_intervals(conn, snapshots))
    }

    fn get_versions(&self, validate: bool) -> Result<Versions, CoreError> {
        self.db.with_reader(|conn| queries::versions::get_versions(conn, validate))
    }
}

impl StateStoreWrite for SqliteStateStore {
    fn push_snapshots(&self, snapshots: &[Snapshot]) -> Result<(), CoreError> {
        self.batch.send(BatchCommand::PushSnapshots(snapshots.to_vec()))?;
        for snapshot in snapshots {
            let id = snapshot.snapshot_id();
            for iv in &snapshot.intervals {
                self.batch.send(BatchCommand::AddInterval {
                    snapshot: id.clone(),
                    start_ms: iv.start_ms,
                    end_ms: iv.end_ms,
                    is_dev: false,
                })?;
            }
            for iv in &snapshot.dev_intervals {
                self.batch.send(BatchCommand::AddInterval {
                    snapshot: id.clone(),
                    start_ms: iv.start_ms,
                    end_ms: iv.end_ms,
                    is_dev: true,
                })?;
            }
        }
        Ok(())
    }

    fn delete_snapshots(&self, ids: &[SnapshotId]) -> Result<(), CoreError> {
        self.flush_sync()?;
        self.db.with_writer(|conn| queries::snapshots::delete_snapshots(conn, ids))
    }

    fn delete_expired_snapshots(&self, now_ms: i64) -> Result<Vec<SnapshotId>, CoreError> {
        self.flush_sync()?;
        self.db.with_writer(|conn| queries::snapshots::delete_expired_snapshots(conn, now_ms))
    }

    fn add_interval(&self, snapshot: &SnapshotId, start_ms: i64, end_ms: i64, is_dev: bool) -> Result<(), CoreError> {
        self.batch.send(BatchCommand::AddInterval {
            snapshot: snapshot.clone(),
            start_ms,
            end_ms,
            is_dev,
        })
    }

    fn remove_interval(
        &self,
        snapshots: &[SnapshotId],
        start_ms: i64,
        end_ms: i64,
        all_snapshots: Option<&[SnapshotId]>,
    ) -> Result<(), CoreError> {
        let targets = all_snapshots.map(|s| s.to_vec()).unwrap_or_else(|| snapshots.to_vec());
        self.batch.send(BatchCommand::RemoveInterval {
            snapshots: targets,
            start_ms,
            end_ms,
        })
    }

    fn promote(&self, env: &Environment, no_gaps: bool) -> Result<(Vec<SnapshotTableInfo>, Vec<SnapshotTableInfo>), CoreError> {
        self.flush_sync()?;
        self.db.with_writer(|conn| {
            let previous_env = queries::environments::get_environment(conn, &env.name)?;
            let existing_ids = queries::snapshots::snapshots_exist(
                conn,
                &env.snapshots.iter().map(|s| s.snapshot_id.clone()).collect::<Vec<_>>(),
            )?;

            let mut all_referenced: Vec<SnapshotId> = env.snapshots.iter().map(|s| s.snapshot_id.clone()).collect();
            if let Some(prev) = &previous_env {
                all_referenced.extend(prev.snapshots.iter().map(|s| s.snapshot_id.clone()));
            }
            let snapshot_intervals = queries::intervals::intervals_by_id(conn, &all_referenced)?;

            let outcome = strata_scheduler::promotion::compute_promotion(
                env,
                previous_env.as_ref(),
                &existing_ids,
                &snapshot_intervals,
                no_gaps,
                chrono::Utc::now().timestamp_millis(),
            )?;

            queries::environments::upsert_environment(conn, env)?;
            Ok((outcome.added, outcome.removed))
        })
    }

    fn finalize(&self, env: &str, now_ms: i64) -> Result<(), CoreError> {
        self.db.with_writer(|conn| queries::environments::finalize(conn, env, now_ms))
    }

    fn invalidate_environment(&self, name: &str, now_ms: i64) -> Result<(), CoreError> {
        self.db
            .with_writer(|conn| queries::environments::invalidate_environment(conn, name, now_ms))
    }

    fn unpause_snapshots(&self, snapshots: &[SnapshotId], now_ms: i64) -> Result<(), CoreError> {
        self.flush_sync()?;
        self.db
            .with_writer(|conn| queries::snapshots::unpause_snapshots(conn, snapshots, now_ms))
    }

    fn compact_intervals(&self) -> Result<(), CoreError> {
        self.flush_sync()?;
        self.db.with_writer(queries::intervals::compact_intervals)
    }

    fn migrate(&self, skip_backup: bool) -> Result<(), CoreError> {
        let path = self.db_path.clone();
        self.db
            .with_writer(|conn| migrations::migrate(conn, path.as_deref(), skip_backup))
    }

    fn rollback(&self) -> Result<(), CoreError> {
        migrations::rollback(self.db_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, data_hash: &str) -> Snapshot {
        use std::collections::BTreeMap as Map;
        use strata_core::fingerprint::{ChangeCategory, SnapshotFingerprint};
        use strata_core::model::{Model, ModelKind};
        use strata_core::snapshot::DEFAULT_TTL_MS;

        Snapshot {
            name: name.to_string(),
            fingerprint: SnapshotFingerprint {
                data_hash: data_hash.to_string(),
                metadata_hash: "m".to_string(),
                parent_data_hash: "0".to_string(),
                parent_metadata_hash: "0".to_string(),
            },
            version: Some(data_hash.to_string()),
            previous_versions: vec![],
            physical_schema: "strata__default".to_string(),
            intervals: vec![],
            dev_intervals: vec![],
            change_category: Some(ChangeCategory::Breaking),
            created_ts: 0,
            updated_ts: 0,
            ttl_ms: DEFAULT_TTL_MS,
            effective_from: None,
            unpaused_ts: Some(0),
            model: Model {
                name: name.to_string(),
                view_name: name.to_string(),
                dialect: "generic".to_string(),
                kind: ModelKind::Full,
                query: "select 1".to_string(),
                pre_statements: vec![],
                post_statements: vec![],
                macro_definitions: vec![],
                python_env: Map::new(),
                jinja_macros: Map::new(),
                cron: "@daily".to_string(),
                start_ms: None,
                owner: None,
                tags: vec![],
                stamp: None,
                grain: vec![],
                partitioned_by: vec![],
                clustered_by: vec![],
                time_column: None,
                lookback: 0,
                batch_size: None,
                columns_to_types: Map::new(),
                audits: vec![],
                description: None,
                depends_on: Default::default(),
            },
            parents: vec![],
            indirect_versions: Map::new(),
        }
    }

    #[test]
    fn push_then_read_round_trips() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        store.push_snapshots(&[snapshot("a", "1")]).unwrap();
        let fetched = store.get_snapshots(None, false).unwrap();
        assert_eq!(fetched.len(), 1);
    }

    fn table_info(id: SnapshotId) -> SnapshotTableInfo {
        SnapshotTableInfo {
            table_name: format!("strata__default.{}__{}", id.name, id.fingerprint.data_hash),
            snapshot_id: id,
        }
    }

    #[test]
    fn promote_rejects_unknown_snapshot() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let id = snapshot("a", "1").snapshot_id();
        let env = Environment {
            name: "prod".to_string(),
            snapshots: vec![table_info(id)],
            start_at: None,
            end_at: None,
            plan_id: "plan-1".to_string(),
            previous_plan_id: None,
            expiration_ts: None,
            finalized_ts: None,
        };
        assert!(store.promote(&env, false).is_err());
    }

    #[test]
    fn promote_succeeds_for_known_snapshot() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let snap = snapshot("a", "1");
        let id = snap.snapshot_id();
        store.push_snapshots(&[snap]).unwrap();

        let env = Environment {
            name: "prod".to_string(),
            snapshots: vec![table_info(id)],
            start_at: None,
            end_at: None,
            plan_id: "plan-1".to_string(),
            previous_plan_id: None,
            expiration_ts: None,
            finalized_ts: None,
        };
        let (added, removed) = store.promote(&env, false).unwrap();
        assert_eq!(added.len(), 1);
        assert!(removed.is_empty());

        let persisted = store.get_environment("prod").unwrap().unwrap();
        assert_eq!(persisted.snapshots.len(), 1);
    }
}
