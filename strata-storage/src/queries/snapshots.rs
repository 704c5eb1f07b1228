//! `snapshots` table queries (§4.6).

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{params, params_from_iter, Connection};
use strata_core::errors::CoreError;
use strata_core::fingerprint::{ChangeCategory, SnapshotFingerprint};
use strata_core::ids::SnapshotId;
use strata_core::model::Model;
use strata_core::snapshot::{Snapshot, SnapshotVersion};

fn sqe(e: impl std::fmt::Display) -> CoreError {
    CoreError::store(e.to_string())
}

fn category_to_str(category: Option<ChangeCategory>) -> Option<&'static str> {
    category.map(|c| match c {
        ChangeCategory::Breaking => "breaking",
        ChangeCategory::NonBreaking => "non_breaking",
        ChangeCategory::ForwardOnly => "forward_only",
        ChangeCategory::IndirectNonBreaking => "indirect_non_breaking",
        ChangeCategory::IndirectBreaking => "indirect_breaking",
        ChangeCategory::Metadata => "metadata",
    })
}

fn category_from_str(s: Option<String>) -> Result<Option<ChangeCategory>, CoreError> {
    s.map(|s| {
        Ok(match s.as_str() {
            "breaking" => ChangeCategory::Breaking,
            "non_breaking" => ChangeCategory::NonBreaking,
            "forward_only" => ChangeCategory::ForwardOnly,
            "indirect_non_breaking" => ChangeCategory::IndirectNonBreaking,
            "indirect_breaking" => ChangeCategory::IndirectBreaking,
            "metadata" => ChangeCategory::Metadata,
            other => return Err(CoreError::store(format!("unknown change_category '{other}'"))),
        })
    })
    .transpose()
}

pub fn insert_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<(), CoreError> {
    let model_json = serde_json::to_string(&snapshot.model).map_err(sqe)?;
    let previous_versions_json = serde_json::to_string(&snapshot.previous_versions).map_err(sqe)?;
    let indirect_versions_json = serde_json::to_string(&snapshot.indirect_versions).map_err(sqe)?;
    let parents_json = serde_json::to_string(&snapshot.parents).map_err(sqe)?;

    conn.prepare_cached(
        "INSERT INTO snapshots
         (name, data_hash, metadata_hash, parent_data_hash, parent_metadata_hash,
          version, physical_schema, change_category, created_ts, updated_ts, ttl_ms,
          effective_from, unpaused_ts, previous_versions_json, indirect_versions_json,
          parents_json, model_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    )
    .map_err(sqe)?
    .execute(params![
        snapshot.name,
        snapshot.fingerprint.data_hash,
        snapshot.fingerprint.metadata_hash,
        snapshot.fingerprint.parent_data_hash,
        snapshot.fingerprint.parent_metadata_hash,
        snapshot.version,
        snapshot.physical_schema,
        category_to_str(snapshot.change_category),
        snapshot.created_ts,
        snapshot.updated_ts,
        snapshot.ttl_ms,
        snapshot.effective_from,
        snapshot.unpaused_ts,
        previous_versions_json,
        indirect_versions_json,
        parents_json,
        model_json,
    ])
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            CoreError::store(format!("snapshot {} already exists", snapshot.snapshot_id()))
        }
        other => sqe(other),
    })?;
    Ok(())
}

fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    let change_category: Option<String> = row.get(7)?;
    let previous_versions_json: String = row.get(13)?;
    let indirect_versions_json: String = row.get(14)?;
    let parents_json: String = row.get(15)?;
    let model_json: String = row.get(16)?;

    let previous_versions: Vec<SnapshotVersion> = serde_json::from_str(&previous_versions_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e)))?;
    let indirect_versions: BTreeMap<String, String> = serde_json::from_str(&indirect_versions_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e)))?;
    let parents: Vec<SnapshotId> = serde_json::from_str(&parents_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, rusqlite::types::Type::Text, Box::new(e)))?;
    let model: Model = serde_json::from_str(&model_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(16, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(Snapshot {
        name: row.get(0)?,
        fingerprint: SnapshotFingerprint {
            data_hash: row.get(1)?,
            metadata_hash: row.get(2)?,
            parent_data_hash: row.get(3)?,
            parent_metadata_hash: row.get(4)?,
        },
        version: row.get(5)?,
        previous_versions,
        physical_schema: row.get(6)?,
        intervals: Vec::new(),
        dev_intervals: Vec::new(),
        change_category: change_category
            .map(|s| match s.as_str() {
                "breaking" => Ok(ChangeCategory::Breaking),
                "non_breaking" => Ok(ChangeCategory::NonBreaking),
                "forward_only" => Ok(ChangeCategory::ForwardOnly),
                "indirect_non_breaking" => Ok(ChangeCategory::IndirectNonBreaking),
                "indirect_breaking" => Ok(ChangeCategory::IndirectBreaking),
                "metadata" => Ok(ChangeCategory::Metadata),
                other => Err(rusqlite::Error::InvalidColumnName(other.to_string())),
            })
            .transpose()?,
        created_ts: row.get(8)?,
        updated_ts: row.get(9)?,
        ttl_ms: row.get(10)?,
        effective_from: row.get(11)?,
        unpaused_ts: row.get(12)?,
        model,
        parents,
        indirect_versions,
    })
}

const SNAPSHOT_COLUMNS: &str = "name, data_hash, metadata_hash, parent_data_hash, parent_metadata_hash, \
     version, physical_schema, change_category, created_ts, updated_ts, ttl_ms, \
     effective_from, unpaused_ts, previous_versions_json, indirect_versions_json, parents_json, model_json";

pub fn get_snapshots(
    conn: &Connection,
    ids: Option<&[SnapshotId]>,
) -> Result<BTreeMap<SnapshotId, Snapshot>, CoreError> {
    let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots");
    let mut out = BTreeMap::new();

    match ids {
        None => {
            let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;
            let rows = stmt.query_map([], row_to_snapshot).map_err(sqe)?;
            for row in rows {
                let snapshot = row.map_err(sqe)?;
                out.insert(snapshot.snapshot_id(), snapshot);
            }
        }
        Some(ids) => {
            for id in ids {
                let sql = format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3"
                );
                let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;
                let mut rows = stmt
                    .query_map(
                        params![id.name, id.fingerprint.data_hash, id.fingerprint.parent_data_hash],
                        row_to_snapshot,
                    )
                    .map_err(sqe)?;
                if let Some(row) = rows.next() {
                    let snapshot = row.map_err(sqe)?;
                    out.insert(snapshot.snapshot_id(), snapshot);
                }
            }
        }
    }
    Ok(out)
}

pub fn snapshots_exist(conn: &Connection, ids: &[SnapshotId]) -> Result<BTreeSet<SnapshotId>, CoreError> {
    let mut out = BTreeSet::new();
    let mut stmt = conn
        .prepare_cached(
            "SELECT 1 FROM snapshots WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3",
        )
        .map_err(sqe)?;
    for id in ids {
        let exists = stmt
            .exists(params![id.name, id.fingerprint.data_hash, id.fingerprint.parent_data_hash])
            .map_err(sqe)?;
        if exists {
            out.insert(id.clone());
        }
    }
    Ok(out)
}

pub fn models_exist(
    conn: &Connection,
    names: &[String],
    exclude_external: bool,
) -> Result<BTreeSet<String>, CoreError> {
    if names.is_empty() {
        return Ok(BTreeSet::new());
    }
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    let external_clause = if exclude_external {
        " AND model_json NOT LIKE '%\"kind\":\"EXTERNAL\"%'"
    } else {
        ""
    };
    let sql = format!(
        "SELECT DISTINCT name FROM snapshots WHERE name IN ({}){external_clause}",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;
    let rows = stmt
        .query_map(params_from_iter(names.iter()), |row| row.get::<_, String>(0))
        .map_err(sqe)?;
    let mut out = BTreeSet::new();
    for row in rows {
        out.insert(row.map_err(sqe)?);
    }
    Ok(out)
}

pub fn delete_snapshots(conn: &Connection, ids: &[SnapshotId]) -> Result<(), CoreError> {
    let mut stmt = conn
        .prepare_cached("DELETE FROM snapshots WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3")
        .map_err(sqe)?;
    for id in ids {
        stmt.execute(params![id.name, id.fingerprint.data_hash, id.fingerprint.parent_data_hash])
            .map_err(sqe)?;
    }
    Ok(())
}

pub fn unpause_snapshots(conn: &Connection, ids: &[SnapshotId], now_ms: i64) -> Result<(), CoreError> {
    let mut stmt = conn
        .prepare_cached(
            "UPDATE snapshots SET unpaused_ts = ?4
             WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3 AND unpaused_ts IS NULL",
        )
        .map_err(sqe)?;
    for id in ids {
        stmt.execute(params![id.name, id.fingerprint.data_hash, id.fingerprint.parent_data_hash, now_ms])
            .map_err(sqe)?;
    }
    Ok(())
}

pub fn delete_expired_snapshots(conn: &Connection, now_ms: i64) -> Result<Vec<SnapshotId>, CoreError> {
    let sql = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE ?1 - updated_ts >= ttl_ms");
    let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;
    let rows = stmt.query_map(params![now_ms], row_to_snapshot).map_err(sqe)?;
    let mut expired = Vec::new();
    for row in rows {
        expired.push(row.map_err(sqe)?.snapshot_id());
    }
    delete_snapshots(conn, &expired)?;
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use std::collections::BTreeMap as Map;
    use strata_core::model::ModelKind;
    use strata_core::snapshot::DEFAULT_TTL_MS;

    fn fixture_snapshot(name: &str, data_hash: &str) -> Snapshot {
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
    fn insert_and_fetch_round_trips() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        let snapshot = fixture_snapshot("a", "1");
        insert_snapshot(&conn, &snapshot).unwrap();

        let fetched = get_snapshots(&conn, None).unwrap();
        assert_eq!(fetched.len(), 1);
        let got = fetched.get(&snapshot.snapshot_id()).unwrap();
        assert_eq!(got.name, "a");
        assert_eq!(got.version.as_deref(), Some("1"));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        let snapshot = fixture_snapshot("a", "1");
        insert_snapshot(&conn, &snapshot).unwrap();
        assert!(insert_snapshot(&conn, &snapshot).is_err());
    }

    #[test]
    fn expired_snapshots_are_deleted() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        let mut snapshot = fixture_snapshot("a", "1");
        snapshot.ttl_ms = 1000;
        snapshot.updated_ts = 0;
        insert_snapshot(&conn, &snapshot).unwrap();

        let expired = delete_expired_snapshots(&conn, 5000).unwrap();
        assert_eq!(expired.len(), 1);
        assert!(get_snapshots(&conn, None).unwrap().is_empty());
    }
}
