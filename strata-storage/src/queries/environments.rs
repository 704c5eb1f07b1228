//! `environments` / `environment_snapshots` table queries (§4.5/§4.6).

use rusqlite::{params, Connection};
use strata_core::environment::{Environment, SnapshotTableInfo};
use strata_core::errors::CoreError;
use strata_core::fingerprint::SnapshotFingerprint;
use strata_core::ids::SnapshotId;

fn sqe(e: impl std::fmt::Display) -> CoreError {
    CoreError::store(e.to_string())
}

pub fn get_environment(conn: &Connection, name: &str) -> Result<Option<Environment>, CoreError> {
    let row = conn
        .prepare_cached(
            "SELECT name, start_at, end_at, plan_id, previous_plan_id, expiration_ts, finalized_ts
             FROM environments WHERE name = ?1",
        )
        .map_err(sqe)?
        .query_row(params![name], |row| {
            Ok(Environment {
                name: row.get(0)?,
                snapshots: Vec::new(),
                start_at: row.get(1)?,
                end_at: row.get(2)?,
                plan_id: row.get(3)?,
                previous_plan_id: row.get(4)?,
                expiration_ts: row.get(5)?,
                finalized_ts: row.get(6)?,
            })
        });

    let mut env = match row {
        Ok(env) => env,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(sqe(e)),
    };
    env.snapshots = snapshot_infos(conn, name)?;
    Ok(Some(env))
}

fn snapshot_infos(conn: &Connection, environment_name: &str) -> Result<Vec<SnapshotTableInfo>, CoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT snapshot_name, data_hash, parent_data_hash, table_name
             FROM environment_snapshots WHERE environment_name = ?1 ORDER BY snapshot_name",
        )
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![environment_name], |row| {
            Ok(SnapshotTableInfo {
                snapshot_id: SnapshotId::new(
                    row.get::<_, String>(0)?,
                    SnapshotFingerprint {
                        data_hash: row.get(1)?,
                        metadata_hash: String::new(),
                        parent_data_hash: row.get(2)?,
                        parent_metadata_hash: String::new(),
                    },
                ),
                table_name: row.get(3)?,
            })
        })
        .map_err(sqe)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(sqe)?);
    }
    Ok(out)
}

pub fn get_environments(conn: &Connection) -> Result<Vec<Environment>, CoreError> {
    let names: Vec<String> = {
        let mut stmt = conn.prepare_cached("SELECT name FROM environments ORDER BY name").map_err(sqe)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(sqe)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(sqe)?
    };
    let mut out = Vec::new();
    for name in names {
        if let Some(env) = get_environment(conn, &name)? {
            out.push(env);
        }
    }
    Ok(out)
}

pub fn upsert_environment(conn: &Connection, env: &Environment) -> Result<(), CoreError> {
    conn.prepare_cached(
        "INSERT INTO environments (name, start_at, end_at, plan_id, previous_plan_id, expiration_ts, finalized_ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(name) DO UPDATE SET
           start_at = excluded.start_at, end_at = excluded.end_at, plan_id = excluded.plan_id,
           previous_plan_id = excluded.previous_plan_id, expiration_ts = excluded.expiration_ts,
           finalized_ts = excluded.finalized_ts",
    )
    .map_err(sqe)?
    .execute(params![
        env.name,
        env.start_at,
        env.end_at,
        env.plan_id,
        env.previous_plan_id,
        env.expiration_ts,
        env.finalized_ts,
    ])
    .map_err(sqe)?;

    conn.prepare_cached("DELETE FROM environment_snapshots WHERE environment_name = ?1")
        .map_err(sqe)?
        .execute(params![env.name])
        .map_err(sqe)?;
    for info in &env.snapshots {
        conn.prepare_cached(
            "INSERT INTO environment_snapshots (environment_name, snapshot_name, data_hash, parent_data_hash, table_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(sqe)?
        .execute(params![
            env.name,
            info.snapshot_id.name,
            info.snapshot_id.fingerprint.data_hash,
            info.snapshot_id.fingerprint.parent_data_hash,
            info.table_name,
        ])
        .map_err(sqe)?;
    }
    Ok(())
}

pub fn finalize(conn: &Connection, name: &str, now_ms: i64) -> Result<(), CoreError> {
    let updated = conn
        .prepare_cached("UPDATE environments SET finalized_ts = ?2 WHERE name = ?1")
        .map_err(sqe)?
        .execute(params![name, now_ms])
        .map_err(sqe)?;
    if updated == 0 {
        return Err(CoreError::store(format!("environment '{name}' does not exist")));
    }
    Ok(())
}

pub fn invalidate_environment(conn: &Connection, name: &str, now_ms: i64) -> Result<(), CoreError> {
    let updated = conn
        .prepare_cached("UPDATE environments SET expiration_ts = ?2 WHERE name = ?1")
        .map_err(sqe)?
        .execute(params![name, now_ms])
        .map_err(sqe)?;
    if updated == 0 {
        return Err(CoreError::store(format!("environment '{name}' does not exist")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    #[test]
    fn upsert_and_fetch_round_trips() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        let env = Environment {
            name: "prod".to_string(),
            snapshots: vec![SnapshotTableInfo {
                snapshot_id: SnapshotId::new(
                    "a".to_string(),
                    SnapshotFingerprint {
                        data_hash: "1".to_string(),
                        metadata_hash: "m".to_string(),
                        parent_data_hash: "0".to_string(),
                        parent_metadata_hash: "0".to_string(),
                    },
                ),
                table_name: "strata__default.a__1".to_string(),
            }],
            start_at: None,
            end_at: None,
            plan_id: "plan-1".to_string(),
            previous_plan_id: None,
            expiration_ts: None,
            finalized_ts: None,
        };
        upsert_environment(&conn, &env).unwrap();

        let fetched = get_environment(&conn, "prod").unwrap().unwrap();
        assert_eq!(fetched.snapshots.len(), 1);
        assert_eq!(fetched.plan_id, "plan-1");
    }

    #[test]
    fn finalize_requires_existing_environment() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        assert!(finalize(&conn, "missing", 0).is_err());
    }
}
