//! `intervals` table queries (§4.1/§4.6). Rows are append-only deltas;
//! `compact_intervals` periodically coalesces them via the same algebra
//! `strata-intervals` uses in memory.

use std::collections::BTreeMap;

use rusqlite::{params, Connection};
use strata_core::errors::CoreError;
use strata_core::ids::SnapshotId;
use strata_core::interval::Interval;
use strata_core::traits::state_store::SnapshotIntervals;

fn sqe(e: impl std::fmt::Display) -> CoreError {
    CoreError::store(e.to_string())
}

pub fn add_interval(
    conn: &Connection,
    snapshot: &SnapshotId,
    start_ms: i64,
    end_ms: i64,
    is_dev: bool,
) -> Result<(), CoreError> {
    conn.prepare_cached(
        "INSERT INTO intervals (name, data_hash, parent_data_hash, is_dev, start_ms, end_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .map_err(sqe)?
    .execute(params![
        snapshot.name,
        snapshot.fingerprint.data_hash,
        snapshot.fingerprint.parent_data_hash,
        is_dev as i64,
        start_ms,
        end_ms,
    ])
    .map_err(sqe)?;
    Ok(())
}

fn rows_for_snapshot(conn: &Connection, snapshot: &SnapshotId, is_dev: bool) -> Result<Vec<Interval>, CoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT start_ms, end_ms FROM intervals
             WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3 AND is_dev = ?4
             ORDER BY start_ms",
        )
        .map_err(sqe)?;
    let rows = stmt
        .query_map(
            params![snapshot.name, snapshot.fingerprint.data_hash, snapshot.fingerprint.parent_data_hash, is_dev as i64],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .map_err(sqe)?;
    let mut out = Vec::new();
    for row in rows {
        let (start_ms, end_ms) = row.map_err(sqe)?;
        out.push(Interval { start_ms, end_ms });
    }
    Ok(out)
}

/// Removal expands to every snapshot row sharing the target `(name, version)`
/// — callers resolve the version-to-id fan-out before calling here (§4.6).
pub fn remove_interval(
    conn: &Connection,
    snapshots: &[SnapshotId],
    start_ms: i64,
    end_ms: i64,
) -> Result<(), CoreError> {
    for snapshot in snapshots {
        for is_dev in [false, true] {
            let existing = rows_for_snapshot(conn, snapshot, is_dev)?;
            let remaining = strata_intervals::remove(&existing, start_ms, end_ms)?;
            conn.prepare_cached(
                "DELETE FROM intervals WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3 AND is_dev = ?4",
            )
            .map_err(sqe)?
            .execute(params![
                snapshot.name,
                snapshot.fingerprint.data_hash,
                snapshot.fingerprint.parent_data_hash,
                is_dev as i64
            ])
            .map_err(sqe)?;
            for iv in remaining {
                add_interval(conn, snapshot, iv.start_ms, iv.end_ms, is_dev)?;
            }
        }
    }
    Ok(())
}

pub fn get_snapshot_intervals(
    conn: &Connection,
    snapshots: Option<&[SnapshotId]>,
) -> Result<Vec<SnapshotIntervals>, CoreError> {
    let ids: Vec<SnapshotId> = match snapshots {
        Some(ids) => ids.to_vec(),
        None => {
            let all = crate::queries::snapshots::get_snapshots(conn, None)?;
            all.into_keys().collect()
        }
    };

    let mut out = Vec::new();
    for id in ids {
        let version = {
            let all = crate::queries::snapshots::get_snapshots(conn, Some(std::slice::from_ref(&id)))?;
            all.get(&id).and_then(|s| s.version.clone()).unwrap_or_default()
        };
        let intervals = rows_for_snapshot(conn, &id, false)?
            .into_iter()
            .map(|iv| (iv.start_ms, iv.end_ms))
            .collect();
        let dev_intervals = rows_for_snapshot(conn, &id, true)?
            .into_iter()
            .map(|iv| (iv.start_ms, iv.end_ms))
            .collect();
        out.push(SnapshotIntervals {
            name: id.name,
            version,
            intervals,
            dev_intervals,
        });
    }
    Ok(out)
}

/// Merge append-only delta rows per `(name, data_hash, parent_data_hash, is_dev)`
/// into their coalesced form and rewrite them as a single pass.
pub fn compact_intervals(conn: &Connection) -> Result<(), CoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT DISTINCT name, data_hash, parent_data_hash, is_dev FROM intervals")
        .map_err(sqe)?;
    let keys: Vec<(String, String, String, bool)> = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? != 0,
            ))
        })
        .map_err(sqe)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sqe)?;

    for (name, data_hash, parent_data_hash, is_dev) in keys {
        let id = SnapshotId::new(
            name.clone(),
            strata_core::fingerprint::SnapshotFingerprint {
                data_hash,
                metadata_hash: String::new(),
                parent_data_hash,
                parent_metadata_hash: String::new(),
            },
        );
        let existing = rows_for_snapshot(conn, &id, is_dev)?;
        let coalesced = strata_intervals::merge_two(&existing, &[]);
        if coalesced.len() == existing.len() {
            continue;
        }
        conn.prepare_cached(
            "DELETE FROM intervals WHERE name = ?1 AND data_hash = ?2 AND parent_data_hash = ?3 AND is_dev = ?4",
        )
        .map_err(sqe)?
        .execute(params![id.name, id.fingerprint.data_hash, id.fingerprint.parent_data_hash, is_dev as i64])
        .map_err(sqe)?;
        for iv in coalesced {
            add_interval(conn, &id, iv.start_ms, iv.end_ms, is_dev)?;
        }
    }
    Ok(())
}

pub fn intervals_by_id(conn: &Connection, snapshots: &[SnapshotId]) -> Result<BTreeMap<SnapshotId, Vec<Interval>>, CoreError> {
    let mut out = BTreeMap::new();
    for id in snapshots {
        out.insert(id.clone(), rows_for_snapshot(conn, id, false)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use strata_core::fingerprint::SnapshotFingerprint;

    fn id(name: &str) -> SnapshotId {
        SnapshotId::new(
            name.to_string(),
            SnapshotFingerprint {
                data_hash: "1".to_string(),
                metadata_hash: "m".to_string(),
                parent_data_hash: "0".to_string(),
                parent_metadata_hash: "0".to_string(),
            },
        )
    }

    #[test]
    fn add_and_remove_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        let sid = id("a");
        add_interval(&conn, &sid, 0, 100, false).unwrap();
        add_interval(&conn, &sid, 100, 200, false).unwrap();
        remove_interval(&conn, &[sid.clone()], 50, 150).unwrap();

        let remaining = rows_for_snapshot(&conn, &sid, false).unwrap();
        assert_eq!(remaining, vec![Interval { start_ms: 0, end_ms: 50 }, Interval { start_ms: 150, end_ms: 200 }]);
    }

    #[test]
    fn compact_coalesces_adjacent_deltas() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        let sid = id("a");
        add_interval(&conn, &sid, 0, 100, false).unwrap();
        add_interval(&conn, &sid, 100, 200, false).unwrap();
        compact_intervals(&conn).unwrap();

        let remaining = rows_for_snapshot(&conn, &sid, false).unwrap();
        assert_eq!(remaining, vec![Interval { start_ms: 0, end_ms: 200 }]);
    }
}
