//! Schema migrations (§4.6): an ordered list of forward-only SQL steps.
//! `schema_version` is simply `migrations().len()`, tracked in SQLite's
//! own `PRAGMA user_version`. `migrate()` takes a file backup first unless
//! told to skip it; `rollback()` restores the most recent backup.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use strata_core::errors::CoreError;

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "initial schema: snapshots, intervals, environments, versions",
            sql: include_str!("migrations/0001_initial.sql"),
        },
    ]
}

pub fn schema_version() -> u32 {
    migrations().len() as u32
}

fn current_user_version(conn: &Connection) -> Result<u32, CoreError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map(|v| v as u32)
        .map_err(|e| CoreError::store(format!("read user_version: {e}")))
}

fn set_user_version(conn: &Connection, version: u32) -> Result<(), CoreError> {
    conn.pragma_update(None, "user_version", version)
        .map_err(|e| CoreError::store(format!("set user_version: {e}")))
}

fn backup_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    db_path.with_file_name(name)
}

/// Apply every migration newer than the current `user_version`, inside one
/// transaction per migration. Backs up the file first unless `skip_backup`.
pub fn migrate(conn: &Connection, db_path: Option<&Path>, skip_backup: bool) -> Result<(), CoreError> {
    let current = current_user_version(conn)?;
    let target = schema_version();
    if current >= target {
        return Ok(());
    }

    if !skip_backup {
        if let Some(path) = db_path {
            if path.exists() {
                fs::copy(path, backup_path(path))
                    .map_err(|e| CoreError::store(format!("backup database before migrate: {e}")))?;
            }
        }
    }

    for migration in migrations().into_iter().filter(|m| m.version > current) {
        tracing::info!(version = migration.version, description = migration.description, "applying migration");
        conn.execute_batch(migration.sql)
            .map_err(|e| CoreError::store(format!("migration {} failed: {e}", migration.version)))?;
        set_user_version(conn, migration.version)?;
    }
    Ok(())
}

/// Restore the most recent `.bak` file taken by `migrate`. Only meaningful
/// for file-backed stores; in-memory stores have nothing to roll back to.
pub fn rollback(db_path: Option<&Path>) -> Result<(), CoreError> {
    let path = db_path.ok_or_else(|| CoreError::store("cannot roll back an in-memory state store"))?;
    let backup = backup_path(path);
    if !backup.exists() {
        return Err(CoreError::store(format!(
            "no backup found at {}",
            backup.display()
        )));
    }
    fs::copy(&backup, path).map_err(|e| CoreError::store(format!("restore backup: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn, None, true).unwrap();
        let version_after_first = current_user_version(&conn).unwrap();
        migrate(&conn, None, true).unwrap();
        let version_after_second = current_user_version(&conn).unwrap();
        assert_eq!(version_after_first, version_after_second);
        assert_eq!(version_after_first, schema_version());
    }

    #[test]
    fn migrate_creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn, None, true).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'snapshots'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn migrate_backs_up_existing_file_before_applying() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("strata.db");
        // A zero-byte file already on disk, standing in for a pre-existing
        // (pre-migration) database that `migrate` must preserve a copy of.
        fs::write(&db_path, b"").unwrap();
        let before = fs::read(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        migrate(&conn, Some(&db_path), false).unwrap();
        drop(conn);

        let backup = backup_path(&db_path);
        assert!(backup.exists());
        assert_eq!(fs::read(&backup).unwrap(), before);
    }

    #[test]
    fn migrate_skips_backup_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("strata.db");
        fs::write(&db_path, b"").unwrap();

        let conn = Connection::open(&db_path).unwrap();
        migrate(&conn, Some(&db_path), true).unwrap();
        drop(conn);

        assert!(!backup_path(&db_path).exists());
    }

    #[test]
    fn rollback_restores_backup_contents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("strata.db");
        let backup = backup_path(&db_path);

        fs::write(&backup, b"original contents").unwrap();
        fs::write(&db_path, b"corrupted contents").unwrap();

        rollback(Some(&db_path)).unwrap();
        assert_eq!(fs::read(&db_path).unwrap(), b"original contents");
    }

    #[test]
    fn rollback_without_backup_errors() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("strata.db");
        fs::write(&db_path, b"placeholder").unwrap();
        assert!(rollback(Some(&db_path)).is_err());
    }

    #[test]
    fn rollback_without_path_errors() {
        assert!(rollback(None).is_err());
    }
}
