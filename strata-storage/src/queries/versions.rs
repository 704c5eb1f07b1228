//! `versions` single-row gate (§4.6). Checked on every store open when
//! `validate` is set, to catch a library/schema drift before other queries run.

use rusqlite::{params, Connection};
use strata_core::environment::Versions;
use strata_core::errors::CoreError;

fn sqe(e: impl std::fmt::Display) -> CoreError {
    CoreError::store(e.to_string())
}

pub const ENGINE_LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn ensure_versions_row(conn: &Connection, schema_version: u32) -> Result<(), CoreError> {
    conn.prepare_cached(
        "INSERT INTO versions (id, schema_version, engine_library_version)
         VALUES (0, ?1, ?2)
         ON CONFLICT(id) DO NOTHING",
    )
    .map_err(sqe)?
    .execute(params![schema_version, ENGINE_LIBRARY_VERSION])
    .map_err(sqe)?;
    Ok(())
}

pub fn get_versions(conn: &Connection, validate: bool) -> Result<Versions, CoreError> {
    let versions = conn
        .prepare_cached("SELECT schema_version, engine_library_version FROM versions WHERE id = 0")
        .map_err(sqe)?
        .query_row([], |row| {
            Ok(Versions {
                schema_version: row.get::<_, i64>(0)? as u32,
                engine_library_version: row.get(1)?,
            })
        })
        .map_err(sqe)?;

    if validate {
        let expected = crate::migrations::schema_version();
        if versions.schema_version != expected {
            return Err(CoreError::VersionMismatch(format!(
                "state store schema version {} does not match engine schema version {expected}",
                versions.schema_version
            )));
        }
        if versions.engine_library_version != ENGINE_LIBRARY_VERSION {
            return Err(CoreError::VersionMismatch(format!(
                "state store was written by engine version {}, running engine is {ENGINE_LIBRARY_VERSION}",
                versions.engine_library_version
            )));
        }
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    #[test]
    fn versions_row_is_created_once() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::migrate(&conn, None, true).unwrap();
        ensure_versions_row(&conn, migrations::schema_version()).unwrap();
        ensure_versions_row(&conn, migrations::schema_version()).unwrap();
        let versions = get_versions(&conn, true).unwrap();
        assert_eq!(versions.schema_version, migrations::schema_version());
    }
}
