//! `DatabaseManager` (§4.6): single write connection + pooled reader
//! connections over one SQLite file, WAL mode. Write-serialized,
//! read-pooled — the same split as the teacher's connection manager.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rusqlite::Connection;
use strata_core::errors::CoreError;

const READER_POOL_SIZE: usize = 4;

static IN_MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

fn apply_pragmas(conn: &Connection) -> Result<(), CoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| CoreError::store(format!("set journal_mode: {e}")))?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| CoreError::store(format!("set synchronous: {e}")))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| CoreError::store(format!("set foreign_keys: {e}")))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(|e| CoreError::store(format!("set busy_timeout: {e}")))?;
    Ok(())
}

/// A pool of reader connections guarded by a single mutex. SQLite's WAL
/// mode allows concurrent readers, but we still serialize pool checkout to
/// keep this a plain `Vec` rather than pulling in a dedicated pool crate.
struct ReaderPool {
    connections: Mutex<Vec<Connection>>,
}

impl ReaderPool {
    fn open(path: &Option<PathBuf>, size: usize) -> Result<Self, CoreError> {
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = open_connection(path)?;
            connections.push(conn);
        }
        Ok(Self {
            connections: Mutex::new(connections),
        })
    }

    fn with<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> Result<T, CoreError>,
    {
        let mut guard = self
            .connections
            .lock()
            .map_err(|_| CoreError::store("reader pool mutex poisoned"))?;
        let conn = guard
            .pop()
            .ok_or_else(|| CoreError::store_retriable("reader pool exhausted"))?;
        let result = f(&conn);
        guard.push(conn);
        result
    }
}

fn open_connection(path: &Option<PathBuf>) -> Result<Connection, CoreError> {
    let conn = match path {
        Some(p) => Connection::open(p),
        None => Connection::open_in_memory(),
    }
    .map_err(|e| CoreError::store(format!("open sqlite connection: {e}")))?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

/// Owns the one write connection and a small pool of read connections.
/// All access goes through `with_reader`/`with_writer` — nothing outside
/// this module touches a raw `Connection` for the state store.
fn in_memory_uri_flags() -> rusqlite::OpenFlags {
    rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
        | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
        | rusqlite::OpenFlags::SQLITE_OPEN_URI
        | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX
}

pub struct DatabaseManager {
    path: Option<PathBuf>,
    /// Shared-cache URI backing this manager when it has no file path —
    /// kept so `open_batch_connection` can attach another handle to the
    /// same physical in-memory database rather than a private one.
    in_memory_uri: Option<String>,
    writer: Mutex<Connection>,
    readers: ReaderPool,
}

impl DatabaseManager {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let path_buf = Some(path.to_path_buf());
        let writer = open_connection(&path_buf)?;
        let readers = ReaderPool::open(&path_buf, READER_POOL_SIZE)?;
        Ok(Self {
            path: path_buf,
            in_memory_uri: None,
            writer: Mutex::new(writer),
            readers,
        })
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        // In-memory SQLite connections are private to the connection that
        // created them, so the writer and every reader must share one
        // physical in-memory database via a shared cache URI instead of
        // independent `:memory:` handles.
        let id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:strata-mem-{id}?mode=memory&cache=shared");
        let writer = Connection::open_with_flags(&uri, in_memory_uri_flags())
            .map_err(|e| CoreError::store(format!("open in-memory sqlite: {e}")))?;
        apply_pragmas(&writer)?;
        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(&uri, in_memory_uri_flags())
                .map_err(|e| CoreError::store(format!("open in-memory sqlite reader: {e}")))?;
            apply_pragmas(&conn)?;
            readers.push(conn);
        }
        Ok(Self {
            path: None,
            in_memory_uri: Some(uri),
            writer: Mutex::new(writer),
            readers: ReaderPool {
                connections: Mutex::new(readers),
            },
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_reader<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> Result<T, CoreError>,
    {
        self.readers.with(f)
    }

    pub fn with_writer<F, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> Result<T, CoreError>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|_| CoreError::store("writer mutex poisoned"))?;
        f(&conn)
    }

    /// A second connection over the same physical database, handed to the
    /// dedicated batch-writer thread so it owns its own `Connection` rather
    /// than contending on the main writer mutex for every batched command.
    /// For in-memory stores this attaches to the same shared-cache URI as
    /// the writer/reader pool rather than opening a private `:memory:` db.
    pub fn open_batch_connection(&self) -> Result<Connection, CoreError> {
        match (&self.path, &self.in_memory_uri) {
            (Some(p), _) => open_connection(&Some(p.clone())),
            (None, Some(uri)) => {
                let conn = Connection::open_with_flags(uri, in_memory_uri_flags())
                    .map_err(|e| CoreError::store(format!("open in-memory batch connection: {e}")))?;
                apply_pragmas(&conn)?;
                Ok(conn)
            }
            (None, None) => Err(CoreError::store("database manager has no backing path or uri")),
        }
    }

    pub fn checkpoint(&self) -> Result<(), CoreError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(|e| CoreError::store(format!("wal checkpoint: {e}")))
        })
    }
}
