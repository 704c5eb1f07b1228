//! `EngineAdapter` (§6): the capability surface the core consumes from a
//! concrete engine (DuckDB, Snowflake, …). No adapter implementation lives
//! in this workspace — concrete engines are deliberately out of scope (§1).

use std::collections::BTreeMap;

use crate::errors::CoreError;

/// Minimal tabular result the core needs back from a read — callers that
/// need richer typed access build their own DataFrame-like layer on top.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The capability set an engine adapter must expose (§6). Implementations
/// live outside this workspace; this trait is the seam.
pub trait EngineAdapter: Send + Sync {
    fn execute(&self, sql: &str) -> Result<(), CoreError>;

    fn fetchdf(&self, sql: &str) -> Result<QueryResult, CoreError>;

    fn create_table(
        &self,
        name: &str,
        columns_to_types: &BTreeMap<String, String>,
    ) -> Result<(), CoreError>;

    fn replace_query(
        &self,
        table: &str,
        query: &str,
        columns_to_types: &BTreeMap<String, String>,
    ) -> Result<(), CoreError>;

    fn insert_append(&self, table: &str, query: &str) -> Result<(), CoreError>;

    fn insert_overwrite_by_time_partition(
        &self,
        table: &str,
        query: &str,
        time_column: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<(), CoreError>;

    fn merge_by_unique_key(
        &self,
        table: &str,
        query: &str,
        unique_key: &[String],
    ) -> Result<(), CoreError>;

    fn drop_table(&self, name: &str) -> Result<(), CoreError>;

    fn drop_view(&self, name: &str) -> Result<(), CoreError>;

    fn create_view(&self, name: &str, query: &str) -> Result<(), CoreError>;

    fn columns(&self, table: &str) -> Result<BTreeMap<String, String>, CoreError>;

    fn table_exists(&self, name: &str) -> Result<bool, CoreError>;

    /// Whether this adapter instance maintains thread-local cursors for
    /// concurrent use (§5 "multithreaded iff concurrent_tasks > 1").
    fn is_multithreaded(&self) -> bool;
}
