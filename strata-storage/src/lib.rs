//! SQLite-backed implementation of the state store traits from
//! `strata-core`. A single physical database (file or shared-cache
//! in-memory) backs one write connection, a small reader pool, and a
//! dedicated batch-writer thread for high-frequency interval/snapshot
//! writes — the same split the teacher uses for its own storage engine.

pub mod batch;
pub mod connection;
pub mod engine;
pub mod migrations;
pub mod queries;

pub use batch::{BatchCommand, BatchWriter, WriteStats};
pub use connection::DatabaseManager;
pub use engine::SqliteStateStore;
