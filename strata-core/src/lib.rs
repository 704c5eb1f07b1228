//! # strata-core
//!
//! Foundation crate for the Strata snapshot and scheduling engine.
//! Defines the data model (§3), the tagged external-facing configs (§6),
//! the storage and engine-adapter contracts other crates implement, the
//! error taxonomy (§7), and tracing setup. Every other crate in the
//! workspace depends on this one.

#![allow(dead_code)]

pub mod config;
pub mod environment;
pub mod errors;
pub mod fingerprint;
pub mod ids;
pub mod interval;
pub mod model;
pub mod snapshot;
pub mod telemetry;
pub mod traits;

pub use config::connection::ConnectionConfig;
pub use config::scheduler::SchedulerConfig;
pub use environment::{Environment, SnapshotTableInfo, Versions};
pub use errors::CoreError;
pub use fingerprint::{ChangeCategory, ModelDiffMode, SnapshotFingerprint};
pub use ids::SnapshotId;
pub use interval::Interval;
pub use model::{Audit, Executable, ExecutableKind, Model, ModelKind, TimeColumn};
pub use snapshot::Snapshot;
pub use traits::engine_adapter::EngineAdapter;
pub use traits::state_store::{SnapshotIntervals, StateStoreRead, StateStoreWrite};
