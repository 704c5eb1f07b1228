//! The `Model` type (§3): an immutable-after-load definition of a SQL
//! transformation. Loading/parsing a model file (§6 "model file format")
//! is outside this crate's scope — callers construct a `Model` however
//! they parse it and hand it to the renderer/fingerprinter/scheduler.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Closed sum type for model kinds (§9 "tagged variants over inheritance").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelKind {
    Full,
    View,
    Embedded,
    IncrementalByTimeRange,
    IncrementalByUniqueKey,
    Seed,
    External,
}

impl ModelKind {
    pub fn is_incremental(&self) -> bool {
        matches!(
            self,
            Self::IncrementalByTimeRange | Self::IncrementalByUniqueKey
        )
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External)
    }

    pub fn is_seed(&self) -> bool {
        matches!(self, Self::Seed)
    }

    pub fn has_query_body(&self) -> bool {
        !matches!(self, Self::External | Self::Seed)
    }
}

/// A time-column declaration for incremental-by-time-range models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeColumn {
    pub column: String,
    pub format: Option<String>,
}

/// An audit attached to a model: `name` plus whether a failure blocks
/// promotion (`blocking`). The audit SQL body itself is out of scope here
/// (audits are loaded the same way models are, per §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub name: String,
    pub blocking: bool,
}

/// A macro-defined Python callable, serialized rather than kept live (§9):
/// fingerprints hash this descriptor, not the function itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutableKind {
    Definition,
    Import,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    pub name: String,
    pub kind: ExecutableKind,
    pub payload: String,
    pub path: String,
}

/// Definition of a SQL transformation. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub view_name: String,
    pub dialect: String,
    pub kind: ModelKind,
    pub query: String,
    pub pre_statements: Vec<String>,
    pub post_statements: Vec<String>,
    pub macro_definitions: Vec<String>,
    #[serde(default)]
    pub python_env: BTreeMap<String, Executable>,
    #[serde(default)]
    pub jinja_macros: BTreeMap<String, String>,
    pub cron: String,
    /// Epoch-ms of the model's configured `start`, if any.
    pub start_ms: Option<i64>,
    pub owner: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub stamp: Option<String>,
    pub grain: Vec<String>,
    #[serde(default)]
    pub partitioned_by: Vec<String>,
    #[serde(default)]
    pub clustered_by: Vec<String>,
    pub time_column: Option<TimeColumn>,
    /// Cadence steps re-processed on every run (§4.1, §4.4).
    #[serde(default)]
    pub lookback: u32,
    pub batch_size: Option<u32>,
    #[serde(default)]
    pub columns_to_types: BTreeMap<String, String>,
    #[serde(default)]
    pub audits: Vec<Audit>,
    pub description: Option<String>,
    /// Upstream model names referenced by `query`. Derived by scanning the
    /// canonicalized AST (`strata-fingerprint::canonicalize`), not hand
    /// configured — stored here once computed so the scheduler and
    /// fingerprinter don't each re-derive it.
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
}

impl Model {
    /// Whether this model reads from its own physical table (used by
    /// `remove_interval`'s self-referential cascade, §4.4).
    pub fn is_self_referential(&self) -> bool {
        self.kind.is_incremental() && self.depends_on.contains(&self.name)
    }

    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size.unwrap_or(u32::MAX)
    }
}
