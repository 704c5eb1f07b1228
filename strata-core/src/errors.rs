//! The error taxonomy (§7): one flat, tag-distinguishable enum shared by
//! every crate in the workspace. Callers dispatch on `error_code()` rather
//! than matching variants when they only need the wire-stable tag (e.g. to
//! decide retriability across a process boundary).

use std::path::PathBuf;

/// Errors produced anywhere in the core. Not retriable unless noted.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Invalid model/audit/connection configuration. Carries the offending path.
    #[error("configuration error at '{path}': {message}")]
    ConfigError { message: String, path: PathBuf },

    /// Failure inside macro evaluation.
    #[error("macro '{macro_name}' failed to evaluate at '{path}': {message}")]
    MacroEvalError {
        macro_name: String,
        message: String,
        path: PathBuf,
    },

    /// Rendering requires a live adapter; the caller decides whether to defer.
    #[error("rendering requires a live adapter call: {0}")]
    ParsetimeAdapterCall(String),

    /// `s >= e`, or a boundary did not snap cleanly to the cadence.
    #[error("invalid interval [{start_ms}, {end_ms}): {reason}")]
    InvalidInterval {
        start_ms: i64,
        end_ms: i64,
        reason: String,
    },

    /// Promotion with `no_gaps` found uncovered ranges.
    #[error("promotion of '{snapshot_name}' would leave gaps: {gaps:?}")]
    GapError {
        snapshot_name: String,
        gaps: Vec<(i64, i64)>,
    },

    /// Schema or library version disagreement between local code and the store.
    #[error("version mismatch: {0}")]
    VersionMismatch(String),

    /// Persistence failure. May be retriable depending on the underlying cause.
    #[error("store error: {message}")]
    StoreError { message: String, retriable: bool },

    /// Catch-all for conditions that don't fit another tag.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    pub fn config<P: Into<PathBuf>>(message: impl Into<String>, path: P) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
            retriable: false,
        }
    }

    pub fn store_retriable(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
            retriable: true,
        }
    }

    /// Stable tag for cross-process/cross-language dispatch.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::MacroEvalError { .. } => "MACRO_EVAL_ERROR",
            Self::ParsetimeAdapterCall(_) => "PARSETIME_ADAPTER_CALL",
            Self::InvalidInterval { .. } => "INVALID_INTERVAL",
            Self::GapError { .. } => "GAP_ERROR",
            Self::VersionMismatch(_) => "VERSION_MISMATCH",
            Self::StoreError { .. } => "STORE_ERROR",
            Self::Other(_) => "STRATA_ERROR",
        }
    }

    /// Whether retrying the same operation might succeed without intervention.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreError { retriable: true, .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
