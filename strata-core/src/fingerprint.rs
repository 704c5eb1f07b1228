//! Fingerprint and change-category types (§3/§4.2). The hashing and diffing
//! logic that produces these values lives in `strata-fingerprint`; this
//! crate only defines the shapes so that `Snapshot` (below) and the storage
//! traits can refer to them without a dependency cycle.

use serde::{Deserialize, Serialize};

/// Four stable 32-bit decimal hash strings distinguishing *what* a model
/// computes from *how it's described* and *who it depends on*.
///
/// Invariant: identical inputs produce identical fingerprints across
/// processes (no process-local salt, no address-dependent ordering).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotFingerprint {
    pub data_hash: String,
    pub metadata_hash: String,
    pub parent_data_hash: String,
    pub parent_metadata_hash: String,
}

impl SnapshotFingerprint {
    /// The fingerprint used to key a snapshot's identity: `(name, fingerprint)`.
    /// Two fingerprints with the same `data_hash`+`parent_data_hash` but
    /// different metadata describe the same physical table.
    pub fn identity_key(&self) -> (&str, &str) {
        (&self.data_hash, &self.parent_data_hash)
    }
}

/// The outcome of `categorize_change` (§4.2). `None` (no automatic
/// classification) is modeled as `Option<ChangeCategory>` at call sites
/// rather than an extra enum variant, matching the spec's "→ None" wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeCategory {
    Breaking,
    NonBreaking,
    ForwardOnly,
    IndirectNonBreaking,
    IndirectBreaking,
    Metadata,
}

impl ChangeCategory {
    pub fn is_breaking(&self) -> bool {
        matches!(self, Self::Breaking | Self::IndirectBreaking)
    }

    /// Whether this category preserves the snapshot's `version`.
    pub fn preserves_version(&self) -> bool {
        !matches!(self, Self::Breaking)
    }
}

/// Governs how aggressively `categorize_change` is willing to auto-classify
/// a data-level change without user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelDiffMode {
    /// Any data change is `Breaking`.
    Full,
    /// Projection-only additions (and seed column additions) are `NonBreaking`;
    /// everything else requires user input (`None`).
    #[default]
    Semi,
    /// Never auto-classify data changes; always `None`.
    Off,
}
