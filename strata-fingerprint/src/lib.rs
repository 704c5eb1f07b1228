//! Deterministic model fingerprinting and change categorization (§4.2).
//! Canonicalizes query ASTs with `sqlparser`, hashes with `xxhash-rust`, and
//! classifies fingerprint transitions into the category lattice defined in
//! `strata_core::fingerprint`.

pub mod canonicalize;
pub mod categorize;
pub mod fingerprint;
pub mod hash;

pub use canonicalize::{canonical_sql, depends_on};
pub use categorize::categorize_change;
pub use fingerprint::fingerprint_from_model;
