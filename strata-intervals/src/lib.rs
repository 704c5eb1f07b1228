//! Half-open `[start_ms, end_ms)` interval algebra and cadence-aware
//! missing-interval computation (§4.1). Depends only on `strata-core` for
//! the `Interval` type and error taxonomy.

pub mod algebra;
pub mod cadence;

pub use algebra::{add, gaps_in_window, merge_two, missing, remove};
pub use cadence::Cadence;
