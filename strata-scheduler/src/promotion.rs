//! Environment promotion (§4.5): the pure algorithm over in-memory
//! `Environment`/interval data. `strata-storage`'s `SqliteStateStore`
//! hydrates the inputs from SQL and calls into this; keeping the algorithm
//! here (rather than inline in the storage crate) lets it be tested without
//! a database.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::environment::{Environment, SnapshotTableInfo};
use strata_core::errors::CoreError;
use strata_core::ids::SnapshotId;
use strata_core::interval::IntervalSet;

pub struct PromotionOutcome {
    pub added: Vec<SnapshotTableInfo>,
    pub removed: Vec<SnapshotTableInfo>,
}

/// `promote(env, no_gaps)` (§4.5).
///
/// - `existing_ids`: every snapshot id known to the store (step 1's check).
/// - `snapshot_intervals`: prod intervals for every snapshot referenced by
///   either environment, needed only when `no_gaps` is set.
pub fn compute_promotion(
    new_env: &Environment,
    previous_env: Option<&Environment>,
    existing_ids: &BTreeSet<SnapshotId>,
    snapshot_intervals: &BTreeMap<SnapshotId, IntervalSet>,
    no_gaps: bool,
    now_ms: i64,
) -> Result<PromotionOutcome, CoreError> {
    for info in &new_env.snapshots {
        if !existing_ids.contains(&info.snapshot_id) {
            return Err(CoreError::store(format!(
                "environment '{}' references unknown snapshot {}",
                new_env.name, info.snapshot_id
            )));
        }
    }

    let previous_by_name: BTreeMap<&str, &SnapshotTableInfo> = previous_env
        .map(|env| {
            env.snapshots
                .iter()
                .map(|info| (info.snapshot_id.name.as_str(), info))
                .collect()
        })
        .unwrap_or_default();
    let new_by_name: BTreeMap<&str, &SnapshotTableInfo> = new_env
        .snapshots
        .iter()
        .map(|info| (info.snapshot_id.name.as_str(), info))
        .collect();

    let added: Vec<SnapshotTableInfo> = new_env
        .snapshots
        .iter()
        .filter(|info| {
            previous_by_name
                .get(info.snapshot_id.name.as_str())
                .map(|prev| prev.snapshot_id != info.snapshot_id)
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    let removed: Vec<SnapshotTableInfo> = previous_env
        .map(|env| env.snapshots.clone())
        .unwrap_or_default()
        .into_iter()
        .filter(|info| {
            new_by_name
                .get(info.snapshot_id.name.as_str())
                .map(|new_info| new_info.snapshot_id != info.snapshot_id)
                .unwrap_or(true)
        })
        .collect();

    if no_gaps {
        let mut gap_report: Vec<(String, Vec<(i64, i64)>)> = Vec::new();
        for info in &added {
            let Some(prev_info) = previous_by_name.get(info.snapshot_id.name.as_str()) else {
                continue;
            };
            let prev_intervals = snapshot_intervals
                .get(&prev_info.snapshot_id)
                .cloned()
                .unwrap_or_default();
            let new_intervals = snapshot_intervals
                .get(&info.snapshot_id)
                .cloned()
                .unwrap_or_default();

            let covered_by_prev: Vec<(i64, i64)> = prev_intervals
                .iter()
                .filter(|iv| iv.start_ms < now_ms)
                .map(|iv| (iv.start_ms, iv.end_ms.min(now_ms)))
                .collect();

            let mut gaps = Vec::new();
            for (start, end) in covered_by_prev {
                if start >= end {
                    continue;
                }
                gaps.extend(
                    strata_intervals::gaps_in_window(start, end, &new_intervals)
                        .into_iter()
                        .map(|iv| (iv.start_ms, iv.end_ms)),
                );
            }
            if !gaps.is_empty() {
                gap_report.push((info.snapshot_id.name.clone(), gaps));
            }
        }
        if let Some((name, gaps)) = gap_report.into_iter().next() {
            return Err(CoreError::GapError {
                snapshot_name: name,
                gaps,
            });
        }
    }

    Ok(PromotionOutcome { added, removed })
}
