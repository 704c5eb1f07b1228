//! The scheduler (§4.7): topologically-ordered missing-interval plan
//! computation, chunked into batches, with each dependency level evaluated
//! in parallel via `rayon`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeZone, Utc};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use rayon::prelude::*;
use strata_core::errors::CoreError;
use strata_core::ids::SnapshotId;
use strata_core::interval::{Interval, IntervalSet};
use strata_core::snapshot::Snapshot;
use strata_intervals::Cadence;
use strata_snapshot::SnapshotOps;

fn ms_to_dt(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
}

fn dt_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// One snapshot's share of a plan: its full missing-interval list plus that
/// list chunked into `model.batch_size`-sized cadence-step batches.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub snapshot_id: SnapshotId,
    pub missing: IntervalSet,
    pub batches: Vec<Vec<Interval>>,
}

fn step_boundaries(iv: &Interval, cadence: &Cadence) -> Vec<i64> {
    let mut starts: Vec<i64> = cadence
        .steps_between(ms_to_dt(iv.start_ms), ms_to_dt(iv.end_ms))
        .into_iter()
        .map(dt_to_ms)
        .collect();
    if starts.first() != Some(&iv.start_ms) {
        starts.insert(0, iv.start_ms);
    }
    starts.push(iv.end_ms);
    starts.dedup();
    starts
}

fn chunk_into_batches(missing: &[Interval], batch_size: u32, cadence: &Cadence) -> Vec<Vec<Interval>> {
    let batch_size = batch_size.max(1) as usize;
    let mut batches: Vec<Vec<Interval>> = Vec::new();
    let mut current: Vec<Interval> = Vec::new();

    for iv in missing {
        let boundaries = step_boundaries(iv, cadence);
        for pair in boundaries.windows(2) {
            current.push(Interval {
                start_ms: pair[0],
                end_ms: pair[1],
            });
            if current.len() >= batch_size {
                batches.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Kahn's algorithm, grouped into generations so that every node in a
/// generation can be evaluated concurrently (no edge within a generation).
fn topological_levels(
    graph: &DiGraphMap<&SnapshotId, ()>,
) -> Result<Vec<Vec<SnapshotId>>, CoreError> {
    // `petgraph::algo::toposort` gives a flat order; we recompute generations
    // via in-degree peeling so the scheduler can parallelize within a level.
    if toposort(graph, None).is_err() {
        return Err(CoreError::config(
            "dependency cycle detected among snapshots",
            "<scheduler>",
        ));
    }

    let mut remaining: BTreeMap<&SnapshotId, usize> = BTreeMap::new();
    for node in graph.nodes() {
        remaining.insert(node, 0);
    }
    for (_, target, _) in graph.all_edges() {
        *remaining.get_mut(target).expect("target is a graph node") += 1;
    }

    let mut levels = Vec::new();
    let mut frontier: Vec<&SnapshotId> = remaining
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();

    while !frontier.is_empty() {
        levels.push(frontier.iter().map(|n| (*n).clone()).collect::<Vec<_>>());
        let mut next = Vec::new();
        for node in &frontier {
            for (_, target, _) in graph.edges(node) {
                let degree = remaining.get_mut(target).expect("target is a graph node");
                *degree -= 1;
                if *degree == 0 {
                    next.push(target);
                }
            }
        }
        frontier = next;
    }

    Ok(levels)
}

/// Build a plan (§4.7): load snapshots (already hydrated with intervals by
/// the caller), apply restatements, compute missing intervals per snapshot
/// in topological order, and drop snapshots with nothing missing.
pub fn build_plan(
    snapshots: &BTreeMap<SnapshotId, Snapshot>,
    start_ms: i64,
    end_ms: i64,
    latest_ms: i64,
    restatements: &BTreeSet<String>,
) -> Result<Vec<PlanEntry>, CoreError> {
    let mut working = snapshots.clone();

    for (id, snapshot) in working.iter_mut() {
        if restatements.contains(&id.name) {
            snapshot.remove_interval(start_ms, end_ms, latest_ms)?;
        }
    }

    let mut graph: DiGraphMap<&SnapshotId, ()> = DiGraphMap::new();
    for id in working.keys() {
        graph.add_node(id);
    }
    for (id, snapshot) in &working {
        for parent in &snapshot.parents {
            if working.contains_key(parent) {
                graph.add_edge(parent, id, ());
            }
        }
    }

    let levels = topological_levels(&graph)?;

    let mut entries = Vec::new();
    for level in levels {
        let level_results: Vec<Option<PlanEntry>> = level
            .par_iter()
            .map(|id| -> Result<Option<PlanEntry>, CoreError> {
                let snapshot = working.get(id).expect("level node exists in working map");
                let restated = restatements.contains(&id.name);
                let effective_start = match snapshot.model.start_ms {
                    Some(model_start) => start_ms.max(model_start),
                    None => start_ms,
                };
                let missing = snapshot.missing_intervals(effective_start, end_ms, latest_ms, restated)?;
                if missing.is_empty() {
                    return Ok(None);
                }
                let cadence = Cadence::parse(&snapshot.model.cron)?;
                let batches = chunk_into_batches(&missing, snapshot.model.effective_batch_size(), &cadence);
                Ok(Some(PlanEntry {
                    snapshot_id: id.clone(),
                    missing,
                    batches,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.extend(level_results.into_iter().flatten());
    }

    Ok(entries)
}
