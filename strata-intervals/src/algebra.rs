//! Interval algebra (§4.1): `add`, `remove`, `merge_two`, `missing`. All
//! four operate on a sorted, pairwise-disjoint `IntervalSet` and return one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use strata_core::errors::CoreError;
use strata_core::interval::{Interval, IntervalSet};

use crate::cadence::Cadence;

fn ms_to_dt(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(Utc.timestamp_millis_opt(0).unwrap())
}

fn dt_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn invalid(start_ms: i64, end_ms: i64, reason: &str) -> CoreError {
    CoreError::InvalidInterval {
        start_ms,
        end_ms,
        reason: reason.to_string(),
    }
}

/// Sort and coalesce overlapping/adjacent intervals into the canonical form.
fn coalesce(mut intervals: Vec<Interval>) -> IntervalSet {
    intervals.sort_by_key(|i| i.start_ms);
    let mut out: IntervalSet = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match out.last_mut() {
            Some(last) if last.is_adjacent_or_overlapping(&iv) => {
                last.end_ms = last.end_ms.max(iv.end_ms);
            }
            _ => out.push(iv),
        }
    }
    out
}

/// Merge `[start_ms, end_ms)` into `existing`, coalescing adjacent/overlapping ranges.
pub fn add(existing: &[Interval], start_ms: i64, end_ms: i64) -> Result<IntervalSet, CoreError> {
    if start_ms >= end_ms {
        return Err(invalid(start_ms, end_ms, "start_ms >= end_ms"));
    }
    let mut all: Vec<Interval> = existing.to_vec();
    all.push(Interval {
        start_ms,
        end_ms,
    });
    Ok(coalesce(all))
}

/// Union of two interval lists.
pub fn merge_two(a: &[Interval], b: &[Interval]) -> IntervalSet {
    let mut all: Vec<Interval> = Vec::with_capacity(a.len() + b.len());
    all.extend_from_slice(a);
    all.extend_from_slice(b);
    coalesce(all)
}

/// Subtract `[start_ms, end_ms)` from `existing`, splitting a containing
/// interval into at most two pieces.
pub fn remove(existing: &[Interval], start_ms: i64, end_ms: i64) -> Result<IntervalSet, CoreError> {
    if start_ms >= end_ms {
        return Err(invalid(start_ms, end_ms, "start_ms >= end_ms"));
    }
    let cut = Interval { start_ms, end_ms };
    let mut out = IntervalSet::new();
    for iv in existing {
        if !iv.overlaps(&cut) {
            out.push(*iv);
            continue;
        }
        if iv.start_ms < start_ms {
            out.push(Interval {
                start_ms: iv.start_ms,
                end_ms: start_ms,
            });
        }
        if iv.end_ms > end_ms {
            out.push(Interval {
                start_ms: end_ms,
                end_ms: iv.end_ms,
            });
        }
    }
    out.sort_by_key(|i| i.start_ms);
    Ok(out)
}

/// `window \ existing`, clipped to `[window_start, window_end)`. Exposed so
/// callers outside the algebra (e.g. the promotion gap-check) can reuse the
/// same coverage-subtraction primitive `missing()` is built on.
pub fn gaps_in_window(window_start: i64, window_end: i64, existing: &[Interval]) -> Vec<Interval> {
    let window = Interval {
        start_ms: window_start,
        end_ms: window_end,
    };
    let mut covering: Vec<Interval> = existing
        .iter()
        .copied()
        .filter(|iv| iv.overlaps(&window))
        .collect();
    covering.sort_by_key(|iv| iv.start_ms);

    let mut out = Vec::new();
    let mut cursor = window_start;
    for iv in covering {
        let s = iv.start_ms.max(window_start);
        let e = iv.end_ms.min(window_end);
        if s > cursor {
            out.push(Interval {
                start_ms: cursor,
                end_ms: s,
            });
        }
        cursor = cursor.max(e);
    }
    if cursor < window_end {
        out.push(Interval {
            start_ms: cursor,
            end_ms: window_end,
        });
    }
    out
}

/// `missing(existing, [s,e), cadence, lookback, restated, latest)` (§4.1).
///
/// `restated` stands in for "the snapshot's name appears in `restatements`" —
/// callers resolve the name-to-bool lookup before calling into the algebra.
///
/// `latest_ms` is the execution-time reference point ("now", not the query's
/// own `end_ms`) that the lookback window is anchored to. A model with
/// `lookback = N` depends on data that settles over its next `N` cadence
/// steps, so the `N` steps immediately preceding `latest_ms` are always
/// re-marked missing — even when `existing` already covers them — to force
/// reprocessing while they can still change. Anchoring to `latest_ms` rather
/// than `end_ms` keeps a backfill over an old window from re-marking steps
/// that have long since settled relative to the real current time.
pub fn missing(
    existing: &[Interval],
    start_ms: i64,
    end_ms: i64,
    cadence: &Cadence,
    lookback: u32,
    restated: bool,
    latest_ms: i64,
) -> Result<IntervalSet, CoreError> {
    if start_ms >= end_ms {
        return Err(invalid(start_ms, end_ms, "start_ms >= end_ms"));
    }

    let snapped_start = cadence.floor(ms_to_dt(start_ms));
    let snapped_end = cadence.ceil(ms_to_dt(end_ms));
    let window_start = dt_to_ms(snapped_start);
    let window_end = dt_to_ms(snapped_end);

    if window_start >= window_end {
        return Ok(IntervalSet::new());
    }

    let mut out = if restated {
        vec![Interval {
            start_ms: window_start,
            end_ms: window_end,
        }]
    } else {
        gaps_in_window(window_start, window_end, existing)
    };

    if lookback > 0 {
        let mut boundary = cadence.floor(ms_to_dt(latest_ms));
        for _ in 0..lookback {
            let prev = cadence.floor(boundary - Duration::milliseconds(1));
            let step_start = dt_to_ms(prev);
            let step_end = dt_to_ms(boundary);
            if step_start < window_end && step_end > window_start && step_start < step_end {
                out.push(Interval {
                    start_ms: step_start,
                    end_ms: step_end,
                });
            }
            boundary = prev;
        }
    }

    Ok(coalesce(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(s: i64, e: i64) -> Interval {
        Interval::new(s, e).unwrap()
    }

    const DAY: i64 = 86_400_000;

    #[test]
    fn add_coalesces_adjacent() {
        let existing = vec![iv(0, DAY)];
        let result = add(&existing, DAY, 2 * DAY).unwrap();
        assert_eq!(result, vec![iv(0, 2 * DAY)]);
    }

    #[test]
    fn add_rejects_empty_range() {
        assert!(add(&[], 10, 10).is_err());
    }

    #[test]
    fn remove_splits_containing_interval() {
        let existing = vec![iv(0, 3 * DAY)];
        let result = remove(&existing, DAY, 2 * DAY).unwrap();
        assert_eq!(result, vec![iv(0, DAY), iv(2 * DAY, 3 * DAY)]);
    }

    #[test]
    fn remove_leaves_untouched_intervals_alone() {
        let existing = vec![iv(0, DAY), iv(5 * DAY, 6 * DAY)];
        let result = remove(&existing, DAY, 2 * DAY).unwrap();
        assert_eq!(result, existing);
    }

    #[test]
    fn missing_with_full_coverage_is_empty() {
        let cadence = Cadence::daily();
        let existing = vec![iv(0, 3 * DAY)];
        let result = missing(&existing, 0, 3 * DAY, &cadence, 0, false, 3 * DAY).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn missing_reports_gap() {
        let cadence = Cadence::daily();
        let existing = vec![iv(0, DAY)];
        let result = missing(&existing, 0, 3 * DAY, &cadence, 0, false, 3 * DAY).unwrap();
        assert_eq!(result, vec![iv(DAY, 3 * DAY)]);
    }

    #[test]
    fn missing_restated_ignores_existing_coverage() {
        let cadence = Cadence::daily();
        let existing = vec![iv(0, 3 * DAY)];
        let result = missing(&existing, 0, 3 * DAY, &cadence, 0, true, 3 * DAY).unwrap();
        assert_eq!(result, vec![iv(0, 3 * DAY)]);
    }

    #[test]
    fn missing_with_lookback_marks_recent_steps() {
        let cadence = Cadence::daily();
        let existing = vec![iv(0, 3 * DAY)];
        let result = missing(&existing, 0, 3 * DAY, &cadence, 1, false, 3 * DAY).unwrap();
        // fully covered window but lookback=1 re-marks the last completed day
        // relative to latest (here, the window's own end).
        assert_eq!(result, vec![iv(2 * DAY, 3 * DAY)]);
    }

    #[test]
    fn missing_lookback_anchors_to_latest_not_window_end() {
        let cadence = Cadence::daily();
        // Fully covered through day 10 — a backfill over the first three days
        // asked for long after the fact (latest is day 10, not day 3).
        let existing = vec![iv(0, 10 * DAY)];
        let result = missing(&existing, 0, 3 * DAY, &cadence, 1, false, 10 * DAY).unwrap();
        // The lookback step relative to latest (day 9-10) falls outside the
        // requested window entirely, so the settled backfill window reports
        // no missing intervals.
        assert!(result.is_empty());
    }
}
