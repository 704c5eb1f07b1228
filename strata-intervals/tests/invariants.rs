//! Property-based invariants from the interval algebra's testable
//! properties: commutativity of add, remove-as-inverse, and the
//! missing/existing partition of a snapped window.

use chrono::TimeZone;
use proptest::prelude::*;
use strata_core::interval::Interval;
use strata_intervals::{add, merge_two, missing, remove, Cadence};

const DAY: i64 = 86_400_000;
const MAX_DAYS: i64 = 60;

fn arb_day_range() -> impl Strategy<Value = (i64, i64)> {
    (0..MAX_DAYS, 1..10i64).prop_map(|(start_day, len_days)| {
        let start = start_day * DAY;
        let end = start + len_days * DAY;
        (start, end)
    })
}

fn arb_interval_list() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec(arb_day_range(), 0..6).prop_map(|ranges| {
        ranges
            .into_iter()
            .filter_map(|(s, e)| Interval::new(s, e))
            .collect()
    })
}

proptest! {
    #[test]
    fn add_is_commutative(
        existing in arb_interval_list(),
        (xs, xe) in arb_day_range(),
        (ys, ye) in arb_day_range(),
    ) {
        let via_x_then_y = add(&add(&existing, xs, xe).unwrap(), ys, ye).unwrap();
        let via_y_then_x = add(&add(&existing, ys, ye).unwrap(), xs, xe).unwrap();
        prop_assert_eq!(via_x_then_y, via_y_then_x);
    }

    #[test]
    fn merge_two_matches_sequential_add(
        a in arb_interval_list(),
        b in arb_interval_list(),
    ) {
        let merged = merge_two(&a, &b);
        let mut sequential = a.clone();
        for iv in &b {
            sequential = add(&sequential, iv.start_ms, iv.end_ms).unwrap();
        }
        prop_assert_eq!(merged, sequential);
    }

    #[test]
    fn remove_inverts_add_on_disjoint_range(
        existing in arb_interval_list(),
        (xs, xe) in arb_day_range(),
    ) {
        let disjoint = !existing.iter().any(|iv| iv.overlaps(&Interval::new(xs, xe).unwrap()));
        prop_assume!(disjoint);
        let added = add(&existing, xs, xe).unwrap();
        let removed = remove(&added, xs, xe).unwrap();
        prop_assert_eq!(removed, existing);
    }

    #[test]
    fn missing_and_existing_partition_the_window(
        existing in arb_interval_list(),
        (s, e) in arb_day_range(),
    ) {
        let cadence = Cadence::daily();
        let missing_ranges = missing(&existing, s, e, &cadence, 0, false).unwrap();

        let snapped_start = cadence.floor(chrono::Utc.timestamp_millis_opt(s).unwrap());
        let snapped_end = cadence.ceil(chrono::Utc.timestamp_millis_opt(e).unwrap());
        let window_start = snapped_start.timestamp_millis();
        let window_end = snapped_end.timestamp_millis();

        if window_start < window_end {
            let mut covered_ms: i64 = 0;
            for iv in &missing_ranges {
                covered_ms += iv.end_ms - iv.start_ms;
            }
            for iv in &existing {
                let s = iv.start_ms.max(window_start);
                let e = iv.end_ms.min(window_end);
                if e > s {
                    covered_ms += e - s;
                }
            }
            // missing ranges and existing-within-window may double count
            // overlaps with each other's boundaries only at endpoints, never
            // interior — so total covered can't exceed the window twice over.
            prop_assert!(covered_ms >= window_end - window_start);
        }
    }
}
