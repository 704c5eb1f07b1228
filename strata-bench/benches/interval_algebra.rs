//! Interval algebra and cadence-aware missing-interval computation under
//! realistic fragmentation — many small disjoint intervals rather than one
//! contiguous span, since that's the shape production snapshot history
//! actually takes.

use criterion::{criterion_group, criterion_main, Criterion};

use strata_core::interval::Interval;
use strata_intervals::{missing, Cadence};

const DAY: i64 = 86_400_000;

fn fragmented_intervals(n: usize) -> Vec<Interval> {
    (0..n)
        .map(|i| {
            let start = (i as i64) * 2 * DAY;
            Interval::new(start, start + DAY).unwrap()
        })
        .collect()
}

fn bench_missing(c: &mut Criterion) {
    let cadence = Cadence::daily();
    let existing = fragmented_intervals(500);
    let window_end = 1000 * DAY;

    c.bench_function("missing_over_500_fragmented_intervals", |b| {
        b.iter(|| missing(&existing, 0, window_end, &cadence, 0, false).unwrap())
    });

    c.bench_function("missing_with_lookback", |b| {
        b.iter(|| missing(&existing, 0, window_end, &cadence, 7, false).unwrap())
    });

    c.bench_function("missing_restated_whole_window", |b| {
        b.iter(|| missing(&existing, 0, window_end, &cadence, 0, true).unwrap())
    });
}

fn bench_remove(c: &mut Criterion) {
    let existing = fragmented_intervals(500);
    c.bench_function("remove_from_500_fragmented_intervals", |b| {
        b.iter(|| strata_intervals::remove(&existing, 10 * DAY, 20 * DAY).unwrap())
    });
}

criterion_group!(benches, bench_missing, bench_remove);
criterion_main!(benches);
