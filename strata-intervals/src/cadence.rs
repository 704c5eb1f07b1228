//! Cadence: the cron-derived step function that `missing()` snaps windows to
//! (§4.1 "daily boundaries derived from cron"). The `cron` crate gives us
//! "next scheduled time after X"; we build floor/ceil on top of it by
//! searching backward from an expanding window, since the crate has no
//! native "previous" query.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;
use strata_core::errors::CoreError;

/// A parsed cadence expression plus the convenience constructors the
/// scheduler commonly needs (hourly/daily/weekly/monthly).
#[derive(Clone)]
pub struct Cadence {
    expr: String,
    schedule: Schedule,
}

impl std::fmt::Debug for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cadence").field("expr", &self.expr).finish()
    }
}

const SEARCH_START_WINDOW_DAYS: i64 = 2;
const SEARCH_MAX_WINDOW_DAYS: i64 = 366 * 5;

impl Cadence {
    /// Parse a 7-field cron expression (`cron` crate convention: seconds
    /// first). `@hourly`/`@daily`/`@weekly`/`@monthly`/`@yearly` shorthands
    /// are also accepted.
    pub fn parse(expr: &str) -> Result<Self, CoreError> {
        let normalized = match expr.trim() {
            "@hourly" => "0 0 * * * * *",
            "@daily" => "0 0 0 * * * *",
            "@weekly" => "0 0 0 * * 0 *",
            "@monthly" => "0 0 0 1 * * *",
            "@yearly" | "@annually" => "0 0 0 1 1 * *",
            other => other,
        };
        let schedule = Schedule::from_str(normalized)
            .map_err(|e| CoreError::config(format!("invalid cadence `{expr}`: {e}"), "<cadence>"))?;
        Ok(Self {
            expr: expr.to_string(),
            schedule,
        })
    }

    pub fn daily() -> Self {
        Self::parse("@daily").expect("builtin cadence is valid")
    }

    pub fn hourly() -> Self {
        Self::parse("@hourly").expect("builtin cadence is valid")
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// The latest scheduled boundary at or before `ts` (inclusive).
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let mut window = Duration::days(SEARCH_START_WINDOW_DAYS);
        let max_window = Duration::days(SEARCH_MAX_WINDOW_DAYS);
        loop {
            let lower = ts - window;
            if let Some(candidate) = self
                .schedule
                .after(&lower)
                .take_while(|t| *t <= ts)
                .last()
            {
                return candidate;
            }
            if window >= max_window {
                // No scheduled boundary found in the search horizon; treat
                // `ts` itself as the boundary rather than looping forever.
                return ts;
            }
            window = window * 2;
        }
    }

    /// The earliest scheduled boundary at or after `ts` (inclusive).
    pub fn ceil(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let floored = self.floor(ts);
        if floored == ts {
            ts
        } else {
            self.schedule.after(&ts).next().unwrap_or(ts)
        }
    }

    /// The next scheduled boundary strictly after `ts`.
    pub fn next_after(&self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&ts).next()
    }

    /// All scheduled boundaries in `[start, end)`, inclusive of `start`.
    pub fn steps_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        if start >= end {
            return Vec::new();
        }
        let mut out = Vec::new();
        let first = self.ceil(start);
        if first < end {
            out.push(first);
        }
        let mut cursor = first;
        while let Some(next) = self.next_after(cursor) {
            if next >= end {
                break;
            }
            out.push(next);
            cursor = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn daily_floor_and_ceil() {
        let cadence = Cadence::daily();
        let mid_day = ts(2023, 1, 15, 13);
        assert_eq!(cadence.floor(mid_day), ts(2023, 1, 15, 0));
        assert_eq!(cadence.ceil(mid_day), ts(2023, 1, 16, 0));
    }

    #[test]
    fn daily_floor_on_boundary_is_identity() {
        let cadence = Cadence::daily();
        let boundary = ts(2023, 1, 15, 0);
        assert_eq!(cadence.floor(boundary), boundary);
        assert_eq!(cadence.ceil(boundary), boundary);
    }

    #[test]
    fn steps_between_counts_days() {
        let cadence = Cadence::daily();
        let steps = cadence.steps_between(ts(2023, 1, 1, 0), ts(2023, 1, 4, 0));
        assert_eq!(
            steps,
            vec![ts(2023, 1, 1, 0), ts(2023, 1, 2, 0), ts(2023, 1, 3, 0)]
        );
    }

    #[test]
    fn hourly_cadence_parses_and_steps() {
        let cadence = Cadence::hourly();
        let steps = cadence.steps_between(ts(2023, 1, 1, 0), ts(2023, 1, 1, 3));
        assert_eq!(steps.len(), 3);
    }
}
