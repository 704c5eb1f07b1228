//! Date/timestamp string helpers for the template context (§4.3 "`{start_ds,
//! end_ds, latest_ds, start_ts, end_ts, ...}`").

use chrono::{DateTime, TimeZone, Utc};

fn dt(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
}

pub fn to_ds(ms: i64) -> String {
    dt(ms).format("%Y-%m-%d").to_string()
}

pub fn to_ts(ms: i64) -> String {
    dt(ms).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render an epoch-ms instant as a literal suitable for embedding in a SQL
/// `BETWEEN` clause, honoring a `TimeColumn::format` strftime string when one
/// is declared; falls back to an ISO-ish timestamp literal otherwise.
pub fn to_time_literal(ms: i64, format: Option<&str>) -> String {
    match format {
        Some(fmt) => format!("'{}'", dt(ms).format(fmt)),
        None => format!("'{}'", to_ts(ms)),
    }
}
