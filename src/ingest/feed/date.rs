// src/ingest/feed/date.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn from_rfc2822_strict(ts: &str) -> Option<DateTime<Utc>> {
    let dt = OffsetDateTime::parse(ts, &Rfc2822).ok()?;
    Utc.timestamp_opt(dt.unix_timestamp(), dt.nanosecond()).single()
}

fn from_rfc2822_lenient(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn from_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Zone-less timestamps are taken as UTC.
fn from_naive(ts: &str) -> Option<DateTime<Utc>> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(ts, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(ts, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Best-effort parse of a feed timestamp (RFC 2822, RFC 3339/ISO 8601 and a
/// few zone-less variants).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let ts = raw.trim();
    if ts.is_empty() {
        return None;
    }
    from_rfc2822_strict(ts)
        .or_else(|| from_rfc2822_lenient(ts))
        .or_else(|| from_rfc3339(ts))
        .or_else(|| from_naive(ts))
}

/// Canonical ISO-8601 form used in persisted items: `2024-05-01T08:30:00.000Z`.
pub fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse and re-format; empty when `raw` is not a recognizable timestamp.
pub fn normalize_timestamp(raw: &str) -> String {
    parse_timestamp(raw).map(to_iso).unwrap_or_default()
}
