//! Timestamp resolution.
//!
//! Priority, highest first:
//! 1. An absolute timestamp with an explicit `GMT±HHMM` offset embedded in the
//!    entry body (`Tue Dec 17 2024 09:18:05 GMT-0500`). This is the event time;
//!    the header carries log-shipping time.
//! 2. The header date/time of the matched grammar.
//! 3. Wall clock at parse time.
//!
//! Header times without an explicit offset are read as UTC.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

/// `Tue Dec 17 2024 09:18:05 GMT-0500`
static EMBEDDED_GMT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2})\s+(\d{4})\s+(\d{1,2}:\d{2}:\d{2})\s+GMT([+-]\d{4})",
    )
    .expect("embedded GMT pattern is valid")
});

/// `H:MM:SS`, optional `,mmm`, optional AM/PM, optional trailing `,mmm`
static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})(?:[,.](\d{1,3}))?(?:\s*([AaPp])\.?[Mm]\.?)?(?:\s*,\s*(\d{1,3}))?$")
        .expect("clock pattern is valid")
});

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Header time, or wall clock when the header could not be parsed.
pub fn or_wall_clock(header: Option<i64>) -> i64 {
    header.unwrap_or_else(|| {
        tracing::trace!("timestamp: header unparseable, using wall clock");
        now_millis()
    })
}

/// Find the first embedded `... GMT±HHMM` timestamp in `message`, then `payload`.
pub fn embedded_timestamp(message: &str, payload: &str) -> Option<i64> {
    find_embedded(message).or_else(|| find_embedded(payload))
}

fn find_embedded(text: &str) -> Option<i64> {
    // Skip the regex for the common case.
    if !text.contains("GMT") {
        return None;
    }
    EMBEDDED_GMT.captures_iter(text).find_map(|caps| {
        // Weekday is ignored: a wrong weekday in the source must not discard the time.
        let normalized = format!("{} {} {} {} {}", &caps[1], &caps[2], &caps[3], &caps[4], &caps[5]);
        DateTime::parse_from_str(&normalized, "%b %d %Y %H:%M:%S %z")
            .ok()
            .map(|dt| dt.timestamp_millis())
    })
}

/// Legacy grammar: `M/D/YYYY` plus a clock such as `5:04:57 AM,388`.
pub fn parse_legacy(date: &str, time: &str) -> Option<i64> {
    let mut parts = date.trim().split('/');
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let (clock, extra_ms) = parse_clock(time)?;
    Some(to_millis(date.and_time(clock)) + extra_ms)
}

/// ISO grammar: `YYYY-MM-DD` + `HH:MM:SS` + optional millisecond fragment.
pub fn parse_iso(date: &str, time: &str, millis: Option<&str>) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let clock = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S").ok()?;
    let ms = match millis {
        Some(fragment) => fragment_millis(fragment)?,
        None => 0,
    };
    Some(to_millis(date.and_time(clock)) + ms)
}

/// RFC 3339 / ISO 8601 with offset (`2026-01-09T22:46:45.367125Z`), falling back
/// to naive `YYYY-MM-DD[ T]HH:MM:SS[.fff]` read as UTC.
pub fn parse_rfc3339(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(to_millis)
}

/// Parse a wall-clock string into a time of day and extra milliseconds.
///
/// A millisecond group attached after the AM/PM marker (`5:04:57 AM,388`) is
/// returned separately and added on top of the base time.
pub fn parse_clock(time: &str) -> Option<(NaiveTime, i64)> {
    let caps = CLOCK.captures(time.trim())?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps[3].parse().ok()?;

    if let Some(meridiem) = caps.get(5) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("p");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    let inner_ms = caps.get(4).map(|m| fragment_millis(m.as_str())).unwrap_or(Some(0))?;
    let trailing_ms = caps.get(6).map(|m| fragment_millis(m.as_str())).unwrap_or(Some(0))?;

    let clock = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some((clock, inner_ms + trailing_ms))
}

/// A millisecond fragment is taken at face value: `388` is 388ms, `5` is 5ms.
fn fragment_millis(fragment: &str) -> Option<i64> {
    let fragment = fragment.trim();
    if fragment.is_empty() || fragment.len() > 3 {
        return None;
    }
    fragment.parse().ok()
}

fn to_millis(naive: NaiveDateTime) -> i64 {
    naive.and_utc().timestamp_millis()
}
