use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Relative label for `timestamp` as seen from `now`.
///
/// Minutes are rounded, hours and days truncated. Timestamps in the future
/// read as "just now". A value that does not parse as a date is returned
/// as-is (providers sometimes already answer "2 hours ago").
pub fn time_ago(timestamp: &str, now: DateTime<Utc>) -> String {
    let trimmed = timestamp.trim();
    let posted = match parse_timestamp(trimmed) {
        Some(posted) => posted,
        None if trimmed.is_empty() => return "just now".to_string(),
        None => return trimmed.to_string(),
    };

    let diff_ms = (now - posted).num_milliseconds();
    if diff_ms < 60_000 {
        return "just now".to_string();
    }
    let minutes = (diff_ms as f64 / 60_000.0).round() as i64;
    if minutes < 60 {
        return format!("{} ago", plural(minutes, "minute"));
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} ago", plural(hours, "hour"));
    }

    let days = hours / 24;
    format!("{} ago", plural(days, "day"))
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
}

fn plural(count: i64, unit: &str) -> String {
    if count > 1 {
        format!("{} {}s", count, unit)
    } else {
        format!("{} {}", count, unit)
    }
}
