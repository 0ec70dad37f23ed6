use chrono::{DateTime, Local, NaiveDateTime, Utc};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// Format a publish date relative to `now`.
///
/// Thresholds are floor divisions of the elapsed milliseconds:
/// under a minute is "just now", then "{n}m ago", "{n}h ago", "{n}d ago",
/// and from seven days on the local date. Dates in the future read as
/// "just now".
///
/// ```
/// use chrono::{Duration, Utc};
/// use homedeck::feed::format_relative_time;
///
/// let now = Utc::now();
/// assert_eq!(format_relative_time(now - Duration::seconds(59), now), "just now");
/// assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m ago");
/// assert_eq!(format_relative_time(now - Duration::hours(23), now), "23h ago");
/// ```
pub fn format_relative_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed_ms = (now - date).num_milliseconds();
    let minutes = elapsed_ms.div_euclid(MINUTE_MS);
    let hours = elapsed_ms.div_euclid(HOUR_MS);
    let days = elapsed_ms.div_euclid(DAY_MS);

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        date.with_timezone(&Local).format("%x").to_string()
    }
}

/// Parse the converter's `pubDate`.
///
/// rss2json emits `YYYY-MM-DD HH:MM:SS` in UTC; RFC 3339 and RFC 2822 are
/// accepted as well for self-hosted converters that pass dates through.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
