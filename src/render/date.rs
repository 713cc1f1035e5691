use chrono::{DateTime, NaiveDate, Utc};

/// Display format: abbreviated English month, unpadded day, full year.
const DISPLAY_FORMAT: &str = "%b %-d, %Y";

/// Formats a feed date as `Mar 5, 2024`.
///
/// Accepts RFC 2822 (what RSS `pubDate` uses), RFC 3339, and bare
/// `YYYY-MM-DD`. The date is taken in UTC and month names are always
/// English, so the output never depends on the host's locale or zone.
/// Anything else is returned as-is (trimmed).
///
/// ```
/// use substack_blog::render::format_date;
///
/// assert_eq!(format_date("2024-03-05T00:00:00Z"), "Mar 5, 2024");
/// assert_eq!(format_date("Tue, 05 Mar 2024 12:00:00 GMT"), "Mar 5, 2024");
/// ```
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    match parse_date(trimmed) {
        Some(date) => date.format(DISPLAY_FORMAT).to_string(),
        None => {
            if !trimmed.is_empty() {
                tracing::debug!(date = %trimmed, "Unrecognized date format, showing as-is");
            }
            trimmed.to_string()
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
