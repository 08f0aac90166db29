// Utility helpers for dates, number rendering and escaping.
//
// Everything here is pure so the aggregation and rendering code can be
// tested without touching the filesystem.
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use num_format::{Locale, ToFormattedString};

/// Parse a `YYYY-MM-DD` cell. Returns `None` for empty or malformed values.
///
/// chrono's `%Y` also takes signed years of any width (`+20240-01-01`), so
/// the shape is checked before parsing.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if !is_iso_date_shape(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn is_iso_date_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b.iter().enumerate().all(|(i, c)| match i {
            4 | 7 => *c == b'-',
            _ => c.is_ascii_digit(),
        })
}

fn is_weekday(d: NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count weekdays in the half-open range `[begin, end)`.
///
/// When `end` precedes `begin` the weekdays of `[end, begin)` are counted
/// and the result is negated.
pub fn busday_count(begin: NaiveDate, end: NaiveDate) -> i64 {
    if end < begin {
        return -busday_count(end, begin);
    }
    begin
        .iter_days()
        .take_while(|d| *d < end)
        .filter(|d| is_weekday(*d))
        .count() as i64
}

/// Business days from `start` through `end` inclusive, times eight hours.
pub fn calculate_work_hours(start: NaiveDate, end: NaiveDate) -> f64 {
    let days = match end.checked_add_signed(Duration::days(1)) {
        Some(after_end) => busday_count(start, after_end),
        // `end` is the last representable date.
        None => busday_count(start, end) + i64::from(is_weekday(end)),
    };
    days as f64 * crate::types::HOURS_PER_DAY
}

/// `total_hours / count`, or zero when there is nothing to divide by.
pub fn calculate_average_hours(total_hours: f64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total_hours / count as f64
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Render a float the way the export tooling prints it: shortest form,
/// always with at least one fractional digit (`40.0`, `33.33`).
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// `count / total * 100` rounded to two places with a trailing `%`.
/// A zero total renders as `0.0%`.
pub fn format_percentage(count: u64, total: u64) -> String {
    let pct = if total == 0 {
        0.0
    } else {
        round2(count as f64 / total as f64 * 100.0)
    };
    format!("{}%", format_float(pct))
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with thousands separators, e.g. `1,234.50`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Encode a value for use inside a URL path segment or query string.
pub fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date_safe(Some(s)).unwrap()
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(
            parse_date_safe(Some(" 2024-01-05 ")),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(parse_date_safe(Some("05/01/2024")), None);
        assert_eq!(parse_date_safe(Some("")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn rejects_signed_and_wide_years() {
        assert_eq!(parse_date_safe(Some("+20240-01-01")), None);
        assert_eq!(parse_date_safe(Some("+262142-12-31")), None);
        assert_eq!(parse_date_safe(Some("-0001-01-01")), None);
        assert_eq!(parse_date_safe(Some("2024-1-05")), None);
        assert_eq!(parse_date_safe(Some(" 2024-01-05 ")), Some(date("2024-01-05")));
    }

    #[test]
    fn last_representable_date_does_not_overflow() {
        let end = NaiveDate::MAX;
        let start = end - Duration::days(6);
        let expected = (0..7)
            .map(|i| start + Duration::days(i))
            .filter(|d| is_weekday(*d))
            .count() as f64
            * 8.0;
        assert_eq!(calculate_work_hours(start, end), expected);
    }

    #[test]
    fn work_week_is_forty_hours() {
        // 2024-01-01 is a Monday.
        assert_eq!(calculate_work_hours(date("2024-01-01"), date("2024-01-05")), 40.0);
    }

    #[test]
    fn weekends_are_excluded() {
        // Friday through the following Monday: two business days.
        assert_eq!(calculate_work_hours(date("2024-01-05"), date("2024-01-08")), 16.0);
        // A Saturday alone.
        assert_eq!(calculate_work_hours(date("2024-01-06"), date("2024-01-06")), 0.0);
        // Same weekday.
        assert_eq!(calculate_work_hours(date("2024-01-03"), date("2024-01-03")), 8.0);
    }

    #[test]
    fn reversed_range_counts_negative() {
        // [2024-01-03, 2024-01-05) holds Wednesday and Thursday.
        assert_eq!(busday_count(date("2024-01-05"), date("2024-01-03")), -2);
        assert_eq!(calculate_work_hours(date("2024-01-05"), date("2024-01-03")), -8.0);
    }

    #[test]
    fn average_hours_handles_zero_count() {
        assert_eq!(calculate_average_hours(40.0, 0), 0.0);
        assert_eq!(calculate_average_hours(40.0, 4), 10.0);
    }

    #[test]
    fn percentages_render_like_the_exports() {
        assert_eq!(format_percentage(2, 5), "40.0%");
        assert_eq!(format_percentage(1, 3), "33.33%");
        assert_eq!(format_percentage(2, 3), "66.67%");
        assert_eq!(format_percentage(7, 7), "100.0%");
        assert_eq!(format_percentage(0, 0), "0.0%");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234.5, 2), "1,234.50");
        assert_eq!(format_number(-8.0, 1), "-8.0");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_int(9855), "9,855");
    }

    #[test]
    fn escaping() {
        assert_eq!(html_escape("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
        assert_eq!(url_encode("Jane Doe/x"), "Jane%20Doe%2Fx");
    }
}
