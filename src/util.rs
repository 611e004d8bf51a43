// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV text handling so the normalizer
// and aggregator can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Date layouts seen in viewing exports, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Trim a CSV cell and treat empty or whitespace-only text as absent.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Accepts a decimal comma (`"42,5"`).
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', ".");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar date, accepting an optional time-of-day suffix
/// (`"2024-03-04 19:30:00"` or `"2024-03-04T19:30"`).
pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Fixed two-decimal rendering used in CSV exports.
pub fn format_decimal(n: f64) -> String {
    format!("{:.2}", n)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
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
    // Counts in console messages (e.g., `9,855 sessions loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trims_and_rejects_blank() {
        assert_eq!(non_empty(Some("  Netflix ")), Some("Netflix"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_parse_f64_safe() {
        assert_eq!(parse_f64_safe("45"), Some(45.0));
        assert_eq!(parse_f64_safe(" 42,5 "), Some(42.5));
        assert_eq!(parse_f64_safe("45 min"), None);
        assert_eq!(parse_f64_safe(""), None);
    }

    #[test]
    fn test_parse_date_safe_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4);
        assert_eq!(parse_date_safe("2024-03-04"), expected);
        assert_eq!(parse_date_safe("2024/03/04"), expected);
        assert_eq!(parse_date_safe("04/03/2024"), expected);
        assert_eq!(parse_date_safe("2024-03-04 19:30:00"), expected);
        assert_eq!(parse_date_safe("2024-03-04T19:30:00"), expected);
        assert_eq!(parse_date_safe("hier"), None);
    }

    #[test]
    fn test_average_empty_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[30.0, 60.0]), 45.0);
    }

    #[test]
    fn test_format_number_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
