//! Turns raw CSV rows into the cleaned session table.
//!
//! Every column is derived first (hour of day, weekday label, day type) and
//! only then are incomplete or duplicate rows dropped, so a row whose start
//! time yields no hour is removed by the same pass as a row with a blank cell.

use crate::error::{Result, TimeParseError};
use crate::types::{Column, RawRow, RawTable, SessionRecord, SessionTable, Weekday};
use crate::util::{non_empty, parse_date_safe, parse_f64_safe};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

/// Counts of what the cleaning pass kept and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub total_rows: usize,
    /// Records the CSV reader could not decode at all.
    pub malformed_rows: usize,
    /// Rows with at least one blank required cell.
    pub missing_values: usize,
    /// Rows whose start time failed both parsing stages.
    pub unparsable_times: usize,
    pub unparsable_dates: usize,
    /// Non-numeric or negative durations.
    pub invalid_durations: usize,
    pub duplicates_removed: usize,
    pub retained: usize,
}

impl CleaningReport {
    pub fn unparsable(&self) -> usize {
        self.malformed_rows + self.unparsable_times + self.unparsable_dates + self.invalid_durations
    }

    pub fn dropped(&self) -> usize {
        self.total_rows - self.retained
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: SessionTable,
    pub report: CleaningReport,
}

#[derive(Debug)]
enum DropReason {
    Missing(Column),
    UnparsableTime(TimeParseError),
    UnparsableDate(String),
    InvalidDuration(String),
}

/// Extract the hour of day from a `start_time` cell.
///
/// Returns `Ok(None)` only when the cell is absent. Otherwise the value is
/// first parsed strictly as a timestamp or time of day (with any trailing
/// timezone offset discarded), then, failing that, the text before the first
/// `:` is read as an integer hour. A value that survives neither stage, or
/// whose leading hour is outside 0–23, is an error.
pub fn parse_hour(raw: Option<&str>) -> std::result::Result<Option<u8>, TimeParseError> {
    let Some(value) = non_empty(raw) else {
        return Ok(None);
    };
    if let Some(hour) = strict_hour(value) {
        return Ok(Some(hour));
    }
    lenient_hour(value).map(Some)
}

fn strict_hour(value: &str) -> Option<u8> {
    let local = strip_offset(value);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
        .map(|dt| dt.hour())
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(local, fmt).ok())
                .map(|t| t.hour())
        })
        .or_else(|| NaiveDate::parse_from_str(local, "%Y-%m-%d").ok().map(|_| 0))
        .map(|h| h as u8)
}

fn lenient_hour(value: &str) -> std::result::Result<u8, TimeParseError> {
    let leading = value.split(':').next().unwrap_or(value).trim();
    let hour: i64 = leading
        .parse()
        .map_err(|_| TimeParseError::new(value, format!("leading component {leading:?} is not an hour")))?;
    u8::try_from(hour)
        .ok()
        .filter(|h| *h <= 23)
        .ok_or_else(|| TimeParseError::new(value, format!("hour {hour} outside 0-23")))
}

/// Drop a trailing `+HH:MM`, `Z` or `-HH:MM` segment.
fn strip_offset(value: &str) -> &str {
    if let Some(idx) = value.find('+') {
        return value[..idx].trim_end();
    }
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    if value.len() > 6 && value.is_char_boundary(value.len() - 6) {
        let (head, tail) = value.split_at(value.len() - 6);
        let bytes = tail.as_bytes();
        let is_offset = bytes[0] == b'-'
            && bytes[1].is_ascii_digit()
            && bytes[2].is_ascii_digit()
            && bytes[3] == b':'
            && bytes[4].is_ascii_digit()
            && bytes[5].is_ascii_digit();
        if is_offset && head.contains(':') {
            return head;
        }
    }
    value
}

fn derive_record(row: &RawRow) -> std::result::Result<SessionRecord, DropReason> {
    let hour = parse_hour(row.start_time.as_deref()).map_err(DropReason::UnparsableTime)?;

    let date_text = non_empty(row.date.as_deref()).ok_or(DropReason::Missing(Column::Date))?;
    let start_time =
        non_empty(row.start_time.as_deref()).ok_or(DropReason::Missing(Column::StartTime))?;
    let platform =
        non_empty(row.platform.as_deref()).ok_or(DropReason::Missing(Column::Platform))?;
    let series = non_empty(row.series.as_deref()).ok_or(DropReason::Missing(Column::Series))?;
    let genre = non_empty(row.genre.as_deref()).ok_or(DropReason::Missing(Column::Genre))?;
    let duration_text =
        non_empty(row.duration.as_deref()).ok_or(DropReason::Missing(Column::Duration))?;
    let hour_of_day = hour.ok_or(DropReason::Missing(Column::HourOfDay))?;

    let date = parse_date_safe(date_text)
        .ok_or_else(|| DropReason::UnparsableDate(date_text.to_string()))?;
    let duration = parse_f64_safe(duration_text)
        .filter(|d| *d >= 0.0)
        .ok_or_else(|| DropReason::InvalidDuration(duration_text.to_string()))?;
    // -0.0 and 0.0 must compare equal for duplicate detection.
    let duration = if duration == 0.0 { 0.0 } else { duration };

    let weekday = Weekday::from(date.weekday());
    Ok(SessionRecord {
        date,
        start_time: start_time.to_string(),
        platform: platform.to_string(),
        series: series.to_string(),
        genre: genre.to_string(),
        duration,
        hour_of_day,
        weekday,
        day_type: weekday.day_type(),
    })
}

#[derive(Hash, PartialEq, Eq)]
struct DedupKey<'a> {
    date: chrono::NaiveDate,
    start_time: &'a str,
    platform: &'a str,
    series: &'a str,
    genre: &'a str,
    duration_bits: u64,
}

/// Keep the first occurrence of each fully identical record, in input order.
fn drop_duplicates(records: Vec<SessionRecord>) -> (Vec<SessionRecord>, usize) {
    let mut seen: HashSet<DedupKey<'_>> = HashSet::with_capacity(records.len());
    let mut keep = Vec::with_capacity(records.len());
    for r in &records {
        keep.push(seen.insert(DedupKey {
            date: r.date,
            start_time: &r.start_time,
            platform: &r.platform,
            series: &r.series,
            genre: &r.genre,
            duration_bits: r.duration.to_bits(),
        }));
    }
    drop(seen);

    let removed = keep.iter().filter(|k| !**k).count();
    let unique = records
        .into_iter()
        .zip(keep)
        .filter_map(|(r, k)| k.then_some(r))
        .collect();
    (unique, removed)
}

/// Clean `raw` into a [`SessionTable`].
///
/// Fails only when a required column is missing from the header; per-row
/// problems are dropped and counted in the returned [`CleaningReport`].
pub fn normalize(raw: &RawTable) -> Result<Normalized> {
    raw.require_columns()?;

    let mut report = CleaningReport {
        total_rows: raw.len(),
        malformed_rows: raw.malformed_rows,
        ..CleaningReport::default()
    };
    let mut derived = Vec::with_capacity(raw.rows.len());

    for (idx, row) in raw.rows.iter().enumerate() {
        match derive_record(row) {
            Ok(record) => derived.push(record),
            Err(DropReason::Missing(column)) => {
                debug!("Row {}: missing {}", idx + 1, column);
                report.missing_values += 1;
            }
            Err(DropReason::UnparsableTime(err)) => {
                warn!("Row {}: dropping session, {}", idx + 1, err);
                report.unparsable_times += 1;
            }
            Err(DropReason::UnparsableDate(value)) => {
                warn!("Row {}: dropping session, unparsable date {:?}", idx + 1, value);
                report.unparsable_dates += 1;
            }
            Err(DropReason::InvalidDuration(value)) => {
                warn!("Row {}: dropping session, invalid duration {:?}", idx + 1, value);
                report.invalid_durations += 1;
            }
        }
    }

    let (records, duplicates_removed) = drop_duplicates(derived);
    report.duplicates_removed = duplicates_removed;
    report.retained = records.len();

    info!(
        "Cleaned {} rows: {} retained, {} missing, {} unparsable, {} duplicates",
        report.total_rows,
        report.retained,
        report.missing_values,
        report.unparsable(),
        report.duplicates_removed
    );

    Ok(Normalized {
        table: SessionTable::new(records),
        report,
    })
}
