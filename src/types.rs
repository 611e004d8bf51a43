use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// One input row as read from the CSV, before any parsing.
///
/// Header aliases accept the French column names used by older exports.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawRow {
    #[serde(rename = "date")]
    pub date: Option<String>,
    #[serde(rename = "start_time", alias = "heure_debut")]
    pub start_time: Option<String>,
    #[serde(rename = "platform", alias = "plateforme")]
    pub platform: Option<String>,
    #[serde(rename = "series", alias = "série", alias = "serie")]
    pub series: Option<String>,
    #[serde(rename = "genre")]
    pub genre: Option<String>,
    #[serde(rename = "duration", alias = "durée", alias = "duree")]
    pub duration: Option<String>,
}

/// Raw rows plus the header names they were read under.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Input records the CSV reader could not decode into a row.
    pub malformed_rows: usize,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            headers,
            rows,
            malformed_rows: 0,
        }
    }

    /// Build a table carrying the canonical header names.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let headers = Column::RAW.iter().map(|c| c.name().to_string()).collect();
        Self::new(headers, rows)
    }

    /// Fail with `MissingColumn` for the first required column that no
    /// header maps to.
    pub fn require_columns(&self) -> Result<()> {
        for column in Column::RAW {
            let present = self
                .headers
                .iter()
                .any(|h| h.trim().parse::<Column>().ok() == Some(column));
            if !present {
                return Err(PipelineError::MissingColumn(column.name().to_string()));
            }
        }
        Ok(())
    }

    /// Input records read, decodable or not.
    pub fn len(&self) -> usize {
        self.rows.len() + self.malformed_rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Every column a session table can be grouped or selected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    StartTime,
    Platform,
    Series,
    Genre,
    Duration,
    HourOfDay,
    WeekdayLabel,
    DayType,
}

impl Column {
    /// Columns the input source must supply.
    pub const RAW: [Column; 6] = [
        Column::Date,
        Column::StartTime,
        Column::Platform,
        Column::Series,
        Column::Genre,
        Column::Duration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::StartTime => "start_time",
            Column::Platform => "platform",
            Column::Series => "series",
            Column::Genre => "genre",
            Column::Duration => "duration",
            Column::HourOfDay => "hour_of_day",
            Column::WeekdayLabel => "weekday_label",
            Column::DayType => "day_type",
        }
    }
}

impl FromStr for Column {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let column = match s {
            "date" => Column::Date,
            "start_time" | "heure_debut" => Column::StartTime,
            "platform" | "plateforme" => Column::Platform,
            "series" | "série" | "serie" => Column::Series,
            "genre" => Column::Genre,
            "duration" | "durée" | "duree" => Column::Duration,
            "hour_of_day" | "heure_arrondie" => Column::HourOfDay,
            "weekday_label" | "jour_semaine" => Column::WeekdayLabel,
            "day_type" | "type_jour" => Column::DayType,
            other => return Err(PipelineError::UnknownColumn(other.to_string())),
        };
        Ok(column)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Day of the week, labelled in French for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Canonical presentation order, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Translate an English weekday name.
    pub fn from_english(name: &str) -> Result<Self> {
        match name {
            "Monday" => Ok(Weekday::Monday),
            "Tuesday" => Ok(Weekday::Tuesday),
            "Wednesday" => Ok(Weekday::Wednesday),
            "Thursday" => Ok(Weekday::Thursday),
            "Friday" => Ok(Weekday::Friday),
            "Saturday" => Ok(Weekday::Saturday),
            "Sunday" => Ok(Weekday::Sunday),
            other => Err(PipelineError::UnknownWeekday(other.to_string())),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == label)
    }

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Lundi",
            Weekday::Tuesday => "Mardi",
            Weekday::Wednesday => "Mercredi",
            Weekday::Thursday => "Jeudi",
            Weekday::Friday => "Vendredi",
            Weekday::Saturday => "Samedi",
            Weekday::Sunday => "Dimanche",
        }
    }

    /// Row position in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn day_type(self) -> DayType {
        match self {
            Weekday::Saturday | Weekday::Sunday => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn as_str(self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Weekend => "weekend",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned session with its derived time columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub start_time: String,
    pub platform: String,
    pub series: String,
    pub genre: String,
    pub duration: f64,
    pub hour_of_day: u8,
    pub weekday: Weekday,
    pub day_type: DayType,
}

impl SessionRecord {
    /// Textual value of `column`, used as a grouping key.
    pub fn value(&self, column: Column) -> String {
        match column {
            Column::Date => self.date.format("%Y-%m-%d").to_string(),
            Column::StartTime => self.start_time.clone(),
            Column::Platform => self.platform.clone(),
            Column::Series => self.series.clone(),
            Column::Genre => self.genre.clone(),
            Column::Duration => self.duration.to_string(),
            Column::HourOfDay => self.hour_of_day.to_string(),
            Column::WeekdayLabel => self.weekday.label().to_string(),
            Column::DayType => self.day_type.as_str().to_string(),
        }
    }

    pub fn to_raw(&self) -> RawRow {
        RawRow {
            date: Some(self.date.format("%Y-%m-%d").to_string()),
            start_time: Some(self.start_time.clone()),
            platform: Some(self.platform.clone()),
            series: Some(self.series.clone()),
            genre: Some(self.genre.clone()),
            duration: Some(self.duration.to_string()),
        }
    }
}

/// The normalized dataset. Only the normalizer constructs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTable {
    records: Vec<SessionRecord>,
}

impl SessionTable {
    pub(crate) fn new(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SessionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn platforms(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.platform.as_str()).collect()
    }

    /// Rebuild raw rows so the cleaned table can be cleaned again.
    pub fn to_raw(&self) -> RawTable {
        RawTable::from_rows(self.records.iter().map(SessionRecord::to_raw).collect())
    }
}

// ── Report rows ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CleanSessionRow {
    pub date: String,
    pub start_time: String,
    pub platform: String,
    pub series: String,
    pub genre: String,
    pub duration: f64,
    pub hour_of_day: u8,
    pub weekday_label: String,
    pub day_type: String,
}

impl From<&SessionRecord> for CleanSessionRow {
    fn from(r: &SessionRecord) -> Self {
        Self {
            date: r.date.format("%Y-%m-%d").to_string(),
            start_time: r.start_time.clone(),
            platform: r.platform.clone(),
            series: r.series.clone(),
            genre: r.genre.clone(),
            duration: r.duration,
            hour_of_day: r.hour_of_day,
            weekday_label: r.weekday.label().to_string(),
            day_type: r.day_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HourCountRow {
    pub hour_of_day: u8,
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WeekdayCountRow {
    pub weekday_label: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopSeriesRow {
    pub platform: String,
    pub series: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopGenreRow {
    pub platform: String,
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PlatformMeanRow {
    pub platform: String,
    #[serde(rename = "duration")]
    #[tabled(rename = "duration")]
    pub mean_duration: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LongSessionRow {
    pub platform: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DayTypeRow {
    pub platform: String,
    pub weekday: String,
    pub weekend: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GenreMeanRow {
    pub genre: String,
    #[serde(rename = "duration")]
    #[tabled(rename = "duration")]
    pub mean_duration: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GenreShareRow {
    pub genre: String,
    pub count: usize,
    pub share_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PlatformDurationRow {
    pub platform: String,
    pub total_duration: String,
    pub mean_duration: String,
}

/// One line of the combined results export.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnalysisResultRow {
    pub platform: String,
    pub series: Option<String>,
    pub genre: Option<String>,
    pub count: Option<usize>,
    pub duration: Option<f64>,
    pub analysis: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_sessions: usize,
    pub total_platforms: usize,
    pub total_series: usize,
    pub total_genres: usize,
    pub total_duration: f64,
    pub avg_duration: f64,
    pub busiest_hour: Option<u8>,
    pub busiest_weekday: Option<String>,
    pub rows_read: usize,
    pub rows_dropped_missing: usize,
    pub rows_dropped_unparsable: usize,
    pub duplicates_removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_total_mapping_from_chrono() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        use chrono::Datelike;
        assert_eq!(Weekday::from(date.weekday()), Weekday::Monday);
        assert_eq!(Weekday::from(chrono::Weekday::Sun).label(), "Dimanche");
    }

    #[test]
    fn test_weekday_from_english_rejects_unknown() {
        assert_eq!(Weekday::from_english("Friday").unwrap(), Weekday::Friday);
        let err = Weekday::from_english("Funday").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownWeekday(ref n) if n == "Funday"));
    }

    #[test]
    fn test_day_type_is_weekend_only_for_saturday_and_sunday() {
        let weekend: Vec<Weekday> = Weekday::ALL
            .into_iter()
            .filter(|d| d.day_type() == DayType::Weekend)
            .collect();
        assert_eq!(weekend, vec![Weekday::Saturday, Weekday::Sunday]);
    }

    #[test]
    fn test_canonical_index_matches_order() {
        for (i, day) in Weekday::ALL.iter().enumerate() {
            assert_eq!(day.index(), i);
            assert_eq!(Weekday::from_label(day.label()), Some(*day));
        }
    }

    #[test]
    fn test_column_parse_accepts_french_aliases() {
        assert_eq!("plateforme".parse::<Column>().unwrap(), Column::Platform);
        assert_eq!("série".parse::<Column>().unwrap(), Column::Series);
        assert_eq!("durée".parse::<Column>().unwrap(), Column::Duration);
        assert!(matches!(
            "studio".parse::<Column>(),
            Err(PipelineError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_raw_table_len_counts_malformed_rows() {
        let mut table = RawTable::from_rows(vec![]);
        assert!(table.is_empty());
        table.malformed_rows = 2;
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_require_columns_reports_first_missing() {
        let table = RawTable::new(
            vec!["date".into(), "heure_debut".into(), "serie".into()],
            vec![],
        );
        let err = table.require_columns().unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "platform"));
    }
}
