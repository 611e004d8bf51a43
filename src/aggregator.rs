//! Grouped views over the cleaned session table.
//!
//! Every function here is read-only over a [`SessionTable`] and builds a new
//! result. An empty table yields empty mappings, except the day×hour matrix
//! which always has its fixed 7×24 shape.

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::normalizer::CleaningReport;
use crate::types::{Column, DayType, SessionTable, SummaryStats, Weekday};
use crate::util::average;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

pub const HOURS: usize = 24;

// ── Hourly / weekday distributions ────────────────────────────────────────────

/// Session counts per hour of day. Hours without sessions are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyDistribution {
    pub counts: BTreeMap<u8, usize>,
}

impl HourlyDistribution {
    pub fn get(&self, hour: u8) -> usize {
        self.counts.get(&hour).copied().unwrap_or(0)
    }

    /// Counts for hours 0–23 with the gaps filled with zero.
    pub fn dense(&self) -> [usize; HOURS] {
        let mut out = [0; HOURS];
        for (hour, slot) in out.iter_mut().enumerate() {
            *slot = self.get(hour as u8);
        }
        out
    }
}

pub fn hourly_distribution(table: &SessionTable) -> HourlyDistribution {
    let mut counts = BTreeMap::new();
    for r in table.iter() {
        *counts.entry(r.hour_of_day).or_insert(0) += 1;
    }
    debug!("Hourly distribution covers {} distinct hours", counts.len());
    HourlyDistribution { counts }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekdayDistribution {
    pub counts: HashMap<Weekday, usize>,
}

impl WeekdayDistribution {
    pub fn get(&self, day: Weekday) -> usize {
        self.counts.get(&day).copied().unwrap_or(0)
    }

    /// Counts laid out in the caller's order, zero for days without sessions.
    pub fn ordered(&self, order: &[Weekday]) -> Vec<(Weekday, usize)> {
        order.iter().map(|d| (*d, self.get(*d))).collect()
    }
}

pub fn weekday_distribution(table: &SessionTable) -> WeekdayDistribution {
    let mut counts = HashMap::new();
    for r in table.iter() {
        *counts.entry(r.weekday).or_insert(0) += 1;
    }
    WeekdayDistribution { counts }
}

// ── Day × hour matrix ─────────────────────────────────────────────────────────

/// Dense occurrence counts, one row per weekday in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayHourMatrix {
    cells: [[usize; HOURS]; 7],
}

impl DayHourMatrix {
    pub fn get(&self, day: Weekday, hour: u8) -> usize {
        self.cells[day.index()][hour as usize]
    }

    pub fn row(&self, day: Weekday) -> &[usize; HOURS] {
        &self.cells[day.index()]
    }

    /// Rows in canonical order, Monday first.
    pub fn rows(&self) -> impl Iterator<Item = (Weekday, &[usize; HOURS])> + '_ {
        Weekday::ALL.into_iter().map(move |d| (d, self.row(d)))
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }
}

pub fn day_hour_matrix(table: &SessionTable) -> DayHourMatrix {
    let mut sparse: HashMap<(Weekday, u8), usize> = HashMap::new();
    for r in table.iter() {
        *sparse.entry((r.weekday, r.hour_of_day)).or_insert(0) += 1;
    }

    let mut cells = [[0; HOURS]; 7];
    for day in Weekday::ALL {
        for hour in 0..HOURS {
            cells[day.index()][hour] = sparse.get(&(day, hour as u8)).copied().unwrap_or(0);
        }
    }
    DayHourMatrix { cells }
}

// ── Per-group argmax ──────────────────────────────────────────────────────────

/// The most frequent target value within one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopEntry {
    pub group: String,
    pub target: String,
    pub count: usize,
}

/// For each distinct `group_key` value, the `target_key` value with the most
/// sessions. Ties go to the value that appears first in the table.
///
/// Column names are resolved at call time; an unknown name is an error.
pub fn top_per_group(
    table: &SessionTable,
    group_key: &str,
    target_key: &str,
) -> Result<Vec<TopEntry>> {
    let group_col: Column = group_key.parse()?;
    let target_col: Column = target_key.parse()?;

    #[derive(Default)]
    struct Acc {
        first_seen: Vec<String>,
        counts: HashMap<String, usize>,
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for r in table.iter() {
        let acc = groups.entry(r.value(group_col)).or_default();
        let target = r.value(target_col);
        let count = acc.counts.entry(target.clone()).or_insert(0);
        if *count == 0 {
            acc.first_seen.push(target);
        }
        *count += 1;
    }

    let entries = groups
        .into_iter()
        .filter_map(|(group, acc)| {
            let mut best: Option<(&String, usize)> = None;
            for target in &acc.first_seen {
                let count = acc.counts[target];
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((target, count));
                }
            }
            best.map(|(target, count)| TopEntry {
                group: group.clone(),
                target: target.clone(),
                count,
            })
        })
        .collect();
    Ok(entries)
}

pub fn top_series_per_platform(table: &SessionTable) -> Result<Vec<TopEntry>> {
    top_per_group(table, Column::Platform.name(), Column::Series.name())
}

pub fn top_genre_per_platform(table: &SessionTable) -> Result<Vec<TopEntry>> {
    top_per_group(table, Column::Platform.name(), Column::Genre.name())
}

// ── Comparative summaries ─────────────────────────────────────────────────────

/// Mean durations for one platform, `None` when it has no sessions of that kind.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTypeMeans {
    pub weekday: Option<f64>,
    pub weekend: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparativeSummaries {
    pub evening_mean_duration: BTreeMap<String, f64>,
    /// Every platform of the table, zero when it has no long sessions.
    pub long_session_counts: BTreeMap<String, usize>,
    pub day_type_mean_duration: BTreeMap<String, DayTypeMeans>,
}

fn mean_by<K: Ord>(pairs: impl IntoIterator<Item = (K, f64)>) -> BTreeMap<K, f64> {
    let mut acc: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (key, value) in pairs {
        acc.entry(key).or_default().push(value);
    }
    acc.into_iter().map(|(k, v)| (k, average(&v))).collect()
}

pub fn comparative_summaries(
    table: &SessionTable,
    config: &AnalysisConfig,
) -> ComparativeSummaries {
    let evening_mean_duration = mean_by(
        table
            .iter()
            .filter(|r| config.is_evening(r.hour_of_day))
            .map(|r| (r.platform.clone(), r.duration)),
    );

    let mut long_session_counts: BTreeMap<String, usize> = table
        .platforms()
        .into_iter()
        .map(|p| (p.to_string(), 0))
        .collect();
    for r in table.iter().filter(|r| r.duration > config.long_session_minutes) {
        *long_session_counts.entry(r.platform.clone()).or_insert(0) += 1;
    }

    let by_day_type = mean_by(
        table
            .iter()
            .map(|r| ((r.platform.clone(), r.day_type), r.duration)),
    );
    let mut day_type_mean_duration: BTreeMap<String, DayTypeMeans> = BTreeMap::new();
    for ((platform, day_type), mean) in by_day_type {
        let entry = day_type_mean_duration.entry(platform).or_default();
        match day_type {
            DayType::Weekday => entry.weekday = Some(mean),
            DayType::Weekend => entry.weekend = Some(mean),
        }
    }

    debug!(
        "Comparative summaries: {} evening platforms, {} platforms total",
        evening_mean_duration.len(),
        long_session_counts.len()
    );
    ComparativeSummaries {
        evening_mean_duration,
        long_session_counts,
        day_type_mean_duration,
    }
}

// ── Genre and platform breakdowns ─────────────────────────────────────────────

pub fn genre_mean_duration(table: &SessionTable) -> BTreeMap<String, f64> {
    mean_by(table.iter().map(|r| (r.genre.clone(), r.duration)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreShare {
    pub genre: String,
    pub count: usize,
    /// Percentage of all sessions, 0–100.
    pub share: f64,
}

/// Sessions per genre, most frequent first; equal counts keep table order.
pub fn genre_shares(table: &SessionTable) -> Vec<GenreShare> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in table.iter() {
        let count = counts.entry(r.genre.as_str()).or_insert(0);
        if *count == 0 {
            order.push(r.genre.clone());
        }
        *count += 1;
    }

    let total = table.len() as f64;
    let mut shares: Vec<GenreShare> = order
        .into_iter()
        .map(|genre| {
            let count = counts[genre.as_str()];
            GenreShare {
                share: count as f64 / total * 100.0,
                genre,
                count,
            }
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformDuration {
    pub sessions: usize,
    pub total: f64,
    pub mean: f64,
}

pub fn platform_durations(table: &SessionTable) -> BTreeMap<String, PlatformDuration> {
    let mut acc: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in table.iter() {
        acc.entry(r.platform.clone()).or_default().push(r.duration);
    }
    acc.into_iter()
        .map(|(platform, durations)| {
            let stats = PlatformDuration {
                sessions: durations.len(),
                total: durations.iter().sum(),
                mean: average(&durations),
            };
            (platform, stats)
        })
        .collect()
}

pub fn summarize(table: &SessionTable, report: &CleaningReport) -> SummaryStats {
    let distinct = |f: fn(&crate::types::SessionRecord) -> &str| {
        table.iter().map(f).collect::<BTreeSet<&str>>().len()
    };
    let durations: Vec<f64> = table.iter().map(|r| r.duration).collect();

    let hourly = hourly_distribution(table);
    let mut busiest_hour: Option<(u8, usize)> = None;
    for (hour, count) in &hourly.counts {
        if busiest_hour.map_or(true, |(_, c)| *count > c) {
            busiest_hour = Some((*hour, *count));
        }
    }

    let weekdays = weekday_distribution(table);
    let mut busiest_weekday: Option<(Weekday, usize)> = None;
    for (day, count) in weekdays.ordered(&Weekday::ALL) {
        if count > 0 && busiest_weekday.map_or(true, |(_, c)| count > c) {
            busiest_weekday = Some((day, count));
        }
    }

    SummaryStats {
        total_sessions: table.len(),
        total_platforms: distinct(|r| r.platform.as_str()),
        total_series: distinct(|r| r.series.as_str()),
        total_genres: distinct(|r| r.genre.as_str()),
        total_duration: durations.iter().sum(),
        avg_duration: average(&durations),
        busiest_hour: busiest_hour.map(|(h, _)| h),
        busiest_weekday: busiest_weekday.map(|(d, _)| d.label().to_string()),
        rows_read: report.total_rows,
        rows_dropped_missing: report.missing_values,
        rows_dropped_unparsable: report.unparsable(),
        duplicates_removed: report.duplicates_removed,
    }
}

// ── Full analysis ─────────────────────────────────────────────────────────────

/// Every view the report sink renders.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub hourly: HourlyDistribution,
    pub weekdays: WeekdayDistribution,
    pub day_hour: DayHourMatrix,
    pub top_series: Vec<TopEntry>,
    pub top_genres: Vec<TopEntry>,
    pub comparative: ComparativeSummaries,
    pub genre_means: BTreeMap<String, f64>,
    pub genre_shares: Vec<GenreShare>,
    pub platform_durations: BTreeMap<String, PlatformDuration>,
    pub summary: SummaryStats,
}

pub fn analyze(
    table: &SessionTable,
    report: &CleaningReport,
    config: &AnalysisConfig,
) -> Result<Analysis> {
    config.validate()?;
    Ok(Analysis {
        hourly: hourly_distribution(table),
        weekdays: weekday_distribution(table),
        day_hour: day_hour_matrix(table),
        top_series: top_series_per_platform(table)?,
        top_genres: top_genre_per_platform(table)?,
        comparative: comparative_summaries(table, config),
        genre_means: genre_mean_duration(table),
        genre_shares: genre_shares(table),
        platform_durations: platform_durations(table),
        summary: summarize(table, report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::normalizer::normalize;
    use crate::types::{RawRow, RawTable};

    fn session(date: &str, time: &str, platform: &str, series: &str, genre: &str, dur: f64) -> RawRow {
        RawRow {
            date: Some(date.to_string()),
            start_time: Some(time.to_string()),
            platform: Some(platform.to_string()),
            series: Some(series.to_string()),
            genre: Some(genre.to_string()),
            duration: Some(dur.to_string()),
        }
    }

    fn table(rows: Vec<RawRow>) -> SessionTable {
        normalize(&RawTable::from_rows(rows)).unwrap().table
    }

    // 2024-03-04 is a Monday, 2024-03-09 a Saturday.
    fn sample() -> SessionTable {
        table(vec![
            session("2024-03-04", "19:30", "Netflix", "Dark", "Drama", 50.0),
            session("2024-03-04", "21:00", "Netflix", "Lupin", "Thriller", 70.0),
            session("2024-03-05", "19:10", "Netflix", "Lupin", "Thriller", 40.0),
            session("2024-03-09", "10:00", "Netflix", "Dark", "Drama", 90.0),
            session("2024-03-09", "19:45", "Prime", "Fleabag", "Comedy", 25.0),
            session("2024-03-10", "08:00", "Prime", "Fleabag", "Comedy", 30.0),
            session("2024-03-06", "13:00", "Prime", "Boys", "Action", 55.0),
        ])
    }

    #[test]
    fn test_hourly_distribution_counts_and_dense() {
        let hourly = hourly_distribution(&sample());
        assert_eq!(hourly.get(19), 3);
        assert_eq!(hourly.get(3), 0);
        assert!(!hourly.counts.contains_key(&3));
        let dense = hourly.dense();
        assert_eq!(dense.len(), 24);
        assert_eq!(dense[19], 3);
        assert_eq!(dense.iter().sum::<usize>(), 7);
    }

    #[test]
    fn test_weekday_distribution_ordered_fills_zero() {
        let dist = weekday_distribution(&sample());
        let ordered = dist.ordered(&Weekday::ALL);
        let counts: Vec<usize> = ordered.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![2, 1, 1, 0, 0, 2, 1]);
        let reversed = dist.ordered(&[Weekday::Sunday, Weekday::Monday]);
        assert_eq!(reversed, vec![(Weekday::Sunday, 1), (Weekday::Monday, 2)]);
    }

    #[test]
    fn test_day_hour_matrix_dense_and_sums_to_rows() {
        let t = sample();
        let matrix = day_hour_matrix(&t);
        assert_eq!(matrix.rows().count(), 7);
        assert!(matrix.rows().all(|(_, row)| row.len() == 24));
        assert_eq!(matrix.get(Weekday::Monday, 19), 1);
        assert_eq!(matrix.get(Weekday::Saturday, 10), 1);
        assert_eq!(matrix.get(Weekday::Thursday, 12), 0);
        assert_eq!(matrix.total(), t.len());
        let days: Vec<Weekday> = matrix.rows().map(|(d, _)| d).collect();
        assert_eq!(days, Weekday::ALL.to_vec());
    }

    #[test]
    fn test_day_hour_matrix_empty_is_all_zero() {
        let matrix = day_hour_matrix(&SessionTable::default());
        assert_eq!(matrix.rows().count(), 7);
        assert_eq!(matrix.total(), 0);
    }

    #[test]
    fn test_top_per_group_picks_most_frequent() {
        let top = top_series_per_platform(&sample()).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].group, "Netflix");
        assert_eq!(top[0].target, "Dark");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[1].group, "Prime");
        assert_eq!(top[1].target, "Fleabag");
        assert_eq!(top[1].count, 2);
    }

    #[test]
    fn test_top_per_group_tie_goes_to_first_seen() {
        // Zebra appears first; alphabetical order would pick Alpha.
        let t = table(vec![
            session("2024-03-04", "20:00", "A", "Zebra", "Drama", 10.0),
            session("2024-03-05", "20:00", "A", "Alpha", "Drama", 10.0),
            session("2024-03-06", "20:00", "A", "Alpha", "Drama", 11.0),
            session("2024-03-07", "20:00", "A", "Zebra", "Drama", 11.0),
        ]);
        for _ in 0..5 {
            let top = top_per_group(&t, "platform", "series").unwrap();
            assert_eq!(top[0].target, "Zebra");
            assert_eq!(top[0].count, 2);
        }
    }

    #[test]
    fn test_top_per_group_unknown_column() {
        let err = top_per_group(&sample(), "studio", "series").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(ref c) if c == "studio"));
        let err = top_per_group(&SessionTable::default(), "platform", "rating").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(_)));
    }

    #[test]
    fn test_top_per_group_on_derived_columns() {
        let top = top_per_group(&sample(), "day_type", "genre").unwrap();
        let groups: Vec<&str> = top.iter().map(|e| e.group.as_str()).collect();
        assert_eq!(groups, vec!["weekday", "weekend"]);
        assert_eq!(top[0].target, "Thriller");
    }

    #[test]
    fn test_comparative_summaries() {
        let summaries = comparative_summaries(&sample(), &AnalysisConfig::default());

        assert_eq!(summaries.evening_mean_duration["Netflix"], (50.0 + 70.0 + 40.0) / 3.0);
        assert_eq!(summaries.evening_mean_duration["Prime"], 25.0);

        assert_eq!(summaries.long_session_counts["Netflix"], 2);
        assert_eq!(summaries.long_session_counts["Prime"], 0);

        let netflix = summaries.day_type_mean_duration["Netflix"];
        assert_eq!(netflix.weekday, Some((50.0 + 70.0 + 40.0) / 3.0));
        assert_eq!(netflix.weekend, Some(90.0));
        let prime = summaries.day_type_mean_duration["Prime"];
        assert_eq!(prime.weekday, Some(55.0));
        assert_eq!(prime.weekend, Some(27.5));
    }

    #[test]
    fn test_comparative_summaries_day_type_missing_side_is_none() {
        let t = table(vec![session("2024-03-04", "20:00", "A", "X", "Drama", 30.0)]);
        let summaries = comparative_summaries(&t, &AnalysisConfig::default());
        let a = summaries.day_type_mean_duration["A"];
        assert_eq!(a.weekday, Some(30.0));
        assert_eq!(a.weekend, None);
    }

    #[test]
    fn test_long_session_threshold_is_strict() {
        let t = table(vec![
            session("2024-03-04", "20:00", "A", "X", "Drama", 60.0),
            session("2024-03-05", "20:00", "A", "X", "Drama", 61.0),
        ]);
        let summaries = comparative_summaries(&t, &AnalysisConfig::default());
        assert_eq!(summaries.long_session_counts["A"], 1);
    }

    #[test]
    fn test_genre_views() {
        let t = sample();
        let means = genre_mean_duration(&t);
        assert_eq!(means["Drama"], 70.0);
        assert_eq!(means["Action"], 55.0);

        let shares = genre_shares(&t);
        let order: Vec<&str> = shares.iter().map(|s| s.genre.as_str()).collect();
        assert_eq!(order, vec!["Drama", "Thriller", "Comedy", "Action"]);
        let total: f64 = shares.iter().map(|s| s.share).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_platform_durations() {
        let durations = platform_durations(&sample());
        assert_eq!(durations["Netflix"].sessions, 4);
        assert_eq!(durations["Netflix"].total, 250.0);
        assert_eq!(durations["Netflix"].mean, 62.5);
        assert_eq!(durations["Prime"].total, 110.0);
    }

    #[test]
    fn test_summarize() {
        let out = normalize(&RawTable::from_rows(vec![
            session("2024-03-04", "19:30", "Netflix", "Dark", "Drama", 50.0),
            session("2024-03-04", "19:30", "Netflix", "Dark", "Drama", 50.0),
            session("2024-03-09", "10:00", "Prime", "Boys", "Action", 30.0),
        ]))
        .unwrap();
        let summary = summarize(&out.table, &out.report);
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.total_platforms, 2);
        assert_eq!(summary.total_duration, 80.0);
        assert_eq!(summary.avg_duration, 40.0);
        // Tie between 10h and 19h goes to the earlier hour.
        assert_eq!(summary.busiest_hour, Some(10));
        assert_eq!(summary.busiest_weekday.as_deref(), Some("Lundi"));
        assert_eq!(summary.duplicates_removed, 1);
    }

    #[test]
    fn test_empty_table_yields_empty_results() {
        let empty = SessionTable::default();
        let analysis = analyze(&empty, &CleaningReport::default(), &AnalysisConfig::default()).unwrap();
        assert!(analysis.hourly.counts.is_empty());
        assert_eq!(analysis.hourly.dense(), [0; 24]);
        assert!(analysis.weekdays.counts.is_empty());
        assert_eq!(analysis.day_hour.total(), 0);
        assert!(analysis.top_series.is_empty());
        assert!(analysis.top_genres.is_empty());
        assert!(analysis.comparative.evening_mean_duration.is_empty());
        assert!(analysis.comparative.long_session_counts.is_empty());
        assert!(analysis.comparative.day_type_mean_duration.is_empty());
        assert!(analysis.genre_shares.is_empty());
        assert_eq!(analysis.summary.busiest_hour, None);
        assert_eq!(analysis.summary.busiest_weekday, None);
    }
}
