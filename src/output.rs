//! Report sink: turns finished tables into CSV/JSON files and console previews.

use crate::aggregator::{Analysis, TopEntry, HOURS};
use crate::error::Result;
use crate::types::{
    AnalysisResultRow, CleanSessionRow, DayTypeRow, GenreMeanRow, GenreShareRow, HourCountRow,
    LongSessionRow, PlatformDurationRow, PlatformMeanRow, SessionTable, TopGenreRow,
    TopSeriesRow, Weekday, WeekdayCountRow,
};
use crate::util::format_decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub const CLEANED_FILE: &str = "sessions_nettoyees.csv";
pub const HOURLY_FILE: &str = "repartition_heures.csv";
pub const WEEKDAY_FILE: &str = "repartition_jours.csv";
pub const HEATMAP_FILE: &str = "heatmap_jour_heure.csv";
pub const TOP_SERIES_FILE: &str = "top_series.csv";
pub const TOP_GENRES_FILE: &str = "top_genres.csv";
pub const EVENING_FILE: &str = "duree_soir.csv";
pub const LONG_SESSIONS_FILE: &str = "sessions_longues.csv";
pub const DAY_TYPE_FILE: &str = "comparaison_semaine_weekend.csv";
pub const GENRE_MEANS_FILE: &str = "duree_moyenne_genre.csv";
pub const GENRE_SHARES_FILE: &str = "repartition_genres.csv";
pub const PLATFORM_FILE: &str = "duree_plateforme.csv";
pub const RESULTS_FILE: &str = "resultats_analyse.csv";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

// ── Row builders ──────────────────────────────────────────────────────────────

pub fn cleaned_rows(table: &SessionTable) -> Vec<CleanSessionRow> {
    table.iter().map(CleanSessionRow::from).collect()
}

pub fn hourly_rows(analysis: &Analysis) -> Vec<HourCountRow> {
    analysis
        .hourly
        .dense()
        .iter()
        .enumerate()
        .map(|(hour, count)| HourCountRow {
            hour_of_day: hour as u8,
            count: *count,
        })
        .collect()
}

pub fn weekday_rows(analysis: &Analysis) -> Vec<WeekdayCountRow> {
    analysis
        .weekdays
        .ordered(&Weekday::ALL)
        .into_iter()
        .map(|(day, count)| WeekdayCountRow {
            weekday_label: day.label().to_string(),
            count,
        })
        .collect()
}

pub fn top_series_rows(entries: &[TopEntry]) -> Vec<TopSeriesRow> {
    entries
        .iter()
        .map(|e| TopSeriesRow {
            platform: e.group.clone(),
            series: e.target.clone(),
            count: e.count,
        })
        .collect()
}

pub fn top_genre_rows(entries: &[TopEntry]) -> Vec<TopGenreRow> {
    entries
        .iter()
        .map(|e| TopGenreRow {
            platform: e.group.clone(),
            genre: e.target.clone(),
            count: e.count,
        })
        .collect()
}

pub fn evening_rows(analysis: &Analysis) -> Vec<PlatformMeanRow> {
    analysis
        .comparative
        .evening_mean_duration
        .iter()
        .map(|(platform, mean)| PlatformMeanRow {
            platform: platform.clone(),
            mean_duration: format_decimal(*mean),
        })
        .collect()
}

pub fn long_session_rows(analysis: &Analysis) -> Vec<LongSessionRow> {
    analysis
        .comparative
        .long_session_counts
        .iter()
        .map(|(platform, count)| LongSessionRow {
            platform: platform.clone(),
            count: *count,
        })
        .collect()
}

pub fn day_type_rows(analysis: &Analysis) -> Vec<DayTypeRow> {
    let cell = |v: Option<f64>| v.map(format_decimal).unwrap_or_default();
    analysis
        .comparative
        .day_type_mean_duration
        .iter()
        .map(|(platform, means)| DayTypeRow {
            platform: platform.clone(),
            weekday: cell(means.weekday),
            weekend: cell(means.weekend),
        })
        .collect()
}

pub fn genre_mean_rows(analysis: &Analysis) -> Vec<GenreMeanRow> {
    analysis
        .genre_means
        .iter()
        .map(|(genre, mean)| GenreMeanRow {
            genre: genre.clone(),
            mean_duration: format_decimal(*mean),
        })
        .collect()
}

pub fn genre_share_rows(analysis: &Analysis) -> Vec<GenreShareRow> {
    analysis
        .genre_shares
        .iter()
        .map(|s| GenreShareRow {
            genre: s.genre.clone(),
            count: s.count,
            share_pct: format!("{:.1}", s.share),
        })
        .collect()
}

pub fn platform_rows(analysis: &Analysis) -> Vec<PlatformDurationRow> {
    analysis
        .platform_durations
        .iter()
        .map(|(platform, d)| PlatformDurationRow {
            platform: platform.clone(),
            total_duration: format_decimal(d.total),
            mean_duration: format_decimal(d.mean),
        })
        .collect()
}

/// Stack the per-platform results into one export, tagged by analysis.
pub fn combined_results(analysis: &Analysis) -> Vec<AnalysisResultRow> {
    let base = |platform: &str, tag: &str| AnalysisResultRow {
        platform: platform.to_string(),
        series: None,
        genre: None,
        count: None,
        duration: None,
        analysis: tag.to_string(),
    };

    let mut rows = Vec::new();
    for e in &analysis.top_series {
        rows.push(AnalysisResultRow {
            series: Some(e.target.clone()),
            count: Some(e.count),
            ..base(&e.group, "Série la plus regardée")
        });
    }
    for e in &analysis.top_genres {
        rows.push(AnalysisResultRow {
            genre: Some(e.target.clone()),
            count: Some(e.count),
            ..base(&e.group, "Genre dominant")
        });
    }
    for (platform, mean) in &analysis.comparative.evening_mean_duration {
        rows.push(AnalysisResultRow {
            duration: Some(*mean),
            ..base(platform, "Durée moyenne soir")
        });
    }
    for (platform, count) in &analysis.comparative.long_session_counts {
        rows.push(AnalysisResultRow {
            count: Some(*count),
            ..base(platform, "Sessions longues")
        });
    }
    rows
}

fn write_heatmap(path: &Path, analysis: &Analysis) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["weekday_label".to_string()];
    header.extend((0..HOURS).map(|h| h.to_string()));
    wtr.write_record(&header)?;
    for (day, row) in analysis.day_hour.rows() {
        let mut record = vec![day.label().to_string()];
        record.extend(row.iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every report into `dir`, creating it if needed.
///
/// Returns the paths written, in order.
pub fn write_all(dir: &Path, table: &SessionTable, analysis: &Analysis) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut target = |name: &str| {
        let path = dir.join(name);
        written.push(path.clone());
        path
    };

    write_csv(&target(CLEANED_FILE), &cleaned_rows(table))?;
    write_csv(&target(HOURLY_FILE), &hourly_rows(analysis))?;
    write_csv(&target(WEEKDAY_FILE), &weekday_rows(analysis))?;
    write_heatmap(&target(HEATMAP_FILE), analysis)?;
    write_csv(&target(TOP_SERIES_FILE), &top_series_rows(&analysis.top_series))?;
    write_csv(&target(TOP_GENRES_FILE), &top_genre_rows(&analysis.top_genres))?;
    write_csv(&target(EVENING_FILE), &evening_rows(analysis))?;
    write_csv(&target(LONG_SESSIONS_FILE), &long_session_rows(analysis))?;
    write_csv(&target(DAY_TYPE_FILE), &day_type_rows(analysis))?;
    write_csv(&target(GENRE_MEANS_FILE), &genre_mean_rows(analysis))?;
    write_csv(&target(GENRE_SHARES_FILE), &genre_share_rows(analysis))?;
    write_csv(&target(PLATFORM_FILE), &platform_rows(analysis))?;
    write_csv(&target(RESULTS_FILE), &combined_results(analysis))?;
    write_json(&target(SUMMARY_FILE), &analysis.summary)?;

    info!("Wrote {} report files to {}", written.len(), dir.display());
    Ok(written)
}

/// Print a markdown preview of each report.
pub fn print_previews(analysis: &Analysis, max_rows: usize) {
    println!("Report 1: Sessions per hour of day\n");
    let active: Vec<HourCountRow> = hourly_rows(analysis)
        .into_iter()
        .filter(|r| r.count > 0)
        .collect();
    preview_table_rows(&active, max_rows);

    println!("Report 2: Sessions per weekday\n");
    preview_table_rows(&weekday_rows(analysis), 7);

    println!("Report 3: Most watched series per platform\n");
    preview_table_rows(&top_series_rows(&analysis.top_series), max_rows);

    println!("Report 4: Dominant genre per platform\n");
    preview_table_rows(&top_genre_rows(&analysis.top_genres), max_rows);

    println!("Report 5: Mean evening duration (minutes)\n");
    preview_table_rows(&evening_rows(analysis), max_rows);

    println!("Report 6: Long sessions per platform\n");
    preview_table_rows(&long_session_rows(analysis), max_rows);

    println!("Report 7: Mean duration, weekday vs weekend\n");
    preview_table_rows(&day_type_rows(analysis), max_rows);

    println!("Report 8: Genre breakdown\n");
    preview_table_rows(&genre_share_rows(analysis), max_rows);
    preview_table_rows(&genre_mean_rows(analysis), max_rows);

    println!("Report 9: Duration per platform\n");
    preview_table_rows(&platform_rows(analysis), max_rows);
}
