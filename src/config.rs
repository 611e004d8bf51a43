use crate::error::{PipelineError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Command-line options.
#[derive(Parser, Debug, Clone)]
#[command(name = "viewing_report", version, about = "Viewing session cleaning and reports")]
pub struct Cli {
    /// CSV export of viewing sessions.
    #[arg(long, default_value = "visionnage_series.csv")]
    pub input: PathBuf,

    /// Directory that receives the CSV and JSON reports.
    #[arg(long, default_value = "resultats")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Rows shown per report in the console preview.
    #[arg(long, default_value = "5")]
    pub preview_rows: usize,

    /// First hour of the evening window (inclusive).
    #[arg(long, default_value = "18", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub evening_start: u8,

    /// Last hour of the evening window (inclusive).
    #[arg(long, default_value = "23", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub evening_end: u8,

    /// Sessions strictly longer than this many minutes count as long.
    #[arg(long, default_value = "60")]
    pub long_session_minutes: f64,

    /// Load, generate every report once and exit instead of showing the menu.
    #[arg(long)]
    pub batch: bool,
}

impl Cli {
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let config = AnalysisConfig {
            evening_start: self.evening_start,
            evening_end: self.evening_end,
            long_session_minutes: self.long_session_minutes,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Thresholds used by the comparative summaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub evening_start: u8,
    pub evening_end: u8,
    pub long_session_minutes: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            evening_start: 18,
            evening_end: 23,
            long_session_minutes: 60.0,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.evening_end > 23 || self.evening_start > self.evening_end {
            return Err(PipelineError::Config(format!(
                "evening window {}-{} must lie within 0-23 with start <= end",
                self.evening_start, self.evening_end
            )));
        }
        if !self.long_session_minutes.is_finite() || self.long_session_minutes < 0.0 {
            return Err(PipelineError::Config(format!(
                "long session threshold must be a non-negative number of minutes, got {}",
                self.long_session_minutes
            )));
        }
        Ok(())
    }

    pub fn is_evening(&self, hour: u8) -> bool {
        (self.evening_start..=self.evening_end).contains(&hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["viewing_report"]);
        assert_eq!(cli.input, PathBuf::from("visionnage_series.csv"));
        assert_eq!(cli.output_dir, PathBuf::from("resultats"));
        assert_eq!(cli.log_level, "INFO");
        assert!(!cli.batch);
        assert_eq!(cli.analysis_config().unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "viewing_report",
            "--input",
            "data.csv",
            "--evening-start",
            "20",
            "--long-session-minutes",
            "90",
            "--batch",
        ]);
        assert_eq!(cli.input, PathBuf::from("data.csv"));
        assert!(cli.batch);
        let config = cli.analysis_config().unwrap();
        assert_eq!(config.evening_start, 20);
        assert_eq!(config.long_session_minutes, 90.0);
    }

    #[test]
    fn test_cli_rejects_hour_out_of_range() {
        assert!(Cli::try_parse_from(["viewing_report", "--evening-end", "24"]).is_err());
    }

    #[test]
    fn test_inverted_evening_window_is_config_error() {
        let config = AnalysisConfig {
            evening_start: 22,
            evening_end: 18,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_evening_window_is_inclusive() {
        let config = AnalysisConfig::default();
        assert!(!config.is_evening(17));
        assert!(config.is_evening(18));
        assert!(config.is_evening(23));
    }
}
