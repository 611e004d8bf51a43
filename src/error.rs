use std::path::PathBuf;
use thiserror::Error;

/// A `start_time` value that neither the strict timestamp parse nor the
/// leading-hour fallback could interpret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unparsable start time {value:?}: {reason}")]
pub struct TimeParseError {
    pub value: String,
    pub reason: String,
}

impl TimeParseError {
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// All errors produced while loading, cleaning and aggregating sessions.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input file could not be opened.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from the input table.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// An aggregation referenced a column the session table does not have.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A weekday name outside the seven English day names.
    #[error("Unknown weekday name: {0}")]
    UnknownWeekday(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
