use crate::error::{PipelineError, Result};
use crate::normalizer::{normalize, Normalized};
use crate::types::{RawRow, RawTable};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Read every row of a viewing-session CSV.
///
/// The header must name all six session columns (English or French names);
/// otherwise this fails with `MissingColumn` before any row is read. Rows the
/// CSV reader itself cannot decode are skipped with a warning and counted in
/// `malformed_rows`.
pub fn read_raw<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut table = RawTable::new(headers, Vec::new());
    table.require_columns()?;

    for (idx, result) in rdr.deserialize::<RawRow>().enumerate() {
        match result {
            Ok(row) => table.rows.push(row),
            Err(e) => {
                warn!("Skipping malformed row {}: {}", idx + 1, e);
                table.malformed_rows += 1;
            }
        }
    }
    if table.is_empty() {
        warn!("Input contains a header but no data rows");
    }
    Ok(table)
}

pub fn load_raw(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|source| PipelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loading CSV: {}", path.display());
    read_raw(file)
}

/// Load and clean in one step.
pub fn load_and_clean(path: &Path) -> Result<Normalized> {
    let raw = load_raw(path)?;
    normalize(&raw)
}
