//! Cleaning and grouped reports for viewing-session logs.
//!
//! The pipeline is strictly one-way: [`loader`] reads the CSV into a raw
//! table, [`normalizer`] derives time columns and drops incomplete or
//! duplicate rows, [`aggregator`] builds the grouped views and [`output`]
//! writes them out.
pub mod aggregator;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod normalizer;
pub mod output;
pub mod types;
pub mod util;

pub use error::{PipelineError, Result};
