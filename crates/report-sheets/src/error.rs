//! Error types for report generation

use std::path::PathBuf;
use thiserror::Error;

/// Result type for report-sheets operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a request or a report as a whole
///
/// Per-cell failures never show up here; they are carried inside the cell
/// as a [`CellResult::Error`](report_sheets_core::CellResult::Error).
#[derive(Debug, Error)]
pub enum Error {
    /// Template grid is inconsistent (duplicate cells, out of bounds, overlapping merges)
    #[error("Invalid template: {0}")]
    Template(#[from] report_sheets_core::Error),

    /// Request-level formula error, such as an unusable time window
    #[error(transparent)]
    Formula(#[from] report_sheets_formula::FormulaError),

    /// Malformed JSON document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fixture or template file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
