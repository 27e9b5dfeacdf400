//! Error types for report-sheets-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in report-sheets-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell name format
    #[error("Invalid cell name: {0}")]
    InvalidAddress(String),

    /// Invalid merge range
    #[error("Invalid merge range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (rows: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (columns: {1})")]
    ColumnOutOfBounds(u32, u32),

    /// Two template cells decode to the same position
    #[error("Duplicate cell {0} in template")]
    DuplicateCell(String),

    /// Merge ranges must be disjoint
    #[error("Merge range {0} overlaps merge range {1}")]
    OverlappingMerge(String, String),
}
