//! # report-sheets-core
//!
//! Core data structures for the report-sheets report generator.
//!
//! This crate provides the fundamental types used throughout report-sheets:
//! - [`CellPosition`] and [`MergeRange`] - Cell addressing and merged spans
//! - [`CellValue`] and [`CellResult`] - What an evaluated cell holds
//! - [`Grid`] - A template or report grid with per-cell configuration
//! - [`expand_rows`] - Row expansion of multi-valued cells
//!
//! ## Example
//!
//! ```rust
//! use report_sheets_core::{expand_rows, CellPosition, CellResult, CellValue, Grid, GridCell};
//!
//! let mut grid = Grid::new(3, 1);
//! let values = vec![CellValue::Number(10.0), CellValue::Number(20.0)];
//! grid.insert(GridCell::new(CellPosition::parse("A1").unwrap(), CellResult::List(values))).unwrap();
//! grid.insert(GridCell::new(CellPosition::parse("A2").unwrap(), CellResult::text("Total"))).unwrap();
//!
//! let report = expand_rows(&grid).unwrap().grid;
//! assert_eq!(report.rows(), 4);
//! assert!(report.cell_by_name("A3").is_some());
//! ```

pub mod cell;
pub mod error;
pub mod expand;
pub mod grid;

// Re-exports for convenience
pub use cell::{
    format_number, generate_cell_name, parse_cell_position, CellPosition, CellResult, CellValue,
    MergeRange,
};
pub use error::{Error, Result};
pub use expand::{expand_rows, Expansion, RowShifts};
pub use grid::{CellConfig, Grid, GridCell};
