//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellPosition`] - A cell's location (e.g., "A1")
//! - [`MergeRange`] - A merged span of cells (e.g., "A1:B2")
//! - [`CellValue`] and [`CellResult`] - What a cell shows after evaluation

mod address;
mod value;

pub use address::{generate_cell_name, parse_cell_position, CellPosition, MergeRange};
pub use value::{format_number, CellResult, CellValue};
