//! Template grid type

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cell::{CellPosition, CellResult, MergeRange};
use crate::error::{Error, Result};

/// Per-cell configuration carried through evaluation and expansion
///
/// Only the merge range is interpreted; formatting keys (colors, fonts,
/// alignment, ...) are kept verbatim and copied onto every cell a value
/// expands into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellConfig {
    /// Merge range anchored at this cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merger: Option<MergeRange>,
    /// Opaque formatting keys
    #[serde(flatten)]
    pub format: serde_json::Map<String, serde_json::Value>,
}

impl CellConfig {
    /// Config with only a merge range
    pub fn merged(range: MergeRange) -> Self {
        Self {
            merger: Some(range),
            format: serde_json::Map::new(),
        }
    }

    /// Same formatting, different (or no) merge range
    pub fn with_merger(&self, merger: Option<MergeRange>) -> Self {
        Self {
            merger,
            format: self.format.clone(),
        }
    }
}

/// One cell of a grid: where it is, what it holds, how it is configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    #[serde(rename = "cell_name")]
    pub position: CellPosition,
    #[serde(flatten)]
    pub content: CellResult,
    #[serde(default)]
    pub config: CellConfig,
}

impl GridCell {
    /// Create a cell with default configuration
    pub fn new(position: CellPosition, content: CellResult) -> Self {
        Self {
            position,
            content,
            config: CellConfig::default(),
        }
    }

    /// Create a cell with the given configuration
    pub fn with_config(position: CellPosition, content: CellResult, config: CellConfig) -> Self {
        Self {
            position,
            content,
            config,
        }
    }
}

/// A `rows x cols` report grid
///
/// Cells are kept sorted row-major and every position appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grid {
    rows: u32,
    cols: u32,
    #[serde(rename = "cell_data", serialize_with = "serialize_cells")]
    cells: BTreeMap<CellPosition, GridCell>,
}

fn serialize_cells<S: serde::Serializer>(
    cells: &BTreeMap<CellPosition, GridCell>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(cells.values())
}

impl Grid {
    /// Create an empty grid with the given dimensions
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            cells: BTreeMap::new(),
        }
    }

    /// Build a grid from cells, validating bounds, uniqueness and merges
    pub fn from_cells<I>(rows: u32, cols: u32, cells: I) -> Result<Self>
    where
        I: IntoIterator<Item = GridCell>,
    {
        let mut grid = Self::new(rows, cols);
        for cell in cells {
            grid.insert(cell)?;
        }
        Ok(grid)
    }

    /// Get the number of rows
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Get the number of columns
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of populated cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cell is populated
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get a cell by position
    pub fn cell(&self, pos: CellPosition) -> Option<&GridCell> {
        self.cells.get(&pos)
    }

    /// Get a cell by spreadsheet-style name
    pub fn cell_by_name(&self, name: &str) -> Option<&GridCell> {
        CellPosition::parse(name).ok().and_then(|pos| self.cell(pos))
    }

    /// Iterate over cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &GridCell> + '_ {
        self.cells.values()
    }

    /// Iterate over all merge ranges
    pub fn merged_regions(&self) -> impl Iterator<Item = &MergeRange> + '_ {
        self.cells.values().filter_map(|c| c.config.merger.as_ref())
    }

    /// Insert a cell
    ///
    /// Fails if the cell lies outside the grid, if its position is already
    /// taken, or if its merge range overlaps an existing one.
    pub fn insert(&mut self, cell: GridCell) -> Result<()> {
        let pos = cell.position;
        if pos.row >= self.rows {
            return Err(Error::RowOutOfBounds(pos.row, self.rows));
        }
        if pos.col >= self.cols {
            return Err(Error::ColumnOutOfBounds(pos.col, self.cols));
        }
        if self.cells.contains_key(&pos) {
            return Err(Error::DuplicateCell(pos.to_name()));
        }

        if let Some(range) = &cell.config.merger {
            if range.anchor() != pos {
                return Err(Error::InvalidRange(format!(
                    "merge range {} is not anchored at {}",
                    range, pos
                )));
            }
            if range.bottom_row >= self.rows || range.right_col >= self.cols {
                return Err(Error::InvalidRange(format!(
                    "merge range {} exceeds the {}x{} grid",
                    range, self.rows, self.cols
                )));
            }
            // Check for overlap with existing merged regions
            for existing in self.merged_regions() {
                if range.overlaps(existing) {
                    return Err(Error::OverlappingMerge(
                        range.to_string(),
                        existing.to_string(),
                    ));
                }
            }
        }

        self.cells.insert(pos, cell);
        Ok(())
    }

    /// Consume the grid, yielding its cells in row-major order
    pub fn into_cells(self) -> impl Iterator<Item = GridCell> {
        self.cells.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    fn pos(name: &str) -> CellPosition {
        CellPosition::parse(name).unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut grid = Grid::new(3, 2);
        grid.insert(GridCell::new(pos("B2"), CellResult::number(5.0)))
            .unwrap();
        grid.insert(GridCell::new(pos("A1"), CellResult::text("Header")))
            .unwrap();

        assert_eq!(grid.len(), 2);
        assert_eq!(
            grid.cell_by_name("B2").unwrap().content,
            CellResult::Single(CellValue::Number(5.0))
        );
        let order: Vec<_> = grid.cells().map(|c| c.position.to_name()).collect();
        assert_eq!(order, ["A1", "B2"]);
    }

    #[test]
    fn test_rejects_out_of_bounds_and_duplicates() {
        let mut grid = Grid::new(2, 2);
        assert!(grid
            .insert(GridCell::new(pos("C1"), CellResult::number(1.0)))
            .is_err());
        assert!(grid
            .insert(GridCell::new(pos("A3"), CellResult::number(1.0)))
            .is_err());

        grid.insert(GridCell::new(pos("A1"), CellResult::number(1.0)))
            .unwrap();
        let err = grid
            .insert(GridCell::new(pos("A1"), CellResult::number(2.0)))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCell(name) if name == "A1"));
    }

    #[test]
    fn test_merge_validation() {
        let mut grid = Grid::new(4, 4);
        let merged = CellConfig::merged(MergeRange::parse("A1:B2").unwrap());
        grid.insert(GridCell::with_config(pos("A1"), CellResult::text("x"), merged))
            .unwrap();

        // Overlapping merge
        let overlapping = CellConfig::merged(MergeRange::parse("B2:C3").unwrap());
        assert!(matches!(
            grid.insert(GridCell::with_config(pos("B2"), CellResult::text("y"), overlapping)),
            Err(Error::OverlappingMerge(_, _))
        ));

        // Merge not anchored at its cell
        let detached = CellConfig::merged(MergeRange::parse("C3:D4").unwrap());
        assert!(matches!(
            grid.insert(GridCell::with_config(pos("C4"), CellResult::text("z"), detached)),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_config_keeps_formatting_keys() {
        let json = serde_json::json!({
            "merger": {"top_row": 0, "left_col": 0, "bottom_row": 0, "right_col": 2},
            "background": "#FFFFFF",
            "bold": true
        });
        let config: CellConfig = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(config.merger, Some(MergeRange::new(0, 0, 0, 2)));
        assert_eq!(config.format.get("bold"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(serde_json::to_value(&config).unwrap(), json);
    }
}
