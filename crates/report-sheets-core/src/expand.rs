//! Row expansion
//!
//! Turns a grid of evaluated cells into the final report grid. A
//! [`CellResult::List`] with `n` values occupies `n` consecutive rows starting
//! at its own row; every original row below it moves down by `n - 1`. Lists
//! sharing a row share the inserted rows, so the row grows by the longest one.
//! Merge ranges are remapped through the same shift.

use std::collections::BTreeMap;

use crate::cell::{CellPosition, CellResult, CellValue, MergeRange};
use crate::error::Result;
use crate::grid::{Grid, GridCell};

/// Rows inserted below each original row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowShifts {
    extra: BTreeMap<u32, u32>,
}

impl RowShifts {
    /// Compute the shift map for a grid
    pub fn for_grid(grid: &Grid) -> Self {
        let mut extra: BTreeMap<u32, u32> = BTreeMap::new();
        for cell in grid.cells() {
            let added = cell.content.row_span() - 1;
            if added > 0 {
                let slot = extra.entry(cell.position.row).or_insert(0);
                *slot = (*slot).max(added);
            }
        }
        Self { extra }
    }

    /// Check if expansion moves nothing
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty()
    }

    /// Rows inserted directly below original row `row`
    pub fn extra(&self, row: u32) -> u32 {
        self.extra.get(&row).copied().unwrap_or(0)
    }

    /// Cumulative shift applied to original row `row`
    pub fn shift(&self, row: u32) -> u32 {
        self.extra.range(..row).map(|(_, n)| n).sum()
    }

    /// Total number of inserted rows
    pub fn total(&self) -> u32 {
        self.extra.values().sum()
    }

    /// Where original row `row` lands after expansion
    pub fn effective_row(&self, row: u32) -> u32 {
        row + self.shift(row)
    }

    /// Remap a merge range so it covers every row its original rows became
    pub fn remap_merge(&self, range: &MergeRange) -> MergeRange {
        range.with_rows(
            self.effective_row(range.top_row),
            self.effective_row(range.bottom_row) + self.extra(range.bottom_row),
        )
    }

    /// Iterate over `(original_row, inserted_rows)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.extra.iter().map(|(row, n)| (*row, *n))
    }
}

/// Result of expanding a grid
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// The materialized grid; contains no list cells
    pub grid: Grid,
    /// The shift applied to each original row
    pub shifts: RowShifts,
}

/// Expand every list cell of `grid` into consecutive rows
///
/// Column indices never change. Expanding a grid without list cells returns
/// an identical grid.
pub fn expand_rows(grid: &Grid) -> Result<Expansion> {
    let shifts = RowShifts::for_grid(grid);
    let mut expanded = Grid::new(grid.rows() + shifts.total(), grid.cols());

    for cell in grid.cells() {
        let row = shifts.effective_row(cell.position.row);
        let col = cell.position.col;

        match &cell.content {
            CellResult::List(values) => {
                // A one-row merge on a list cell is repeated on every emitted row
                let per_row_merge = cell
                    .config
                    .merger
                    .filter(|range| range.row_count() == 1);

                if values.is_empty() {
                    let config = cell
                        .config
                        .with_merger(cell.config.merger.map(|range| shifts.remap_merge(&range)));
                    expanded.insert(GridCell::with_config(
                        CellPosition::new(row, col),
                        CellResult::Single(CellValue::text("")),
                        config,
                    ))?;
                    continue;
                }

                for (offset, value) in values.iter().enumerate() {
                    let target = row + offset as u32;
                    let merger = match (per_row_merge, offset) {
                        (Some(range), _) => Some(range.with_rows(target, target)),
                        (None, 0) => cell.config.merger.map(|range| shifts.remap_merge(&range)),
                        (None, _) => None,
                    };
                    expanded.insert(GridCell::with_config(
                        CellPosition::new(target, col),
                        CellResult::Single(value.clone()),
                        cell.config.with_merger(merger),
                    ))?;
                }
            }
            content => {
                let merger = cell.config.merger.map(|range| shifts.remap_merge(&range));
                expanded.insert(GridCell::with_config(
                    CellPosition::new(row, col),
                    content.clone(),
                    cell.config.with_merger(merger),
                ))?;
            }
        }
    }

    tracing::debug!(
        original_rows = grid.rows(),
        rows = expanded.rows(),
        cells = expanded.len(),
        "expanded report rows"
    );

    Ok(Expansion {
        grid: expanded,
        shifts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellConfig;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn pos(name: &str) -> CellPosition {
        CellPosition::parse(name).unwrap()
    }

    fn list(values: &[f64]) -> CellResult {
        CellResult::List(values.iter().map(|v| CellValue::Number(*v)).collect())
    }

    fn text_at(grid: &Grid, name: &str) -> Option<String> {
        grid.cell_by_name(name).map(|c| match &c.content {
            CellResult::Single(v) => v.display_string(),
            other => format!("{:?}", other),
        })
    }

    #[test]
    fn test_list_cell_expands_and_shifts_rows_below() {
        // 4-row grid, list of three values in A2
        let grid = Grid::from_cells(
            4,
            2,
            vec![
                GridCell::new(pos("A1"), CellResult::text("Header")),
                GridCell::new(pos("A2"), list(&[10.0, 20.0, 30.0])),
                GridCell::new(pos("B2"), CellResult::text("t/day")),
                GridCell::new(pos("A3"), CellResult::text("row three")),
                GridCell::new(pos("A4"), CellResult::text("row four")),
            ],
        )
        .unwrap();

        let Expansion { grid: out, shifts } = expand_rows(&grid).unwrap();

        assert_eq!(out.rows(), 6);
        assert_eq!(out.cols(), 2);
        assert_eq!(text_at(&out, "A1").as_deref(), Some("Header"));
        assert_eq!(text_at(&out, "A2").as_deref(), Some("10"));
        assert_eq!(text_at(&out, "A3").as_deref(), Some("20"));
        assert_eq!(text_at(&out, "A4").as_deref(), Some("30"));
        assert_eq!(text_at(&out, "B2").as_deref(), Some("t/day"));
        assert_eq!(text_at(&out, "A5").as_deref(), Some("row three"));
        assert_eq!(text_at(&out, "A6").as_deref(), Some("row four"));

        assert_eq!(shifts.shift(1), 0);
        assert_eq!(shifts.shift(2), 2);
        assert_eq!(shifts.total(), 2);
        assert!(out.cells().all(|c| !c.content.is_list()));
    }

    #[test]
    fn test_lists_in_same_row_share_inserted_rows() {
        let grid = Grid::from_cells(
            3,
            2,
            vec![
                GridCell::new(pos("A1"), list(&[1.0, 2.0])),
                GridCell::new(pos("B1"), list(&[5.0, 6.0, 7.0])),
                GridCell::new(pos("A2"), CellResult::text("next")),
            ],
        )
        .unwrap();

        let out = expand_rows(&grid).unwrap().grid;
        assert_eq!(out.rows(), 5);
        assert_eq!(text_at(&out, "A2").as_deref(), Some("2"));
        assert_eq!(text_at(&out, "A3"), None);
        assert_eq!(text_at(&out, "B3").as_deref(), Some("7"));
        assert_eq!(text_at(&out, "A4").as_deref(), Some("next"));
    }

    #[test]
    fn test_stacked_lists_accumulate_shift() {
        let grid = Grid::from_cells(
            3,
            1,
            vec![
                GridCell::new(pos("A1"), list(&[1.0, 2.0])),
                GridCell::new(pos("A2"), list(&[3.0, 4.0, 5.0])),
                GridCell::new(pos("A3"), CellResult::text("total")),
            ],
        )
        .unwrap();

        let out = expand_rows(&grid).unwrap().grid;
        let values: Vec<_> = out.cells().map(|c| text_at(&out, &c.position.to_name()).unwrap()).collect();
        assert_eq!(values, ["1", "2", "3", "4", "5", "total"]);
        assert_eq!(out.rows(), 6);
    }

    #[test]
    fn test_merge_ranges_are_remapped() {
        let mut label = CellConfig::merged(MergeRange::parse("B1:C1").unwrap());
        label
            .format
            .insert("bold".into(), serde_json::Value::Bool(true));
        let grid = Grid::from_cells(
            3,
            3,
            vec![
                GridCell::new(pos("A1"), list(&[1.0, 2.0, 3.0])),
                GridCell::with_config(pos("B1"), CellResult::text("Acid"), label),
                GridCell::with_config(
                    pos("A2"),
                    CellResult::text("Footer"),
                    CellConfig::merged(MergeRange::parse("A2:C3").unwrap()),
                ),
            ],
        )
        .unwrap();

        let out = expand_rows(&grid).unwrap().grid;

        // The label next to the list now spans the inserted rows
        let label = out.cell_by_name("B1").unwrap();
        assert_eq!(label.config.merger, Some(MergeRange::parse("B1:C3").unwrap()));
        assert_eq!(label.config.format.get("bold"), Some(&serde_json::Value::Bool(true)));

        // The footer block moved down intact
        let footer = out.cell_by_name("A4").unwrap();
        assert_eq!(footer.config.merger, Some(MergeRange::parse("A4:C5").unwrap()));
    }

    #[test]
    fn test_one_row_merge_on_list_cell_is_repeated() {
        let grid = Grid::from_cells(
            2,
            2,
            vec![GridCell::with_config(
                pos("A1"),
                list(&[1.0, 2.0]),
                CellConfig::merged(MergeRange::parse("A1:B1").unwrap()),
            )],
        )
        .unwrap();

        let out = expand_rows(&grid).unwrap().grid;
        let merges: Vec<_> = out.merged_regions().map(|m| m.to_string()).collect();
        assert_eq!(merges, ["A1:B1", "A2:B2"]);
    }

    #[test]
    fn test_empty_list_keeps_one_blank_cell() {
        let grid = Grid::from_cells(
            2,
            1,
            vec![
                GridCell::new(pos("A1"), CellResult::List(vec![])),
                GridCell::new(pos("A2"), CellResult::text("below")),
            ],
        )
        .unwrap();

        let out = expand_rows(&grid).unwrap().grid;
        assert_eq!(out.rows(), 2);
        assert_eq!(text_at(&out, "A1").as_deref(), Some(""));
        assert_eq!(text_at(&out, "A2").as_deref(), Some("below"));
    }

    #[test]
    fn test_empty_list_keeps_its_merge_span() {
        let grid = Grid::from_cells(
            4,
            2,
            vec![
                GridCell::new(pos("A1"), list(&[1.0, 2.0])),
                GridCell::with_config(
                    pos("A2"),
                    CellResult::List(vec![]),
                    CellConfig::merged(MergeRange::parse("A2:B3").unwrap()),
                ),
                GridCell::new(pos("A4"), CellResult::text("end")),
            ],
        )
        .unwrap();

        let out = expand_rows(&grid).unwrap().grid;
        let merges: Vec<_> = out.merged_regions().map(|m| m.to_string()).collect();
        assert_eq!(merges, ["A3:B4"]);
        assert_eq!(text_at(&out, "A3").as_deref(), Some(""));
        assert_eq!(text_at(&out, "A5").as_deref(), Some("end"));
    }

    #[test]
    fn test_error_cells_pass_through() {
        let err = CellResult::Error("[ERROR: Division by zero]".into());
        let grid = Grid::from_cells(1, 1, vec![GridCell::new(pos("A1"), err.clone())]).unwrap();
        let out = expand_rows(&grid).unwrap().grid;
        assert_eq!(out.cell_by_name("A1").unwrap().content, err);
    }

    fn arb_result() -> impl Strategy<Value = CellResult> {
        prop_oneof![
            (-1e6f64..1e6).prop_map(CellResult::number),
            "[a-z]{0,6}".prop_map(CellResult::text),
            prop::collection::vec(-1e6f64..1e6, 0..5).prop_map(|v| list(&v)),
        ]
    }

    fn arb_grid(with_lists: bool) -> impl Strategy<Value = Grid> {
        (1u32..8, 1u32..4).prop_flat_map(move |(rows, cols)| {
            prop::collection::vec(
                (0..rows, 0..cols, arb_result()),
                0..(rows * cols) as usize + 1,
            )
            .prop_map(move |cells| {
                let mut grid = Grid::new(rows, cols);
                for (row, col, content) in cells {
                    let content = match content {
                        CellResult::List(_) if !with_lists => CellResult::number(row as f64),
                        other => other,
                    };
                    // Duplicate positions are simply skipped
                    let _ = grid.insert(GridCell::new(CellPosition::new(row, col), content));
                }
                grid
            })
        })
    }

    proptest! {
        #[test]
        fn expansion_without_lists_is_identity(grid in arb_grid(false)) {
            let expansion = expand_rows(&grid).unwrap();
            prop_assert!(expansion.shifts.is_empty());
            prop_assert_eq!(expansion.grid, grid);
        }

        #[test]
        fn expansion_is_idempotent(grid in arb_grid(true)) {
            let once = expand_rows(&grid).unwrap().grid;
            let twice = expand_rows(&once).unwrap().grid;
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn expansion_preserves_columns_and_cardinality(grid in arb_grid(true)) {
            let expansion = expand_rows(&grid).unwrap();
            prop_assert!(expansion.grid.len() >= grid.len());
            prop_assert_eq!(expansion.grid.rows(), grid.rows() + expansion.shifts.total());
            for cell in grid.cells() {
                let target = CellPosition::new(
                    expansion.shifts.effective_row(cell.position.row),
                    cell.position.col,
                );
                prop_assert!(expansion.grid.cell(target).is_some());
            }
        }

        #[test]
        fn single_list_shifts_rows_below_by_len_minus_one(
            rows in 2u32..10,
            at in 0u32..9,
            n in 1usize..6,
        ) {
            let at = at % rows;
            let mut grid = Grid::new(rows, 2);
            for row in 0..rows {
                let content = if row == at {
                    list(&vec![1.0; n])
                } else {
                    CellResult::number(row as f64)
                };
                grid.insert(GridCell::new(CellPosition::new(row, 0), content)).unwrap();
            }

            let expansion = expand_rows(&grid).unwrap();
            prop_assert_eq!(expansion.grid.rows(), rows + n as u32 - 1);
            for row in (at + 1)..rows {
                let moved = expansion.grid.cell(CellPosition::new(row + n as u32 - 1, 0)).unwrap();
                prop_assert_eq!(&moved.content, &CellResult::number(row as f64));
            }
        }
    }
}
