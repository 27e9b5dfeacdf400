//! Report generation from a template document
//!
//! A template is a grid of cell texts. Generating a report for a window:
//!
//! 1. validates the grid (unique cells inside the bounds, disjoint merges),
//! 2. sends every `=`-prefixed cell through [`handle_parse_request`],
//! 3. merges the results back over the template, leaving literals as they are,
//! 4. expands list results into rows with [`expand_rows`].

use serde::{Deserialize, Serialize};
use tracing::info;

use report_sheets_core::{
    expand_rows, CellConfig, CellPosition, CellResult, Grid, GridCell, RowShifts,
};
use report_sheets_formula::{DataResolver, FormulaEngine, TimeWindow};

use crate::error::Result;
use crate::protocol::{handle_parse_request, ParseRequest};

/// One authored template cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCell {
    pub cell_name: CellPosition,
    /// Literal text or a `=` formula
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub config: CellConfig,
}

/// A report template as stored by the template designer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub rows: u32,
    pub cols: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default)]
    pub cell_data: Vec<TemplateCell>,
}

impl TemplateDocument {
    /// Parse a template from its JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the template grid without evaluating anything
    pub fn validate(&self) -> Result<()> {
        self.build_grid(|cell| CellResult::text(cell.value.as_str()))
            .map(|_| ())
    }

    /// Formula cells, keyed by cell name
    pub fn formula_request(&self, window: &TimeWindow) -> ParseRequest {
        let mut request = ParseRequest::new(window);
        for cell in self.cell_data.iter().filter(|c| c.value.starts_with('=')) {
            request
                .cell_value
                .insert(cell.cell_name.to_name(), cell.value.clone());
        }
        request
    }

    fn build_grid<F>(&self, mut content: F) -> Result<Grid>
    where
        F: FnMut(&TemplateCell) -> CellResult,
    {
        let cells = self.cell_data.iter().map(|cell| {
            GridCell::with_config(cell.cell_name, content(cell), cell.config.clone())
        });
        Ok(Grid::from_cells(self.rows, self.cols, cells)?)
    }
}

/// A materialized report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub grid: Grid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Rows inserted below each template row
    #[serde(skip)]
    pub shifts: RowShifts,
}

impl Report {
    /// Cell display strings as a dense `rows x cols` matrix
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec![String::new(); self.grid.cols() as usize]; self.grid.rows() as usize];
        for cell in self.grid.cells() {
            let text = match &cell.content {
                CellResult::Single(value) => value.display_string(),
                CellResult::List(values) => values
                    .iter()
                    .map(|v| v.display_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                CellResult::Error(message) => message.clone(),
            };
            rows[cell.position.row as usize][cell.position.col as usize] = text;
        }
        rows
    }

    /// Number of cells holding an error
    pub fn error_count(&self) -> usize {
        self.grid.cells().filter(|c| c.content.is_error()).count()
    }
}

/// Generates reports from templates with one formula engine
#[derive(Debug, Clone)]
pub struct ReportBuilder<R> {
    engine: FormulaEngine<R>,
}

impl<R: DataResolver> ReportBuilder<R> {
    pub fn new(engine: FormulaEngine<R>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &FormulaEngine<R> {
        &self.engine
    }

    /// Evaluate and materialize a template for a window
    pub fn generate(&self, template: &TemplateDocument, window: &TimeWindow) -> Result<Report> {
        template.validate()?;

        let request = template.formula_request(window);
        let mut response = handle_parse_request(&self.engine, &request)?;

        let evaluated = template.build_grid(|cell| {
            response
                .cell_value
                .remove(&cell.cell_name.to_name())
                .unwrap_or_else(|| CellResult::text(cell.value.as_str()))
        })?;
        let expansion = expand_rows(&evaluated)?;

        let report = Report {
            grid: expansion.grid,
            background_color: template.background_color.clone(),
            shifts: expansion.shifts,
        };
        info!(
            formulas = request.cell_value.len(),
            rows = report.grid.rows(),
            errors = report.error_count(),
            "generated report"
        );
        Ok(report)
    }
}
