//! # report-sheets
//!
//! Report generation from formula templates over laboratory and process
//! time series.
//!
//! Template cells hold literal text or formulas such as `=sum(T500)` or
//! `=lst(L301.3.H2SO4.P)`. Generating a report evaluates every formula for a
//! time window and expands list-valued cells into consecutive rows.
//!
//! ## Example
//!
//! ```rust
//! use report_sheets::prelude::*;
//!
//! let store = MemoryStore::from_json(r#"{
//!     "technological": {
//!         "500": { "name": "Acid flow", "unit": "t/h", "samples": [
//!             { "time": "2024-03-01 06:00:00", "value": 10.0 },
//!             { "time": "2024-03-02 06:00:00", "value": 20.0 }
//!         ] }
//!     }
//! }"#).unwrap();
//!
//! let template = TemplateDocument::from_json(r#"{
//!     "rows": 2, "cols": 2,
//!     "cell_data": [
//!         { "cell_name": "A1", "value": "=getNameProd(T500)" },
//!         { "cell_name": "B1", "value": "=T500" },
//!         { "cell_name": "A2", "value": "Total" },
//!         { "cell_name": "B2", "value": "=sum(T500)" }
//!     ]
//! }"#).unwrap();
//!
//! let window = TimeWindow::parse("2024-03-01", "2024-03-31").unwrap();
//! let report = ReportBuilder::new(FormulaEngine::new(store))
//!     .generate(&template, &window)
//!     .unwrap();
//!
//! assert_eq!(report.grid.rows(), 3);
//! assert_eq!(report.to_rows()[2], ["Total", "30"]);
//! ```

pub mod error;
pub mod prelude;
pub mod protocol;
pub mod report;
pub mod store;

pub use error::{Error, Result};
pub use protocol::{handle_parse_request, handle_request, ParseRequest, ParseResponse, Request, Response};
pub use report::{Report, ReportBuilder, TemplateCell, TemplateDocument};
pub use store::{LabProduct, LabSample, MemoryStore, Parameter, Sample};

// Re-export core types
pub use report_sheets_core::{
    expand_rows, format_number, generate_cell_name, parse_cell_position, CellConfig, CellPosition,
    CellResult, CellValue, Expansion, Grid, GridCell, MergeRange, RowShifts,
};

// Re-export formula types
pub use report_sheets_formula::{
    classify, Cipher, DataResolver, EngineOptions, FormulaEngine, FormulaError, Metric,
    ResolutionMode, ResolvedValue, ResolverError, Source, SourceRouter, TimeWindow,
};
