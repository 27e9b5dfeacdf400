//! Prelude module - common imports for report-sheets users
//!
//! ```rust
//! use report_sheets::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellConfig,
    CellPosition,
    CellResult,
    CellValue,
    Grid,
    MergeRange,

    // Formula evaluation
    DataResolver,
    EngineOptions,
    FormulaEngine,
    ResolutionMode,
    ResolvedValue,
    TimeWindow,

    // Data and reports
    MemoryStore,
    ParseRequest,
    ParseResponse,
    Report,
    ReportBuilder,
    TemplateDocument,

    // Error types
    Error,
    Result,
};
