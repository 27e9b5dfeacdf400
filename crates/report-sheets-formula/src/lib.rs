//! # report-sheets-formula
//!
//! Formula evaluation for report-sheets templates.
//!
//! This crate provides:
//! - Cipher classification (`T500`, `L301.3.H2SO4.P`, `X12`, `getNameProd(T5)`, ...)
//! - The [`DataResolver`] trait and a per-source [`SourceRouter`]
//! - The aggregation functions `lst`, `snm`, `ave`, `count`, `max`, `min`, `sum`, `tave`
//! - A four-operator arithmetic parser and evaluator
//! - The [`FormulaEngine`] tying these together into a [`CellResult`](report_sheets_core::CellResult)
//!
//! ## Example
//!
//! ```rust
//! use report_sheets_formula::{Cipher, DataResolver, FormulaEngine, ResolvedValue, ResolverError, TimeWindow};
//! use report_sheets_core::CellResult;
//!
//! struct Flow;
//!
//! impl DataResolver for Flow {
//!     fn resolve(&self, _: &Cipher, _: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
//!         Ok(ResolvedValue::Series(vec![10.0, 20.0, 30.0]))
//!     }
//! }
//!
//! let engine = FormulaEngine::new(Flow);
//! let window = TimeWindow::parse("2024-03-01", "2024-03-31").unwrap();
//! assert_eq!(engine.evaluate("=sum(T500)", &window), CellResult::number(60.0));
//! assert!(engine.evaluate("=T500", &window).is_list());
//! ```

pub mod assembler;
pub mod ast;
pub mod cipher;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod resolver;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use cipher::{classify, Cipher, CipherToken, Metric, Source};
pub use engine::{EngineOptions, FormulaEngine, ResolutionMode};
pub use error::{error_marker, FormulaError, FormulaResult, ResolverError};
pub use evaluator::{evaluate, Value};
pub use functions::{registry, FunctionRegistry};
pub use parser::{parse_arguments, parse_expression};
pub use resolver::{parse_timestamp, DataResolver, ResolvedValue, SourceRouter, TimeWindow};
