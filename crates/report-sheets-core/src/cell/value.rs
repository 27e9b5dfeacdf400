//! Cell value and evaluation result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single displayable value: a number or a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric value
    Number(f64),
    /// Text value (literals, product names, units, dates, error markers)
    Text(String),
}

impl CellValue {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Get the numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }

    /// Render the value the way a report cell shows it
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// The typed outcome of evaluating one cell
///
/// Serialized as `{ "type": "single" | "list" | "error", "value": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellResult {
    /// One value
    Single(CellValue),
    /// Several values, expanded into consecutive rows by the materializer
    List(Vec<CellValue>),
    /// The whole formula failed; the message carries the `[ERROR: ...]` marker
    Error(String),
}

impl CellResult {
    /// Shorthand for a single numeric result
    pub fn number(n: f64) -> Self {
        CellResult::Single(CellValue::Number(n))
    }

    /// Shorthand for a single text result
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellResult::Single(CellValue::Text(s.into()))
    }

    /// Check if this is a list result
    pub fn is_list(&self) -> bool {
        matches!(self, CellResult::List(_))
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellResult::Error(_))
    }

    /// Number of report rows this result occupies once expanded
    pub fn row_span(&self) -> u32 {
        match self {
            CellResult::List(values) => values.len().max(1) as u32,
            _ => 1,
        }
    }
}

/// Format a number the way cells display it: integral values without a
/// fractional part, everything else with the shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
