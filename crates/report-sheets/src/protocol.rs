//! Cell-parsing request and response messages
//!
//! A report client collects every `=`-prefixed cell of a template and sends
//! them in one request:
//!
//! ```json
//! { "type": "PARSE_CELL",
//!   "data": { "cell_value": { "B2": "=sum(T500)" },
//!             "start_time": "2024-03-01", "end_time": "2024-03-31" } }
//! ```
//!
//! The response maps each cell name to its typed result:
//!
//! ```json
//! { "cell_value": { "B2": { "type": "single", "value": 60 } } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info_span};

use report_sheets_core::CellResult;
use report_sheets_formula::{DataResolver, FormulaEngine, TimeWindow};

use crate::error::Result;

/// Formulas to evaluate for one time window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseRequest {
    /// Formula text keyed by cell name
    pub cell_value: BTreeMap<String, String>,
    pub start_time: String,
    pub end_time: String,
}

impl ParseRequest {
    /// Create an empty request for a window
    pub fn new(window: &TimeWindow) -> Self {
        Self {
            cell_value: BTreeMap::new(),
            start_time: window.start_literal(),
            end_time: window.end_literal(),
        }
    }

    /// Parse the request's time window
    pub fn window(&self) -> Result<TimeWindow> {
        Ok(TimeWindow::parse(&self.start_time, &self.end_time)?)
    }
}

/// Evaluated results keyed by cell name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    pub cell_value: BTreeMap<String, CellResult>,
}

/// Request envelope, tagged by message type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Request {
    #[serde(rename = "PARSE_CELL")]
    ParseCell(ParseRequest),
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    ParseCell(ParseResponse),
}

/// Evaluate every formula of a request
///
/// Only a malformed window fails the request; formula failures are reported
/// per cell.
pub fn handle_parse_request<R: DataResolver>(
    engine: &FormulaEngine<R>,
    request: &ParseRequest,
) -> Result<ParseResponse> {
    let window = request.window()?;
    let span = info_span!("parse_cells", cells = request.cell_value.len(), %window);
    let _enter = span.enter();

    let cell_value = request
        .cell_value
        .iter()
        .map(|(name, formula)| {
            let result = engine.evaluate(formula, &window);
            debug!(cell = %name, ?result, "evaluated cell");
            (name.clone(), result)
        })
        .collect();

    Ok(ParseResponse { cell_value })
}

/// Dispatch a request envelope
pub fn handle_request<R: DataResolver>(engine: &FormulaEngine<R>, request: &Request) -> Result<Response> {
    match request {
        Request::ParseCell(parse) => handle_parse_request(engine, parse).map(Response::ParseCell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use report_sheets_formula::{Cipher, ResolvedValue, ResolverError};
    use serde_json::json;

    struct Flow;

    impl DataResolver for Flow {
        fn resolve(&self, _: &Cipher, _: &TimeWindow) -> std::result::Result<ResolvedValue, ResolverError> {
            Ok(ResolvedValue::Series(vec![10.0, 20.0, 30.0]))
        }
    }

    #[test]
    fn test_request_envelope_wire_format() {
        let request: Request = serde_json::from_value(json!({
            "type": "PARSE_CELL",
            "data": {
                "cell_value": { "B2": "=sum(T500)", "C2": "=T500" },
                "start_time": "2024-03-01",
                "end_time": "2024-03-31"
            }
        }))
        .unwrap();

        let Response::ParseCell(response) = handle_request(&FormulaEngine::new(Flow), &request).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "cell_value": {
                    "B2": { "type": "single", "value": 60.0 },
                    "C2": { "type": "list", "value": [10.0, 20.0, 30.0] }
                }
            })
        );
    }

    #[test]
    fn test_cell_errors_do_not_fail_request() {
        let mut request = ParseRequest::new(&TimeWindow::parse("2024-03-01", "2024-03-31").unwrap());
        request.cell_value.insert("A1".into(), "=T500/0".into());
        request.cell_value.insert("A2".into(), "=count(T500)".into());

        let response = handle_parse_request(&FormulaEngine::new(Flow), &request).unwrap();
        assert!(response.cell_value["A1"].is_error());
        assert_eq!(response.cell_value["A2"], CellResult::number(3.0));
    }

    #[test]
    fn test_bad_window_fails_request() {
        let request = ParseRequest {
            cell_value: BTreeMap::new(),
            start_time: "2024-03-31".into(),
            end_time: "2024-03-01".into(),
        };
        assert!(matches!(
            handle_parse_request(&FormulaEngine::new(Flow), &request),
            Err(Error::Formula(_))
        ));
    }
}
