//! Expression assembly: substitution, function pass and residual evaluation

use lazy_regex::regex;
use report_sheets_core::{format_number, CellResult, CellValue};
use tracing::debug;

use crate::cipher::CipherToken;
use crate::error::{contains_error_marker, FormulaError, FormulaResult, ERROR_MARKER_PREFIX};
use crate::evaluator::{evaluate, Value};
use crate::functions::registry;
use crate::parser::{is_arithmetic, parse_arguments, parse_expression};
use crate::resolver::ResolvedValue;

/// Delimits the index of a held-out display text in substituted expressions
const TEXT_SLOT: char = '\u{E000}';

/// Expression text after cipher substitution
///
/// Display text (names, units, dates) is held out of `text` as numbered
/// slots so the function pass never sees it; [`Substituted::restore`] puts
/// it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Substituted {
    pub text: String,
    pub texts: Vec<String>,
}

impl Substituted {
    /// Whether a cipher was replaced by display text
    pub fn is_textual(&self) -> bool {
        !self.texts.is_empty()
    }

    /// Replace every slot in `residual` with its display text
    pub fn restore(&self, residual: &str) -> String {
        self.texts
            .iter()
            .enumerate()
            .fold(residual.to_string(), |out, (index, text)| {
                out.replace(&text_slot(index), text)
            })
    }
}

fn text_slot(index: usize) -> String {
    format!("{TEXT_SLOT}{index}{TEXT_SLOT}")
}

/// Replace each cipher occurrence with the printable form of its resolution
///
/// `resolved` holds one entry per token, in token order. A series with
/// empty rows that is the only argument of `tave` also carries its row
/// count, so `tave(T1)` averages over every row in the window.
pub fn substitute(
    body: &str,
    tokens: &[CipherToken],
    resolved: &[FormulaResult<ResolvedValue>],
) -> Substituted {
    let mut text = String::with_capacity(body.len());
    let mut texts = Vec::new();
    let mut last = 0;

    for (token, value) in tokens.iter().zip(resolved) {
        text.push_str(&body[last..token.span.start]);
        match value {
            Ok(ResolvedValue::Scalar(n)) => text.push_str(&format_number(*n)),
            Ok(ResolvedValue::Series(values)) => text.push_str(&list_literal(values)),
            Ok(ResolvedValue::Readings { values, total }) => {
                text.push_str(&list_literal(values));
                if is_sole_tave_argument(body, token.span.clone()) {
                    text.push_str(&format!(", {}", total));
                }
            }
            Ok(ResolvedValue::Text(s)) => {
                text.push_str(&text_slot(texts.len()));
                texts.push(s.clone());
            }
            Err(e) => text.push_str(&e.marker()),
        }
        last = token.span.end;
    }
    text.push_str(&body[last..]);

    Substituted { text, texts }
}

fn is_sole_tave_argument(body: &str, span: std::ops::Range<usize>) -> bool {
    let opens = regex!(r"\btave\s*\(\s*$").is_match(&body[..span.start]);
    opens && body[span.end..].trim_start().starts_with(')')
}

/// Render a series as a bracketed list literal
pub fn list_literal(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format_number(*v)).collect();
    format!("[{}]", items.join(", "))
}

/// Evaluate every `name(args)` call, innermost first
///
/// Each call is replaced by its numeric result or an error marker. A call
/// whose arguments already carry a marker is replaced by that marker.
pub fn apply_functions(text: &str) -> String {
    let pattern = regex!(r"\b([A-Za-z_]\w*)\(([^()]*)\)");
    let mut text = text.to_string();

    loop {
        let (range, replacement) = {
            let Some(caps) = pattern.captures(&text) else { break };
            let Some(whole) = caps.get(0) else { break };
            (whole.range(), call_function(&caps[1], &caps[2]))
        };
        text.replace_range(range, &replacement);
    }

    text
}

fn call_function(name: &str, args: &str) -> String {
    if let Some(marker) = first_marker(args) {
        debug!(function = name, "propagating error from arguments");
        return marker.to_string();
    }

    let result = evaluate_call(name, args);
    match result {
        Ok(n) => format_number(n),
        Err(e) => {
            debug!(function = name, error = %e, "function call failed");
            e.marker()
        }
    }
}

fn evaluate_call(name: &str, args: &str) -> FormulaResult<f64> {
    let registry = registry();
    if registry.get(name).is_none() {
        return Err(FormulaError::UnsupportedFunction(name.to_string()));
    }

    let exprs = parse_arguments(args)
        .map_err(|_| FormulaError::function(name, format!("arguments are not numeric: {}", args.trim())))?;
    let values = exprs
        .iter()
        .map(evaluate)
        .collect::<FormulaResult<Vec<Value>>>()
        .map_err(|e| FormulaError::function(name, e.to_string()))?;

    registry.call(name, &values)
}

fn first_marker(text: &str) -> Option<&str> {
    let start = text.find(ERROR_MARKER_PREFIX.trim_end())?;
    let end = text[start..].find(']').map_or(text.len(), |i| start + i + 1);
    Some(&text[start..end])
}

/// Turn the final residual text into a cell result
///
/// - any error marker makes the whole cell an error carrying the residual
/// - residuals built from display text pass through unchanged
/// - anything else must be arithmetic; a bare empty series is `0`
pub fn evaluate_residual(residual: &str, textual: bool) -> CellResult {
    let residual = residual.trim();

    if contains_error_marker(residual) {
        return CellResult::Error(residual.to_string());
    }
    if textual || residual.is_empty() {
        return CellResult::text(residual);
    }

    let evaluated = if is_arithmetic(residual) {
        parse_expression(residual).and_then(|expr| evaluate(&expr))
    } else {
        Err(FormulaError::Arithmetic(format!("Not an arithmetic expression: {}", residual)))
    };
    match evaluated {
        Ok(Value::Number(n)) => CellResult::number(n),
        Ok(Value::List(values)) => match values.len() {
            0 => CellResult::number(0.0),
            1 => CellResult::number(values[0]),
            _ => CellResult::List(values.into_iter().map(CellValue::Number).collect()),
        },
        Err(e) => CellResult::Error(e.marker()),
    }
}

/// Run substitution, the function pass and residual evaluation
pub fn assemble(
    body: &str,
    tokens: &[CipherToken],
    resolved: &[FormulaResult<ResolvedValue>],
) -> CellResult {
    let substituted = substitute(body, tokens, resolved);
    let residual = substituted.restore(&apply_functions(&substituted.text));
    debug!(%residual, textual = substituted.is_textual(), "assembled residual expression");
    evaluate_residual(&residual, substituted.is_textual())
}
