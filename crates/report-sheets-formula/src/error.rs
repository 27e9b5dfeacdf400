//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while classifying, resolving or evaluating a formula
///
/// None of these abort a whole report: per-cipher and per-function failures
/// are embedded in the expression text as `[ERROR: ...]` markers (see
/// [`FormulaError::marker`]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Malformed data reference (missing analytical segments, non-digit id)
    #[error("Invalid cipher syntax: {0}")]
    InvalidCipherSyntax(String),

    /// Function name outside the fixed set
    #[error("Function '{0}' is not supported")]
    UnsupportedFunction(String),

    /// A known function failed on its arguments
    #[error("Function '{function}' failed: {message}")]
    FunctionEvaluation { function: String, message: String },

    /// Division by zero, type mismatch or malformed residual expression
    #[error("{0}")]
    Arithmetic(String),

    /// The external data source failed
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// The requested time window is unusable
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),
}

impl FormulaError {
    pub(crate) fn function<F: Into<String>, M: Into<String>>(function: F, message: M) -> Self {
        FormulaError::FunctionEvaluation {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Render the inline marker substituted into the expression text
    ///
    /// Parentheses and brackets are stripped from the message so a marker is
    /// never mistaken for a function call or a list literal.
    pub fn marker(&self) -> String {
        error_marker(&self.to_string())
    }
}

/// Build an `[ERROR: <message>]` marker from an arbitrary message
pub fn error_marker(message: &str) -> String {
    let message: String = message
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .collect();
    format!("{}{}]", ERROR_MARKER_PREFIX, message.trim())
}

/// Prefix every inline error marker starts with
pub const ERROR_MARKER_PREFIX: &str = "[ERROR: ";

/// Check whether expression text carries an inline error marker
pub fn contains_error_marker(text: &str) -> bool {
    text.contains(ERROR_MARKER_PREFIX.trim_end())
}

/// Errors reported by a [`DataResolver`](crate::resolver::DataResolver)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolverError {
    /// The referenced product, parameter or line does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The backing store could not be reached or queried
    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    /// The resolver does not serve this kind of cipher
    #[error("Cipher {0} is not supported by this data source")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_format() {
        assert_eq!(
            FormulaError::Arithmetic("Division by zero".into()).marker(),
            "[ERROR: Division by zero]"
        );
        assert_eq!(
            FormulaError::UnsupportedFunction("median".into()).marker(),
            "[ERROR: Function 'median' is not supported]"
        );
    }

    #[test]
    fn test_marker_strips_call_syntax() {
        let err = ResolverError::Unavailable("timeout (after 5s) [db]".into());
        let marker = FormulaError::from(err).marker();
        assert_eq!(marker, "[ERROR: Data source unavailable: timeout after 5s db]");
        assert!(contains_error_marker(&marker));
    }
}
