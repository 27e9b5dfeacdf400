//! Data resolution: time windows, resolved values and the resolver trait

use ahash::AHashMap;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::sync::Arc;

use crate::cipher::{Cipher, Source};
use crate::error::{FormulaError, FormulaResult, ResolverError};

/// Inclusive `[start, end]` window a report is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Create a window, rejecting an end before the start
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> FormulaResult<Self> {
        if end < start {
            return Err(FormulaError::InvalidWindow(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering whole days from `start` through `end`
    pub fn days(start: NaiveDate, end: NaiveDate) -> FormulaResult<Self> {
        Self::new(start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN))
    }

    /// Parse both boundaries with [`parse_timestamp`]
    pub fn parse(start: &str, end: &str) -> FormulaResult<Self> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    /// Check whether a timestamp falls inside the window (both ends inclusive)
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }

    /// The start boundary as it is substituted for `start_date()`
    pub fn start_literal(&self) -> String {
        boundary_literal(self.start)
    }

    /// The end boundary as it is substituted for `end_date()`
    pub fn end_literal(&self) -> String {
        boundary_literal(self.end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start_literal(), self.end_literal())
    }
}

fn boundary_literal(at: NaiveDateTime) -> String {
    if at.time() == NaiveTime::MIN {
        at.format("%Y-%m-%d").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parse a window boundary or sample timestamp
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD` and the
/// display form `DD.MM.YYYY`. Date-only inputs mean midnight.
pub fn parse_timestamp(text: &str) -> FormulaResult<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(at);
        }
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }
    Err(FormulaError::InvalidWindow(format!(
        "cannot parse '{}' as a date",
        text
    )))
}

/// The raw result of resolving one cipher
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Scalar(f64),
    /// Numeric readings in storage order; empty when nothing matched
    Series(Vec<f64>),
    /// Numeric readings out of `total` rows in the window; rows without a
    /// numeric reading are counted but not listed
    Readings { values: Vec<f64>, total: usize },
    /// Display string (names, units, date boundaries)
    Text(String),
}

impl ResolvedValue {
    /// Readings that matched `total` rows, collapsing to `Series` when none
    /// of them were empty
    pub fn readings(values: Vec<f64>, total: usize) -> Self {
        if total > values.len() {
            ResolvedValue::Readings { values, total }
        } else {
            ResolvedValue::Series(values)
        }
    }

    /// The numeric samples of a series, `None` for scalars and text
    pub fn samples(&self) -> Option<&[f64]> {
        match self {
            ResolvedValue::Series(values) | ResolvedValue::Readings { values, .. } => Some(values.as_slice()),
            ResolvedValue::Scalar(_) | ResolvedValue::Text(_) => None,
        }
    }

    /// Number of rows the series was drawn from
    pub fn total(&self) -> Option<usize> {
        match self {
            ResolvedValue::Series(values) => Some(values.len()),
            ResolvedValue::Readings { total, .. } => Some(*total),
            ResolvedValue::Scalar(_) | ResolvedValue::Text(_) => None,
        }
    }
}

/// Source of cipher values
///
/// Implementations own their connection discipline; the engine may call
/// `resolve` from several threads at once for sibling ciphers.
pub trait DataResolver: Send + Sync {
    /// Resolve one data or metadata cipher for the given window
    ///
    /// Date boundaries never reach a resolver. An empty result is
    /// `Series(vec![])`, not an error.
    fn resolve(&self, cipher: &Cipher, window: &TimeWindow) -> Result<ResolvedValue, ResolverError>;
}

impl<R: DataResolver + ?Sized> DataResolver for &R {
    fn resolve(&self, cipher: &Cipher, window: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
        (**self).resolve(cipher, window)
    }
}

impl<R: DataResolver + ?Sized> DataResolver for Box<R> {
    fn resolve(&self, cipher: &Cipher, window: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
        (**self).resolve(cipher, window)
    }
}

impl<R: DataResolver + ?Sized> DataResolver for Arc<R> {
    fn resolve(&self, cipher: &Cipher, window: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
        (**self).resolve(cipher, window)
    }
}

/// Resolver that dispatches each cipher to the store registered for its source
///
/// ```rust
/// use report_sheets_formula::{Cipher, DataResolver, ResolvedValue, ResolverError, Source, SourceRouter, TimeWindow};
///
/// struct Constant(f64);
///
/// impl DataResolver for Constant {
///     fn resolve(&self, _: &Cipher, _: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
///         Ok(ResolvedValue::Scalar(self.0))
///     }
/// }
///
/// let router = SourceRouter::new().with_source(Source::Technological, Constant(7.0));
/// let window = TimeWindow::parse("2024-01-01", "2024-01-31").unwrap();
/// let cipher = Cipher::Technological { id: "1".into() };
/// assert_eq!(router.resolve(&cipher, &window), Ok(ResolvedValue::Scalar(7.0)));
/// ```
#[derive(Default, Clone)]
pub struct SourceRouter {
    sources: AHashMap<char, Arc<dyn DataResolver>>,
}

impl SourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the resolver serving one source
    pub fn with_source<R: DataResolver + 'static>(mut self, source: Source, resolver: R) -> Self {
        self.register(source, Arc::new(resolver));
        self
    }

    /// Register (or replace) the resolver serving one source
    pub fn register(&mut self, source: Source, resolver: Arc<dyn DataResolver>) {
        self.sources.insert(source.letter(), resolver);
    }
}

impl fmt::Debug for SourceRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters: Vec<_> = self.sources.keys().collect();
        letters.sort();
        f.debug_struct("SourceRouter").field("sources", &letters).finish()
    }
}

impl DataResolver for SourceRouter {
    fn resolve(&self, cipher: &Cipher, window: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
        let source = cipher
            .source()
            .ok_or_else(|| ResolverError::Unsupported(cipher.to_string()))?;
        match self.sources.get(&source.letter()) {
            Some(resolver) => resolver.resolve(cipher, window),
            None => Err(ResolverError::Unavailable(format!(
                "no {} data source configured",
                source
            ))),
        }
    }
}
