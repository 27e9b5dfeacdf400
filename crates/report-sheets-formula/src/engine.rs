//! Cell formula engine
//!
//! Drives one formula through classification, resolution and assembly:
//!
//! ```text
//! Literal ──────────────────────────────────────────────▶ Single(text)
//! Formula ─▶ classify ─▶ resolve (per cipher) ─▶ assemble ─▶ CellResult
//! ```
//!
//! A failure for one cipher never aborts its siblings; it is carried into the
//! expression as an inline error marker.

use report_sheets_core::CellResult;
use tracing::{debug, debug_span, warn};

use crate::assembler::assemble;
use crate::cipher::{classify, Cipher, CipherToken};
use crate::error::{FormulaError, FormulaResult, ResolverError};
use crate::resolver::{DataResolver, ResolvedValue, TimeWindow};

/// How sibling ciphers of one formula are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// One after another on the calling thread
    #[default]
    Sequential,
    /// Scoped worker threads, each taking a contiguous run of occurrences
    Concurrent,
}

/// Worker threads per formula in concurrent mode, unless configured
pub const DEFAULT_MAX_THREADS: usize = 8;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub resolution: ResolutionMode,
    /// Upper bound on worker threads per formula (at least one is used)
    pub max_threads: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            resolution: ResolutionMode::Sequential,
            max_threads: DEFAULT_MAX_THREADS,
        }
    }
}

impl EngineOptions {
    pub fn concurrent() -> Self {
        Self {
            resolution: ResolutionMode::Concurrent,
            ..Self::default()
        }
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }
}

/// Evaluates cell formulas against a data resolver
#[derive(Debug, Clone)]
pub struct FormulaEngine<R> {
    resolver: R,
    options: EngineOptions,
}

impl<R: DataResolver> FormulaEngine<R> {
    /// Create an engine with default options
    pub fn new(resolver: R) -> Self {
        Self::with_options(resolver, EngineOptions::default())
    }

    /// Create an engine with custom options
    pub fn with_options(resolver: R, options: EngineOptions) -> Self {
        Self { resolver, options }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Evaluate one cell value for the given window
    ///
    /// Text not starting with `=` is a literal and comes back unchanged.
    ///
    /// # Example
    /// ```rust
    /// use report_sheets_formula::{Cipher, DataResolver, FormulaEngine, ResolvedValue, ResolverError, TimeWindow};
    /// use report_sheets_core::CellResult;
    ///
    /// struct NoData;
    ///
    /// impl DataResolver for NoData {
    ///     fn resolve(&self, _: &Cipher, _: &TimeWindow) -> Result<ResolvedValue, ResolverError> {
    ///         Ok(ResolvedValue::Series(vec![]))
    ///     }
    /// }
    ///
    /// let engine = FormulaEngine::new(NoData);
    /// let window = TimeWindow::parse("2024-01-01", "2024-01-31").unwrap();
    /// assert_eq!(engine.evaluate("=2+2", &window), CellResult::number(4.0));
    /// assert_eq!(engine.evaluate("Total", &window), CellResult::text("Total"));
    /// ```
    pub fn evaluate(&self, formula: &str, window: &TimeWindow) -> CellResult {
        let Some(body) = formula.strip_prefix('=') else {
            return CellResult::text(formula);
        };

        let span = debug_span!("evaluate", formula);
        let _enter = span.enter();

        let tokens = classify(body);
        debug!(ciphers = tokens.len(), "classified formula");

        let resolved = self.resolve_all(&tokens, window);
        let result = assemble(body, &tokens, &resolved);
        if let CellResult::Error(message) = &result {
            warn!(%message, "formula evaluated to an error");
        }
        result
    }

    fn resolve_all(&self, tokens: &[CipherToken], window: &TimeWindow) -> Vec<FormulaResult<ResolvedValue>> {
        if self.options.resolution == ResolutionMode::Sequential || tokens.len() < 2 {
            return tokens.iter().map(|t| self.resolve_token(t, window)).collect();
        }

        let workers = self.options.max_threads.clamp(1, tokens.len());
        let chunk_size = (tokens.len() + workers - 1) / workers;
        debug!(workers, chunk_size, "resolving ciphers concurrently");

        std::thread::scope(|scope| {
            let handles: Vec<_> = tokens
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle = scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|token| self.resolve_token(token, window))
                            .collect::<Vec<_>>()
                    });
                    (chunk.len(), handle)
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|(len, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        vec![
                            Err(FormulaError::Resolver(ResolverError::Unavailable(
                                "resolver thread panicked".into(),
                            )));
                            len
                        ]
                    })
                })
                .collect()
        })
    }

    fn resolve_token(&self, token: &CipherToken, window: &TimeWindow) -> FormulaResult<ResolvedValue> {
        let cipher = match &token.cipher {
            Ok(cipher) => cipher,
            Err(e) => {
                warn!(cipher = %token.text, error = %e, "invalid cipher");
                return Err(e.clone());
            }
        };

        let resolved = match cipher {
            Cipher::StartDate => Ok(ResolvedValue::Text(window.start_literal())),
            Cipher::EndDate => Ok(ResolvedValue::Text(window.end_literal())),
            _ => self.resolver.resolve(cipher, window).map_err(FormulaError::from),
        };

        match &resolved {
            Ok(value) => match (value.samples(), value.total()) {
                (Some(samples), Some(total)) => {
                    debug!(%cipher, samples = samples.len(), total, "resolved cipher")
                }
                _ => debug!(%cipher, "resolved cipher"),
            },
            Err(e) => warn!(%cipher, error = %e, "cipher resolution failed"),
        }
        resolved
    }
}
