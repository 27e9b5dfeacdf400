//! Cipher grammar and classifier
//!
//! A cipher is a fixed-syntax reference to external data inside a formula:
//!
//! ```text
//! Technological := "T" Digits
//! Analytical    := "L" Digits "." Digits "." Ident ["." ("P"|"Q")]
//! XLine         := "X" Digits
//! NameQuery     := "getNameProd" "(" ("L"|"T"|"X") Digits ")"
//! UnitQuery     := "getUnitProd" "(" ("T"|"X") Digits ")"
//! DateBoundary  := "start_date()" | "end_date()"
//! ```
//!
//! Classification runs the patterns in priority order: metadata queries,
//! then date boundaries, then data references. A span claimed by an earlier
//! pattern is never re-matched by a later one, so the argument of
//! `getNameProd(T12)` is not also read as a technological cipher.

use lazy_regex::{regex, Regex};
use std::fmt;
use std::ops::Range;

use crate::error::{FormulaError, FormulaResult};

/// Which store a cipher reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Laboratory (analytical) data, letter `L`
    Laboratory,
    /// Process (technological) data, letter `T`
    Technological,
    /// Manually entered data, letter `X`
    XLine,
}

impl Source {
    /// The letter a cipher of this source starts with
    pub fn letter(&self) -> char {
        match self {
            Source::Laboratory => 'L',
            Source::Technological => 'T',
            Source::XLine => 'X',
        }
    }

    /// Parse a source letter
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'L' => Some(Source::Laboratory),
            'T' => Some(Source::Technological),
            'X' => Some(Source::XLine),
            _ => None,
        }
    }

    /// Human-readable name, used in log and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Source::Laboratory => "laboratory",
            Source::Technological => "technological",
            Source::XLine => "x-line",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which analytical reading to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// `P`: element concentration
    Concentration,
    /// `Q`: tonnage
    Tonnage,
}

impl Metric {
    pub fn letter(&self) -> char {
        match self {
            Metric::Concentration => 'P',
            Metric::Tonnage => 'Q',
        }
    }
}

/// A classified data reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cipher {
    Technological {
        id: String,
    },
    Analytical {
        product: String,
        level: String,
        element: String,
        metric: Option<Metric>,
    },
    XLine {
        id: String,
    },
    NameQuery {
        source: Source,
        id: String,
    },
    UnitQuery {
        source: Source,
        id: String,
    },
    StartDate,
    EndDate,
}

impl Cipher {
    /// The store this cipher reads from; `None` for date boundaries
    pub fn source(&self) -> Option<Source> {
        match self {
            Cipher::Technological { .. } => Some(Source::Technological),
            Cipher::Analytical { .. } => Some(Source::Laboratory),
            Cipher::XLine { .. } => Some(Source::XLine),
            Cipher::NameQuery { source, .. } | Cipher::UnitQuery { source, .. } => Some(*source),
            Cipher::StartDate | Cipher::EndDate => None,
        }
    }

    /// Check if this cipher resolves to a display string rather than samples
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Cipher::NameQuery { .. } | Cipher::UnitQuery { .. } | Cipher::StartDate | Cipher::EndDate
        )
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cipher::Technological { id } => write!(f, "T{}", id),
            Cipher::Analytical {
                product,
                level,
                element,
                metric,
            } => {
                write!(f, "L{}.{}.{}", product, level, element)?;
                if let Some(metric) = metric {
                    write!(f, ".{}", metric.letter())?;
                }
                Ok(())
            }
            Cipher::XLine { id } => write!(f, "X{}", id),
            Cipher::NameQuery { source, id } => write!(f, "getNameProd({}{})", source.letter(), id),
            Cipher::UnitQuery { source, id } => write!(f, "getUnitProd({}{})", source.letter(), id),
            Cipher::StartDate => f.write_str("start_date()"),
            Cipher::EndDate => f.write_str("end_date()"),
        }
    }
}

/// One cipher occurrence found in a formula body
#[derive(Debug, Clone, PartialEq)]
pub struct CipherToken {
    /// Byte span of the occurrence in the formula body
    pub span: Range<usize>,
    /// The occurrence as written
    pub text: String,
    /// The classified cipher, or why it is invalid
    pub cipher: FormulaResult<Cipher>,
}

type Rule = (&'static Regex, fn(&lazy_regex::regex::Captures<'_>) -> FormulaResult<Cipher>);

/// Find every cipher occurrence in a formula body (the text after `=`)
///
/// Occurrences are returned in textual order. Repeated ciphers appear once
/// per occurrence.
pub fn classify(body: &str) -> Vec<CipherToken> {
    let rules: [Rule; 7] = [
        (regex!(r"getNameProd\(([^()]*)\)"), |caps| {
            metadata_query(&caps[1], "getNameProd", &[Source::Laboratory, Source::Technological, Source::XLine])
                .map(|(source, id)| Cipher::NameQuery { source, id })
        }),
        (regex!(r"getUnitProd\(([^()]*)\)"), |caps| {
            metadata_query(&caps[1], "getUnitProd", &[Source::Technological, Source::XLine])
                .map(|(source, id)| Cipher::UnitQuery { source, id })
        }),
        (regex!(r"\bstart_date\(\s*\)"), |_| Ok(Cipher::StartDate)),
        (regex!(r"\bend_date\(\s*\)"), |_| Ok(Cipher::EndDate)),
        (regex!(r"\bL\d\w*(?:\.\w+)*"), |caps| analytical(&caps[0])),
        (regex!(r"\bT\w+"), |caps| {
            digit_id(&caps[0]).map(|id| Cipher::Technological { id })
        }),
        (regex!(r"\bX\w+"), |caps| digit_id(&caps[0]).map(|id| Cipher::XLine { id })),
    ];

    let mut tokens: Vec<CipherToken> = Vec::new();
    for (pattern, build) in rules.iter() {
        for caps in pattern.captures_iter(body) {
            let Some(whole) = caps.get(0) else { continue };
            let span = whole.range();
            if tokens.iter().any(|t| overlaps(&t.span, &span)) {
                continue;
            }
            tokens.push(CipherToken {
                span,
                text: whole.as_str().to_string(),
                cipher: build(&caps),
            });
        }
    }

    tokens.sort_by_key(|t| t.span.start);
    tokens
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn digit_id(token: &str) -> FormulaResult<String> {
    let id = &token[1..];
    if is_digits(id) {
        Ok(id.to_string())
    } else {
        Err(FormulaError::InvalidCipherSyntax(format!(
            "{} must be followed by digits only",
            token
        )))
    }
}

fn metadata_query(
    arg: &str,
    function: &str,
    allowed: &[Source],
) -> FormulaResult<(Source, String)> {
    let arg = arg.trim();
    let mut chars = arg.chars();
    let source = chars
        .next()
        .and_then(Source::from_letter)
        .filter(|s| allowed.contains(s));
    match source {
        Some(source) if is_digits(chars.as_str()) => Ok((source, chars.as_str().to_string())),
        _ => {
            let letters: String = allowed.iter().map(Source::letter).collect();
            Err(FormulaError::InvalidCipherSyntax(format!(
                "{} expects one of {} followed by digits, got '{}'",
                function, letters, arg
            )))
        }
    }
}

fn analytical(token: &str) -> FormulaResult<Cipher> {
    let segments: Vec<&str> = token[1..].split('.').collect();
    let invalid = |reason: &str| {
        Err(FormulaError::InvalidCipherSyntax(format!(
            "{} {}",
            token, reason
        )))
    };

    if segments.len() < 3 {
        return invalid("needs product, level and element");
    }
    if segments.len() > 4 {
        return invalid("has too many segments");
    }
    if !is_digits(segments[0]) || !is_digits(segments[1]) {
        return invalid("must have numeric product and level");
    }

    let metric = match segments.get(3) {
        None => None,
        Some(&"P") => Some(Metric::Concentration),
        Some(&"Q") => Some(Metric::Tonnage),
        Some(_) => return invalid("has an unknown metric, expected P or Q"),
    };

    Ok(Cipher::Analytical {
        product: segments[0].to_string(),
        level: segments[1].to_string(),
        element: segments[2].to_string(),
        metric,
    })
}
