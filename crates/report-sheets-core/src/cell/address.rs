//! Cell position and merge range types

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A cell position in a template grid (e.g., "A1", "B12")
///
/// Positions are 0-based internally. The spreadsheet-style name uses a
/// bijective base-26 column encoding (A-Z, AA, AB, ...) and 1-based rows.
/// Ordering is row-major, which is the order the materializer walks cells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPosition {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., AA=26)
    pub col: u32,
}

impl CellPosition {
    /// Create a new cell position
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a cell position from its spreadsheet-style name
    ///
    /// # Examples
    /// ```
    /// use report_sheets_core::CellPosition;
    ///
    /// let pos = CellPosition::parse("A1").unwrap();
    /// assert_eq!(pos, CellPosition::new(0, 0));
    ///
    /// let pos = CellPosition::parse("AB12").unwrap();
    /// assert_eq!(pos, CellPosition::new(11, 27));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty cell name".into()));
        }

        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());

        if split == 0 {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(&s[..split])?;

        let row_str = &s[split..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "invalid row number in '{}'",
                s
            )));
        }

        // Row numbers run to u32::MAX + 1, one past the largest index
        let row: u64 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // Rows are 1-based in names, 0-based internally
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        let row = u32::try_from(row - 1)
            .map_err(|_| Error::InvalidAddress(format!("row number is too large in '{}'", s)))?;

        Ok(Self { row, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u32) -> String {
        let mut result = String::new();
        let mut n = col as u64 + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u32> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u64 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u64 - 'A' as u64 + 1);
            if col > u32::MAX as u64 + 1 {
                return Err(Error::InvalidAddress(format!(
                    "column '{}' is too large",
                    letters
                )));
            }
        }

        Ok((col - 1) as u32)
    }

    /// Format as a spreadsheet-style name
    pub fn to_name(&self) -> String {
        format!(
            "{}{}",
            Self::column_to_letters(self.col),
            self.row as u64 + 1
        )
    }
}

/// Generate the spreadsheet-style name of a 0-based `(row, col)` position
pub fn generate_cell_name(row: u32, col: u32) -> String {
    CellPosition::new(row, col).to_name()
}

/// Decode a spreadsheet-style name into a 0-based `(row, col)` position
pub fn parse_cell_position(name: &str) -> Result<(u32, u32)> {
    let pos = CellPosition::parse(name)?;
    Ok((pos.row, pos.col))
}

impl fmt::Display for CellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_name())
    }
}

impl FromStr for CellPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for CellPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_name())
    }
}

impl<'de> Deserialize<'de> for CellPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::parse(&name).map_err(serde::de::Error::custom)
    }
}

/// A rectangular merge range, anchored at its top-left cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRange {
    pub top_row: u32,
    pub left_col: u32,
    pub bottom_row: u32,
    pub right_col: u32,
}

impl MergeRange {
    /// Create a new merge range, normalizing so the anchor is top-left
    pub fn new(top_row: u32, left_col: u32, bottom_row: u32, right_col: u32) -> Self {
        Self {
            top_row: top_row.min(bottom_row),
            left_col: left_col.min(right_col),
            bottom_row: top_row.max(bottom_row),
            right_col: left_col.max(right_col),
        }
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidRange(format!("expected 'A1:B2' form, got '{}'", s)))?;
        let start = CellPosition::parse(start)?;
        let end = CellPosition::parse(end)?;
        Ok(Self::new(start.row, start.col, end.row, end.col))
    }

    /// The top-left cell the range is anchored at
    pub fn anchor(&self) -> CellPosition {
        CellPosition::new(self.top_row, self.left_col)
    }

    /// Check if a cell is within this range
    pub fn contains(&self, pos: &CellPosition) -> bool {
        pos.row >= self.top_row
            && pos.row <= self.bottom_row
            && pos.col >= self.left_col
            && pos.col <= self.right_col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.bottom_row - self.top_row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u32 {
        self.right_col - self.left_col + 1
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.top_row <= other.bottom_row
            && self.bottom_row >= other.top_row
            && self.left_col <= other.right_col
            && self.right_col >= other.left_col
    }

    /// Same columns, new row bounds
    pub fn with_rows(&self, top_row: u32, bottom_row: u32) -> Self {
        Self::new(top_row, self.left_col, bottom_row, self.right_col)
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}:{}",
            CellPosition::new(self.top_row, self.left_col),
            CellPosition::new(self.bottom_row, self.right_col)
        )
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for MergeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
