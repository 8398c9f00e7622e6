//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style labels
//! (e.g., "A1", "C3", "AA100") and zero-indexed row/column coordinates,
//! plus enumeration of rectangular ranges.
//!
//! # Examples
//!
//! ```
//! use sheetsim_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 1); // 0-indexed
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::error::InvalidLabel;

/// A reference to a cell by row and column indices (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "B2", "AA10").
    /// Returns None if the input is not `LETTERS DIGITS` or the row is 0.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = label_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let col = Self::letters_to_col(letters)?;
        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(CellRef::new(row, col))
    }

    /// Convert spreadsheet-style letters back to a column index (A -> 0, Z -> 25, AA -> 26).
    pub fn letters_to_col(letters: &str) -> Option<usize> {
        if letters.is_empty() {
            return None;
        }
        let mut col_acc = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            if !c.is_ascii_uppercase() {
                return None;
            }
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        col_acc.checked_sub(1)
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Label for this cell, e.g. `C3`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl std::str::FromStr for CellRef {
    type Err = InvalidLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| InvalidLabel(s.to_string()))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

fn label_re() -> &'static Regex {
    static LABEL_RE: OnceLock<Regex> = OnceLock::new();
    LABEL_RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("label regex must compile")
    })
}

/// An inclusive rectangular span of cells, `start:end`.
///
/// `start` is taken as the top-left corner and `end` as the bottom-right.
/// A reversed range (e.g. `A5:A1`) is not reordered: it covers no cells.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> CellRange {
        CellRange { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start.row > self.end.row || self.start.col > self.end.col
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        !self.is_empty()
            && (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    /// Iterate the covered cells row-major: rows low to high, then columns low to high.
    pub fn cells(&self) -> RangeCells {
        RangeCells {
            range: *self,
            next: (!self.is_empty()).then_some(self.start),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Row-major iterator over a [`CellRange`].
#[derive(Clone, Debug)]
pub struct RangeCells {
    range: CellRange,
    next: Option<CellRef>,
}

impl Iterator for RangeCells {
    type Item = CellRef;

    fn next(&mut self) -> Option<CellRef> {
        let current = self.next?;
        self.next = if current.col < self.range.end.col {
            Some(CellRef::new(current.row, current.col + 1))
        } else if current.row < self.range.end.row {
            Some(CellRef::new(current.row + 1, self.range.start.col))
        } else {
            None
        };
        Some(current)
    }
}

/// Enumerate every label in the inclusive range `start:end`, row-major.
pub fn range_between(start: &str, end: &str) -> Result<Vec<String>, InvalidLabel> {
    let start: CellRef = start.parse()?;
    let end: CellRef = end.parse()?;
    Ok(CellRange::new(start, end)
        .cells()
        .map(|cell| cell.to_string())
        .collect())
}
