//! Cell data structures for the spreadsheet grid.
//!
//! This module provides the core data types for representing cells:
//! - [`CellValue`] - The computed value of a cell (empty, number, text, or error)
//! - [`Cell`] - A cell with raw input, optional formula, dependencies and value
//! - [`GridSize`] - The fixed dimensions of a grid
//! - [`Grid`] - Dense fixed-size storage where every in-bounds cell exists

use serde::{Deserialize, Serialize};

use super::cell_ref::CellRef;
use super::deps::extract_dependencies;
use super::error::ErrorKind;
use super::format::format_value;

/// The computed value of a cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Error(ErrorKind),
}

impl CellValue {
    /// Numeric view used by aggregates: numbers, and text that parses as a
    /// finite number. Everything else has no numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s),
            CellValue::Empty | CellValue::Error(_) => None,
        }
    }

    /// Numeric coercion used by arithmetic and comparisons: non-numeric
    /// values count as `0`.
    pub fn to_number(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

/// Parse numeric-looking text (`"42"`, `" 3.5 "`, `"-1"`). Non-finite
/// spellings such as `"inf"` or `"NaN"` are not numbers.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A cell in the spreadsheet grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Exactly what the user typed.
    pub raw_input: String,
    /// The input without its leading `=`; present iff `raw_input` starts with `=`.
    pub formula: Option<String>,
    /// Cells referenced by `formula`, ranges expanded.
    pub depends_on: Vec<CellRef>,
    pub value: CellValue,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell {
            raw_input: String::new(),
            formula: None,
            depends_on: vec![],
            value: CellValue::Empty,
        }
    }

    /// Build a cell from user input.
    /// - Starts with '=' -> formula (without the '='), value pending evaluation
    /// - Blank -> Empty value
    /// - Otherwise -> literal text, coerced to a number only when used in math
    pub fn from_input(input: &str, size: GridSize) -> Cell {
        if let Some(formula) = input.strip_prefix('=') {
            return Cell {
                raw_input: input.to_string(),
                formula: Some(formula.to_string()),
                depends_on: extract_dependencies(formula, size),
                value: CellValue::Empty,
            };
        }

        let value = if input.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(input.to_string())
        };
        Cell {
            raw_input: input.to_string(),
            formula: None,
            depends_on: vec![],
            value,
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_input.is_empty()
    }

    /// Whether this cell's formula references `cell` (directly or inside a range).
    pub fn references(&self, cell: &CellRef) -> bool {
        self.depends_on.contains(cell)
    }

    /// What the UI shows; always derived from `value`.
    pub fn display(&self) -> String {
        format_value(&self.value)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::new_empty()
    }
}

/// Fixed grid dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub const DEFAULT_ROWS: usize = 10;
    pub const DEFAULT_COLS: usize = 10;
    pub const MAX_ROWS: usize = 1_000;
    /// Through column `IV`.
    pub const MAX_COLS: usize = 256;

    /// Clamped to `1..=MAX_ROWS` rows and `1..=MAX_COLS` columns.
    pub fn new(rows: usize, cols: usize) -> GridSize {
        GridSize {
            rows: rows.clamp(1, Self::MAX_ROWS),
            cols: cols.clamp(1, Self::MAX_COLS),
        }
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    /// The bottom-right cell.
    pub fn last_cell(&self) -> CellRef {
        CellRef::new(self.rows - 1, self.cols - 1)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize::new(Self::DEFAULT_ROWS, Self::DEFAULT_COLS)
    }
}

/// Fixed-size grid storage. Every in-bounds coordinate has a cell, so
/// lookups only need a bounds check.
#[derive(Clone, Debug)]
pub struct Grid {
    size: GridSize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: GridSize) -> Grid {
        let size = GridSize::new(size.rows, size.cols);
        Grid {
            size,
            cells: vec![Cell::new_empty(); size.cell_count()],
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn contains(&self, cell_ref: &CellRef) -> bool {
        self.size.contains(cell_ref)
    }

    fn index(&self, cell_ref: &CellRef) -> Option<usize> {
        self.contains(cell_ref)
            .then(|| cell_ref.row * self.size.cols + cell_ref.col)
    }

    fn cell_ref_at(&self, index: usize) -> CellRef {
        CellRef::new(index / self.size.cols, index % self.size.cols)
    }

    /// The cell at `cell_ref`, or None when out of bounds.
    pub fn get(&self, cell_ref: &CellRef) -> Option<&Cell> {
        self.index(cell_ref).map(|i| &self.cells[i])
    }

    /// Store raw input. Formula cells keep an empty value until evaluated.
    /// Returns false when `cell_ref` is out of bounds.
    pub fn set_raw(&mut self, cell_ref: &CellRef, raw_input: &str) -> bool {
        let size = self.size;
        match self.index(cell_ref) {
            Some(i) => {
                self.cells[i] = Cell::from_input(raw_input, size);
                true
            }
            None => false,
        }
    }

    /// Replace the computed value of a cell. Returns true if it changed.
    pub fn set_value(&mut self, cell_ref: &CellRef, value: CellValue) -> bool {
        let Some(i) = self.index(cell_ref) else {
            return false;
        };
        let cell = &mut self.cells[i];
        if cell.value == value {
            return false;
        }
        cell.value = value;
        true
    }

    /// Reset every cell to empty.
    pub fn clear_all(&mut self) {
        self.cells.fill(Cell::new_empty());
    }

    /// All cells, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (self.cell_ref_at(i), cell))
    }

    /// Coordinates of every formula cell, row-major.
    pub fn formula_cells(&self) -> Vec<CellRef> {
        self.iter()
            .filter(|(_, cell)| cell.is_formula())
            .map(|(cell_ref, _)| cell_ref)
            .collect()
    }

    /// Cells whose formulas reference `changed`, row-major.
    pub fn dependents_of(&self, changed: &CellRef) -> Vec<CellRef> {
        self.iter()
            .filter(|(_, cell)| cell.references(changed))
            .map(|(cell_ref, _)| cell_ref)
            .collect()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(GridSize::default())
    }
}
