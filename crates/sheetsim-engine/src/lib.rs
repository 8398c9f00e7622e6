//! Formula engine for a small fixed-size spreadsheet.
//!
//! Cells hold raw input; inputs starting with `=` are formulas over the
//! grid. See [`engine`] for the building blocks.

pub mod engine;
