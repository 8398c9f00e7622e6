//! Spreadsheet engine API.
//!
//! This module provides the core computation engine for the spreadsheet:
//!
//! - [`Cell`], [`CellValue`], [`Grid`], [`GridSize`] - Data structures for cell storage
//! - [`CellRef`], [`CellRange`] - Cell reference parsing (A1 notation ↔ row/col indices)
//! - [`parse_formula`] - Tokenize and parse a formula into an [`Expr`]
//! - [`Evaluator`] - Evaluate formulas against a grid
//! - [`Visiting`] - Circular reference detection during evaluation
//! - [`extract_dependencies`] - Parse formula dependencies
//! - [`Snapshot`] - Serializable grid state
//! - [`format_value`] - Format values for display

mod ast;
mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod error;
mod eval;
mod format;
mod parse;
mod snapshot;

pub use ast::{AggregateArg, AggregateFn, BinaryOp, CompareOp, Expr, UnaryOp};
pub use cell::{Cell, CellValue, Grid, GridSize, parse_number};
pub use cell_ref::{CellRange, CellRef, RangeCells, range_between};
pub use cycle::Visiting;
pub use deps::extract_dependencies;
pub use error::{ErrorKind, EvalError, EvalResult, InvalidLabel};
pub use eval::{Evaluator, Value};
pub use format::{ERROR_TOKEN, format_number, format_value};
pub use parse::parse_formula;
pub use snapshot::{CellSnapshot, Snapshot, SnapshotValue};
