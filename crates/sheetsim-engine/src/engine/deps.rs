//! Dependency extraction from formulas.
//!
//! Dependencies are collected from the parsed formula, so whatever the
//! evaluator can read (`A1`, `a 1`, `B2:C5`) is exactly what the dependency
//! re-evaluator refreshes when a cell changes.
//!
//! Handles:
//! - Simple cell references, in any spelling the parser accepts
//! - Ranges: `SUM(A1:B5)` depends on every cell of the rectangle
//! - References inside string literals are plain text and never count

use super::ast::{AggregateArg, Expr};
use super::cell::GridSize;
use super::cell_ref::{CellRange, CellRef};
use super::parse::parse_formula;

/// Extract all in-grid cell references from a formula as dependencies.
///
/// A formula that does not parse reads nothing and has no dependencies.
/// Ranges are expanded corner-insensitively and clipped to `size`, so a
/// reversed range still registers its cells. That over-approximates what
/// the evaluator reads, which only costs an extra re-evaluation.
pub fn extract_dependencies(formula: &str, size: GridSize) -> Vec<CellRef> {
    let mut deps = Vec::new();
    if let Ok(expr) = parse_formula(formula) {
        collect(&expr, size, &mut deps);
    }
    deps
}

fn collect(expr: &Expr, size: GridSize, deps: &mut Vec<CellRef>) {
    match expr {
        Expr::Number(_) | Expr::Text(_) => {}
        Expr::CellRef(cell) => push(*cell, size, deps),
        Expr::Unary { operand, .. } => collect(operand, size, deps),
        Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
            collect(left, size, deps);
            collect(right, size, deps);
        }
        Expr::Aggregate { args, .. } => {
            for arg in args {
                match arg {
                    AggregateArg::Range(range) => push_range(range, size, deps),
                    AggregateArg::Cell(cell) => push(*cell, size, deps),
                    AggregateArg::Expr(expr) => collect(expr, size, deps),
                }
            }
        }
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            collect(condition, size, deps);
            collect(then_branch, size, deps);
            collect(else_branch, size, deps);
        }
    }
}

fn push(cell: CellRef, size: GridSize, deps: &mut Vec<CellRef>) {
    if size.contains(&cell) && !deps.contains(&cell) {
        deps.push(cell);
    }
}

fn push_range(range: &CellRange, size: GridSize, deps: &mut Vec<CellRef>) {
    let (start, end) = (range.start, range.end);
    let min_row = start.row.min(end.row);
    let min_col = start.col.min(end.col);
    if min_row >= size.rows || min_col >= size.cols {
        return;
    }
    let max_row = start.row.max(end.row).min(size.rows - 1);
    let max_col = start.col.max(end.col).min(size.cols - 1);

    for row in min_row..=max_row {
        for col in min_col..=max_col {
            push(CellRef::new(row, col), size, deps);
        }
    }
}
