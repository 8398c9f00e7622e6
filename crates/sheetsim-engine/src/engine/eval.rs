//! Formula evaluation against a [`Grid`].
//!
//! Referenced formula cells are evaluated recursively rather than read from
//! their stored value, so a result never depends on evaluation order. Each
//! top-level evaluation memoizes finished sub-results, failures included,
//! for its own duration only; nothing is cached across calls.
//!
//! Error policy: a referenced cell whose formula fails reads as `0`, except
//! for [`EvalError::CircularReference`] and [`EvalError::TooDeep`], which
//! always abort the whole chain.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::ast::{AggregateArg, BinaryOp, Expr, UnaryOp};
use super::cell::{CellValue, Grid, parse_number};
use super::cell_ref::{CellRange, CellRef};
use super::cycle::Visiting;
use super::error::{EvalError, EvalResult};
use super::format::format_number;
use super::parse::parse_formula;

/// The result of evaluating a formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn display(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => CellValue::Number(n),
            Value::Text(s) => CellValue::Text(s),
        }
    }
}

/// Deepest allowed recursion through expressions and referenced cells.
const MAX_EVAL_DEPTH: usize = 512;

/// Evaluates formulas with read access to a grid.
pub struct Evaluator<'g> {
    grid: &'g Grid,
    memo: HashMap<CellRef, EvalResult<Value>>,
    depth: usize,
}

impl<'g> Evaluator<'g> {
    pub fn new(grid: &'g Grid) -> Self {
        Evaluator {
            grid,
            memo: HashMap::new(),
            depth: 0,
        }
    }

    /// Evaluate the cell at `cell_ref`. Literal cells evaluate to their own value.
    pub fn evaluate_cell(&mut self, cell_ref: CellRef) -> EvalResult<Value> {
        self.eval_cell(cell_ref, None)
    }

    /// Evaluate a formula that does not live in the grid. A leading `=` is optional.
    pub fn evaluate_formula(&mut self, formula: &str) -> EvalResult<Value> {
        let formula = formula.strip_prefix('=').unwrap_or(formula);
        let expr = parse_formula(formula)?;
        let value = self.eval_value(&expr, None)?;
        ensure_finite(value)
    }

    fn eval_cell(&mut self, cell_ref: CellRef, parent: Option<&Visiting<'_>>) -> EvalResult<Value> {
        let visiting = Visiting::enter(parent, cell_ref)?;
        if let Some(result) = self.memo.get(&cell_ref) {
            return result.clone();
        }

        let grid = self.grid;
        let Some(cell) = grid.get(&cell_ref) else {
            return Ok(Value::Number(0.0));
        };
        let Some(formula) = cell.formula.as_deref() else {
            return Ok(match &cell.value {
                CellValue::Text(s) => Value::Text(s.clone()),
                other => Value::Number(other.to_number()),
            });
        };

        trace!(cell = %cell_ref, formula, "evaluating");
        let result = parse_formula(formula)
            .and_then(|expr| self.eval_value(&expr, Some(&visiting)))
            .and_then(ensure_finite);
        // Aborting errors depend on the path that reached the cell.
        if !matches!(&result, Err(err) if err.aborts_chain()) {
            self.memo.insert(cell_ref, result.clone());
        }
        result
    }

    /// Read a referenced cell. None means the reference has no value: out
    /// of the grid, empty, or a formula that failed without aborting the chain.
    fn read_ref(&mut self, cell_ref: CellRef, visiting: Option<&Visiting<'_>>) -> EvalResult<Option<Value>> {
        let grid = self.grid;
        let Some(cell) = grid.get(&cell_ref) else {
            return Ok(None);
        };
        if cell.is_formula() {
            return match self.eval_cell(cell_ref, visiting) {
                Ok(value) => Ok(Some(value)),
                Err(err) if err.aborts_chain() => Err(err),
                Err(err) => {
                    debug!(cell = %cell_ref, error = %err, "referenced formula failed, reading as 0");
                    Ok(None)
                }
            };
        }
        Ok(match &cell.value {
            CellValue::Number(n) => Some(Value::Number(*n)),
            CellValue::Text(s) => Some(Value::Text(s.clone())),
            CellValue::Empty | CellValue::Error(_) => None,
        })
    }

    /// Run `f` one level deeper, failing once the recursion gets too deep.
    fn deeper<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn eval_value(&mut self, expr: &Expr, visiting: Option<&Visiting<'_>>) -> EvalResult<Value> {
        self.deeper(|this| this.eval_value_inner(expr, visiting))
    }

    fn eval_value_inner(&mut self, expr: &Expr, visiting: Option<&Visiting<'_>>) -> EvalResult<Value> {
        match expr {
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::CellRef(cell_ref) => Ok(self
                .read_ref(*cell_ref, visiting)?
                .unwrap_or(Value::Number(0.0))),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_condition(condition, visiting)? {
                    self.eval_value(then_branch, visiting)
                } else {
                    self.eval_value(else_branch, visiting)
                }
            }
            _ => Ok(Value::Number(self.eval_number(expr, visiting)?)),
        }
    }

    fn eval_number(&mut self, expr: &Expr, visiting: Option<&Visiting<'_>>) -> EvalResult<f64> {
        self.deeper(|this| this.eval_number_inner(expr, visiting))
    }

    fn eval_number_inner(&mut self, expr: &Expr, visiting: Option<&Visiting<'_>>) -> EvalResult<f64> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Text(s) => Err(EvalError::TextInArithmetic(s.clone())),
            Expr::CellRef(cell_ref) => Ok(match self.read_ref(*cell_ref, visiting)? {
                Some(Value::Number(n)) => n,
                Some(Value::Text(s)) => parse_number(&s).unwrap_or(0.0),
                None => 0.0,
            }),
            Expr::Unary { op, operand } => {
                let n = self.eval_number(operand, visiting)?;
                Ok(match op {
                    UnaryOp::Negate => -n,
                    UnaryOp::Plus => n,
                })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval_number(left, visiting)?;
                let r = self.eval_number(right, visiting)?;
                let n = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Subtract => l - r,
                    BinaryOp::Multiply => l * r,
                    BinaryOp::Divide if r == 0.0 => return Err(EvalError::DivisionByZero),
                    BinaryOp::Divide => l / r,
                };
                finite(n)
            }
            Expr::Compare { .. } => Ok(if self.eval_condition(expr, visiting)? {
                1.0
            } else {
                0.0
            }),
            Expr::Aggregate { func, args } => {
                let mut values = Vec::new();
                for arg in args {
                    match arg {
                        AggregateArg::Range(range) => {
                            for cell_ref in self.clip(range).cells() {
                                values.extend(self.read_numeric(cell_ref, visiting)?);
                            }
                        }
                        AggregateArg::Cell(cell_ref) => {
                            values.extend(self.read_numeric(*cell_ref, visiting)?);
                        }
                        AggregateArg::Expr(expr) => values.push(self.eval_number(expr, visiting)?),
                    }
                }
                finite(func.apply(&values))
            }
            Expr::Conditional { .. } => match self.eval_value(expr, visiting)? {
                Value::Number(n) => Ok(n),
                Value::Text(s) => Err(EvalError::TextInArithmetic(s)),
            },
        }
    }

    /// Conditions compare numerically; without a comparison, non-zero is true.
    fn eval_condition(&mut self, expr: &Expr, visiting: Option<&Visiting<'_>>) -> EvalResult<bool> {
        match expr {
            Expr::Compare { op, left, right } => {
                let l = self.eval_operand(left, visiting)?;
                let r = self.eval_operand(right, visiting)?;
                Ok(op.apply(l, r))
            }
            _ => Ok(self.eval_operand(expr, visiting)? != 0.0),
        }
    }

    /// A comparison operand: like arithmetic, but text coerces instead of failing.
    fn eval_operand(&mut self, expr: &Expr, visiting: Option<&Visiting<'_>>) -> EvalResult<f64> {
        match self.eval_value(expr, visiting)? {
            Value::Number(n) => finite(n),
            Value::Text(s) => Ok(parse_number(&s).unwrap_or(0.0)),
        }
    }

    /// Aggregates only count cells that hold a number or numeric-looking text.
    fn read_numeric(&mut self, cell_ref: CellRef, visiting: Option<&Visiting<'_>>) -> EvalResult<Option<f64>> {
        Ok(match self.read_ref(cell_ref, visiting)? {
            Some(Value::Number(n)) => Some(n),
            Some(Value::Text(s)) => parse_number(&s),
            None => None,
        })
    }

    /// Restrict a range to the grid; cells beyond it contribute nothing.
    fn clip(&self, range: &CellRange) -> CellRange {
        let last = self.grid.size().last_cell();
        CellRange::new(
            range.start,
            CellRef::new(range.end.row.min(last.row), range.end.col.min(last.col)),
        )
    }
}

fn ensure_finite(value: Value) -> EvalResult<Value> {
    match value {
        Value::Number(n) => finite(n).map(Value::Number),
        other => Ok(other),
    }
}

fn finite(n: f64) -> EvalResult<f64> {
    if n.is_finite() { Ok(n) } else { Err(EvalError::NonFinite) }
}
