//! Formula abstract syntax tree.

use super::cell_ref::{CellRange, CellRef};

/// Formula expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Quoted string literal
    Text(String),
    /// Single cell reference
    CellRef(CellRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Arithmetic
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison; only produced for `IF` conditions
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `SUM`, `AVERAGE`, `MAX`, `MIN`
    Aggregate {
        func: AggregateFn,
        args: Vec<AggregateArg>,
    },
    /// `IF(condition, then, else)`
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CompareOp {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Equal => left == right,
            CompareOp::NotEqual => left != right,
            CompareOp::LessThan => left < right,
            CompareOp::LessEqual => left <= right,
            CompareOp::GreaterThan => left > right,
            CompareOp::GreaterEqual => left >= right,
        }
    }
}

/// One argument of an aggregate function.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    Range(CellRange),
    Cell(CellRef),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Sum,
    Average,
    Max,
    Min,
}

impl AggregateFn {
    pub fn from_name(name: &str) -> Option<AggregateFn> {
        match name {
            "SUM" => Some(AggregateFn::Sum),
            "AVERAGE" => Some(AggregateFn::Average),
            "MAX" => Some(AggregateFn::Max),
            "MIN" => Some(AggregateFn::Min),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregateFn::Sum => "SUM",
            AggregateFn::Average => "AVERAGE",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
        }
    }

    /// Reduce the collected numbers. No numbers at all gives `0` for every function.
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            AggregateFn::Sum => values.iter().sum(),
            AggregateFn::Average => values.iter().sum::<f64>() / values.len() as f64,
            AggregateFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregateFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}
