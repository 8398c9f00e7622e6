//! Error types for formula evaluation.

use thiserror::Error;

use super::cell_ref::CellRef;

/// A label that does not have the `LETTERS DIGITS` shape (e.g. `A1`, `AB12`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell label '{0}'")]
pub struct InvalidLabel(pub String);

/// Errors raised while parsing or evaluating a single formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A cell was revisited while it was still being evaluated.
    #[error("circular reference through {0}")]
    CircularReference(CellRef),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("wrong number of arguments for {function}: expected {expected}, got {actual}")]
    Arity {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Text reached a position that needs a number, e.g. `"a" + 1`.
    #[error("text {0:?} used in arithmetic")]
    TextInArithmetic(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,

    /// Too many nested expressions or referenced cells to evaluate.
    #[error("formula chain is too deep to evaluate")]
    TooDeep,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::CircularReference(_) | EvalError::TooDeep => ErrorKind::CircularReference,
            EvalError::Syntax(_) | EvalError::UnknownFunction(_) | EvalError::TextInArithmetic(_) => {
                ErrorKind::FormulaSyntax
            }
            EvalError::Arity { .. } => ErrorKind::InvalidArity,
            EvalError::DivisionByZero | EvalError::NonFinite => ErrorKind::DivisionByZeroOrNonFinite,
        }
    }

    /// Whether the error must abort the whole evaluation chain instead of
    /// degrading to `0` at the referencing cell.
    pub fn aborts_chain(&self) -> bool {
        matches!(self, EvalError::CircularReference(_) | EvalError::TooDeep)
    }
}

/// The error state stored in a cell after a failed evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CircularReference,
    FormulaSyntax,
    InvalidArity,
    DivisionByZeroOrNonFinite,
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;
