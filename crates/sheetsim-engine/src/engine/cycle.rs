//! Circular dependency detection for formula cells.
//!
//! The dependency graph changes on every edit, so cycles are detected while
//! evaluating rather than up front. Every recursive evaluation step carries
//! the chain of cells currently being evaluated (e.g., A1 references B1, B1
//! references C1, C1 references A1). Entering a cell that is already on the
//! chain is a circular reference.
//!
//! The chain is an immutable linked list living on the call stack: each
//! branch of the evaluation sees only its own ancestors, and nothing needs
//! to be removed on the way back out.

use tracing::warn;

use super::cell_ref::CellRef;
use super::error::{EvalError, EvalResult};

/// The cells currently being evaluated, innermost first.
#[derive(Debug)]
pub struct Visiting<'a> {
    cell: CellRef,
    parent: Option<&'a Visiting<'a>>,
}

impl<'a> Visiting<'a> {
    /// Start evaluating `cell` below `parent`.
    /// Fails with [`EvalError::CircularReference`] if `cell` is already on the chain.
    pub fn enter(parent: Option<&'a Visiting<'a>>, cell: CellRef) -> EvalResult<Visiting<'a>> {
        if let Some(parent) = parent
            && parent.contains(&cell)
        {
            let path = parent
                .path()
                .iter()
                .chain(std::iter::once(&cell))
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!(cell = %cell, %path, "circular reference detected");
            return Err(EvalError::CircularReference(cell));
        }
        Ok(Visiting { cell, parent })
    }

    pub fn cell(&self) -> CellRef {
        self.cell
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.iter().any(|c| c == *cell)
    }

    /// Cells on the chain, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = CellRef> + '_ {
        std::iter::successors(Some(self), |v| v.parent).map(|v| v.cell)
    }

    /// Cells on the chain, outermost first.
    pub fn path(&self) -> Vec<CellRef> {
        let mut path: Vec<CellRef> = self.iter().collect();
        path.reverse();
        path
    }
}
