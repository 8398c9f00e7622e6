//! Serializable grid state.
//!
//! A [`Snapshot`] maps every cell label in the grid to its raw input,
//! formula, computed value and display string:
//!
//! ```json
//! { "A1": { "rawInput": "=B1*2", "formula": "B1*2", "value": 4, "display": "4" } }
//! ```
//!
//! Restored values are provisional. Callers must re-evaluate every formula
//! cell after [`Grid::restore`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cell::{CellValue, Grid};
use super::cell_ref::CellRef;
use super::error::ErrorKind;
use super::format::ERROR_TOKEN;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub cells: BTreeMap<String, CellSnapshot>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&CellSnapshot> {
        self.cells.get(label)
    }
}

/// One cell as seen from outside the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellSnapshot {
    pub raw_input: String,
    pub formula: Option<String>,
    pub value: Option<SnapshotValue>,
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Number(f64),
    Text(String),
}

impl SnapshotValue {
    /// Empty and error values have no snapshot value.
    pub fn from_cell_value(value: &CellValue) -> Option<SnapshotValue> {
        match value {
            CellValue::Number(n) => Some(SnapshotValue::Number(*n)),
            CellValue::Text(s) => Some(SnapshotValue::Text(s.clone())),
            CellValue::Empty | CellValue::Error(_) => None,
        }
    }
}

impl Grid {
    /// Read-only view of one cell. Out-of-grid coordinates read as empty.
    pub fn cell_snapshot(&self, cell_ref: &CellRef) -> CellSnapshot {
        match self.get(cell_ref) {
            Some(cell) => CellSnapshot {
                raw_input: cell.raw_input.clone(),
                formula: cell.formula.clone(),
                value: SnapshotValue::from_cell_value(&cell.value),
                display: cell.display(),
            },
            None => CellSnapshot::default(),
        }
    }

    /// Export every cell of the grid, empty ones included.
    pub fn snapshot(&self) -> Snapshot {
        let cells = self
            .iter()
            .map(|(cell_ref, _)| (cell_ref.label(), self.cell_snapshot(&cell_ref)))
            .collect();
        Snapshot { cells }
    }

    /// Replace all cell state with `snapshot`. Cells missing from it become
    /// empty. Returns the labels that were skipped because they are not valid
    /// labels or fall outside the grid.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Vec<String> {
        self.clear_all();
        let mut skipped = Vec::new();

        for (label, entry) in &snapshot.cells {
            let Some(cell_ref) = CellRef::from_str(label).filter(|r| self.contains(r)) else {
                warn!(label = %label, "skipping snapshot entry outside the grid");
                skipped.push(label.clone());
                continue;
            };

            self.set_raw(&cell_ref, &entry.raw_input);
            let is_formula = self.get(&cell_ref).is_some_and(|cell| cell.is_formula());
            if !is_formula {
                continue;
            }
            let value = match &entry.value {
                Some(SnapshotValue::Number(n)) => CellValue::Number(*n),
                Some(SnapshotValue::Text(s)) => CellValue::Text(s.clone()),
                None if entry.display == ERROR_TOKEN => CellValue::Error(ErrorKind::FormulaSyntax),
                None => CellValue::Empty,
            };
            self.set_value(&cell_ref, value);
        }

        skipped
    }
}
