use super::Document;
use crate::error::{Result, SheetError};
use sheetsim_engine::engine::{CellRef, CellSnapshot, CellValue, EvalError, Evaluator};
use std::collections::HashSet;
use tracing::debug;

impl Document {
    /// Parse `label` and check it against the grid bounds.
    pub fn resolve_label(&self, label: &str) -> Result<CellRef> {
        let cell_ref =
            CellRef::from_str(label).ok_or_else(|| SheetError::InvalidLabel(label.to_string()))?;
        if !self.grid.contains(&cell_ref) {
            let size = self.size();
            return Err(SheetError::OutOfGrid {
                label: label.to_string(),
                rows: size.rows,
                cols: size.cols,
            });
        }
        Ok(cell_ref)
    }

    /// Set a cell by label. A malformed formula is not an error here: the
    /// cell just displays `#ERROR`.
    pub fn set_cell(&mut self, label: &str, raw_input: &str) -> Result<()> {
        let cell_ref = self.resolve_label(label)?;
        self.set_cell_from_input(cell_ref, raw_input)
    }

    /// Set cell contents from input string, evaluate it and refresh every
    /// cell that depends on it.
    pub fn set_cell_from_input(&mut self, cell_ref: CellRef, input: &str) -> Result<()> {
        if !self.grid.set_raw(&cell_ref, input) {
            let size = self.size();
            return Err(SheetError::OutOfGrid {
                label: cell_ref.label(),
                rows: size.rows,
                cols: size.cols,
            });
        }
        self.modified = true;

        self.evaluate_and_store(cell_ref);
        self.propagate_from(cell_ref);
        Ok(())
    }

    pub fn get_cell(&self, label: &str) -> Result<CellSnapshot> {
        let cell_ref = self.resolve_label(label)?;
        Ok(self.grid.cell_snapshot(&cell_ref))
    }

    pub fn get_display(&self, label: &str) -> Result<String> {
        let cell_ref = self.resolve_label(label)?;
        Ok(self.get_cell_display(&cell_ref))
    }

    /// Display string for a cell; out-of-grid cells display as empty.
    pub fn get_cell_display(&self, cell_ref: &CellRef) -> String {
        self.grid
            .get(cell_ref)
            .map(|cell| cell.display())
            .unwrap_or_default()
    }

    /// Reset the whole grid.
    pub fn clear(&mut self) {
        self.grid.clear_all();
        self.modified = true;
    }

    /// Re-evaluate one formula cell and store the result.
    /// Returns true if its value changed. Literal cells are left alone.
    pub(crate) fn evaluate_and_store(&mut self, cell_ref: CellRef) -> bool {
        let is_formula = self.grid.get(&cell_ref).is_some_and(|cell| cell.is_formula());
        if !is_formula {
            return false;
        }

        let value = match Evaluator::new(&self.grid).evaluate_cell(cell_ref) {
            Ok(value) => CellValue::from(value),
            Err(err) => {
                debug!(cell = %cell_ref, error = %err, "formula evaluation failed");
                CellValue::Error(err.kind())
            }
        };
        self.grid.set_value(&cell_ref, value)
    }

    /// Refresh every cell that depends on `changed`, directly or transitively.
    /// Returns how many of them changed value.
    pub fn propagate_from(&mut self, changed: CellRef) -> usize {
        let mut to_process = vec![changed];
        let mut visited = HashSet::new();
        let mut updated = 0;

        while let Some(cell_ref) = to_process.pop() {
            if !visited.insert(cell_ref) {
                continue;
            }
            for dependent in self.grid.dependents_of(&cell_ref) {
                if visited.contains(&dependent) {
                    continue;
                }
                debug!(cell = %dependent, changed = %cell_ref, "re-evaluating dependent");
                if self.evaluate_and_store(dependent) {
                    updated += 1;
                }
                to_process.push(dependent);
            }
        }

        updated
    }

    /// Re-evaluate every formula cell, row-major. Returns the number of cells
    /// whose value changed; zero on a grid that is already consistent.
    pub fn recalculate_all(&mut self) -> usize {
        self.grid
            .formula_cells()
            .into_iter()
            .filter(|cell_ref| self.evaluate_and_store(*cell_ref))
            .count()
    }

    /// Evaluate an ad-hoc formula against the grid without storing it.
    pub fn evaluate_formula(&self, formula: &str) -> std::result::Result<String, EvalError> {
        Evaluator::new(&self.grid)
            .evaluate_formula(formula)
            .map(|value| value.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsim_engine::engine::{GridSize, SnapshotValue};

    fn doc_with(entries: &[(&str, &str)]) -> Document {
        let mut doc = Document::new();
        for (label, raw) in entries {
            doc.set_cell(label, raw).unwrap();
        }
        doc
    }

    fn display(doc: &Document, label: &str) -> String {
        doc.get_display(label).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let doc = doc_with(&[
            ("A1", "5"),
            ("B1", "3"),
            ("C1", "=A1+B1"),
            ("C2", "=A1-B1"),
            ("C3", "=A1*B1"),
            ("C4", "=A1*B1/3"),
        ]);
        assert_eq!(display(&doc, "C1"), "8");
        assert_eq!(display(&doc, "C2"), "2");
        assert_eq!(display(&doc, "C3"), "15");
        assert_eq!(display(&doc, "C4"), "5");
    }

    #[test]
    fn test_range_aggregates() {
        let mut doc = doc_with(&[("A1", "1"), ("A2", "2"), ("A3", "3"), ("A4", "4"), ("A5", "5")]);
        for (label, formula, expected) in [
            ("A6", "=SUM(A1:A5)", "15"),
            ("A7", "=AVERAGE(A1:A5)", "3"),
            ("A8", "=MAX(A1:A5)", "5"),
            ("A9", "=MIN(A1:A5)", "1"),
        ] {
            doc.set_cell(label, formula).unwrap();
            assert_eq!(display(&doc, label), expected, "{formula}");
        }
    }

    #[test]
    fn test_nested_if() {
        let doc = doc_with(&[
            ("A1", "88"),
            ("B1", r#"=IF(A1>=90,"A",IF(A1>=80,"B",IF(A1>=70,"C","F")))"#),
        ]);
        assert_eq!(display(&doc, "B1"), "B");
    }

    #[test]
    fn test_dependency_propagation() {
        let mut doc = doc_with(&[("A1", "10"), ("B1", "=A1*2")]);
        assert_eq!(display(&doc, "B1"), "20");
        doc.set_cell("A1", "20").unwrap();
        assert_eq!(display(&doc, "B1"), "40");
    }

    #[test]
    fn test_multi_level_propagation() {
        let mut doc = doc_with(&[("A1", "1"), ("B1", "=A1+1"), ("C1", "=B1+1"), ("D1", "=SUM(A1:C1)")]);
        assert_eq!(display(&doc, "D1"), "6");
        doc.set_cell("A1", "10").unwrap();
        assert_eq!(display(&doc, "B1"), "11");
        assert_eq!(display(&doc, "C1"), "12");
        assert_eq!(display(&doc, "D1"), "33");
    }

    #[test]
    fn test_range_interior_edit_propagates() {
        let mut doc = doc_with(&[("A1", "1"), ("A2", "2"), ("A3", "3"), ("B1", "=SUM(A1:A3)")]);
        doc.set_cell("A2", "20").unwrap();
        assert_eq!(display(&doc, "B1"), "24");
    }

    #[test]
    fn test_spaced_references_propagate() {
        let mut doc = doc_with(&[("A1", "1"), ("A2", "2"), ("A3", "3")]);
        doc.set_cell("B1", "=A 1*2").unwrap();
        doc.set_cell("B2", "=SUM(A 1 : A3)").unwrap();
        assert_eq!(display(&doc, "B1"), "2");
        assert_eq!(display(&doc, "B2"), "6");

        doc.set_cell("A1", "5").unwrap();
        assert_eq!(display(&doc, "B1"), "10");
        doc.set_cell("A2", "20").unwrap();
        assert_eq!(display(&doc, "B2"), "28");
    }

    #[test]
    fn test_failing_layers_do_not_hang() {
        let mut doc = Document::new();
        for col in 0..10 {
            doc.set_cell_from_input(CellRef::new(0, col), "1").unwrap();
        }
        for row in 1..8 {
            for col in 0..10 {
                let formula = format!("=SUM(A{}:J{})/0", row, row);
                doc.set_cell_from_input(CellRef::new(row, col), &formula).unwrap();
            }
        }
        doc.set_cell("A9", "=SUM(A8:J8)+1").unwrap();
        assert_eq!(display(&doc, "A8"), "#ERROR");
        assert_eq!(display(&doc, "A9"), "1");

        // Editing the top row re-evaluates every failing layer.
        doc.set_cell("A1", "2").unwrap();
        assert_eq!(display(&doc, "A9"), "1");
    }

    #[test]
    fn test_oversized_formula_is_a_cell_error() {
        let long_sum = format!("={}", vec!["1"; 5000].join("+"));
        let mut doc = doc_with(&[("A1", &long_sum), ("B1", "=A1+1")]);
        assert_eq!(display(&doc, "A1"), "#ERROR");
        assert_eq!(display(&doc, "B1"), "1");

        doc.set_cell("A1", &format!("={}", vec!["1"; 200].join("+"))).unwrap();
        assert_eq!(display(&doc, "B1"), "201");
    }

    #[test]
    fn test_similar_labels_do_not_propagate() {
        let mut doc = Document::with_size(GridSize::new(12, 3));
        doc.set_cell("B1", "=A10").unwrap();
        doc.set_cell("A10", "5").unwrap();
        assert_eq!(display(&doc, "B1"), "5");
        // A1 is not referenced by B1.
        doc.set_cell("A1", "99").unwrap();
        assert_eq!(doc.propagate_from(CellRef::new(0, 0)), 0);
        assert_eq!(display(&doc, "B1"), "5");
    }

    #[test]
    fn test_circular_reference() {
        let mut doc = Document::new();
        doc.set_cell("A1", "=B1").unwrap();
        doc.set_cell("B1", "=A1").unwrap();
        assert_eq!(display(&doc, "A1"), "#ERROR");
        assert_eq!(display(&doc, "B1"), "#ERROR");

        // Breaking the cycle recovers both cells.
        doc.set_cell("B1", "7").unwrap();
        assert_eq!(display(&doc, "A1"), "7");
        assert_eq!(display(&doc, "B1"), "7");
    }

    #[test]
    fn test_long_cycle_terminates() {
        let mut doc = Document::new();
        doc.set_cell("A1", "=J10").unwrap();
        for row in 0..10 {
            for col in 0..10 {
                if row == 0 && col == 0 {
                    continue;
                }
                let prev = if col == 0 {
                    CellRef::new(row - 1, 9)
                } else {
                    CellRef::new(row, col - 1)
                };
                doc.set_cell_from_input(CellRef::new(row, col), &format!("={}+1", prev))
                    .unwrap();
            }
        }
        assert!(doc.grid.iter().all(|(_, cell)| cell.display() == "#ERROR"));
    }

    #[test]
    fn test_out_of_bounds_reference_is_zero() {
        let doc = doc_with(&[("A1", "=K1+1"), ("A2", "=A11*3"), ("A3", "=AA1")]);
        assert_eq!(display(&doc, "A1"), "1");
        assert_eq!(display(&doc, "A2"), "0");
        assert_eq!(display(&doc, "A3"), "0");
    }

    #[test]
    fn test_division_by_zero() {
        let doc = doc_with(&[("A1", "10"), ("B1", "0"), ("C1", "=A1/B1"), ("D1", "=C1+1")]);
        assert_eq!(display(&doc, "C1"), "#ERROR");
        assert_eq!(doc.get_cell("C1").unwrap().value, None);
        // Dependents of an error cell read 0.
        assert_eq!(display(&doc, "D1"), "1");
    }

    #[test]
    fn test_malformed_formulas_are_cell_errors() {
        let doc = doc_with(&[
            ("A1", "=1+"),
            ("A2", "=IF(1,2)"),
            ("A3", "=alert(1)"),
            ("A4", "=1;2"),
            ("A5", "=\"a\"+1"),
        ]);
        for label in ["A1", "A2", "A3", "A4", "A5"] {
            assert_eq!(display(&doc, label), "#ERROR", "{label}");
        }
    }

    #[test]
    fn test_literals_are_stored_as_text() {
        let doc = doc_with(&[("A1", "007"), ("A2", "hello"), ("A3", "=A1+1")]);
        let cell = doc.get_cell("A1").unwrap();
        assert_eq!(cell.raw_input, "007");
        assert_eq!(cell.formula, None);
        assert_eq!(cell.value, Some(SnapshotValue::Text("007".into())));
        assert_eq!(cell.display, "007");
        assert_eq!(display(&doc, "A3"), "8");
    }

    #[test]
    fn test_formula_cell_snapshot() {
        let doc = doc_with(&[("A1", "2"), ("B1", "= A1 * 3")]);
        let cell = doc.get_cell("B1").unwrap();
        assert_eq!(cell.raw_input, "= A1 * 3");
        assert_eq!(cell.formula.as_deref(), Some(" A1 * 3"));
        assert_eq!(cell.value, Some(SnapshotValue::Number(6.0)));
        assert_eq!(cell.display, "6");
    }

    #[test]
    fn test_invalid_and_out_of_grid_labels() {
        let mut doc = Document::new();
        assert!(matches!(doc.set_cell("A0", "1"), Err(SheetError::InvalidLabel(_))));
        assert!(matches!(doc.set_cell("1A", "1"), Err(SheetError::InvalidLabel(_))));
        assert!(matches!(
            doc.set_cell("K1", "1"),
            Err(SheetError::OutOfGrid { rows: 10, cols: 10, .. })
        ));
        assert!(matches!(doc.get_cell("A11"), Err(SheetError::OutOfGrid { .. })));
        assert!(!doc.modified);
    }

    #[test]
    fn test_lowercase_labels() {
        let doc = doc_with(&[("a1", "4"), ("b1", "=sum(a1, 1)")]);
        assert_eq!(display(&doc, "B1"), "5");
    }

    #[test]
    fn test_clear() {
        let mut doc = doc_with(&[("A1", "1"), ("B1", "=A1")]);
        doc.clear();
        assert!(doc.grid.iter().all(|(_, cell)| cell.is_empty()));
        assert_eq!(display(&doc, "B1"), "");
    }

    #[test]
    fn test_idempotent_reevaluation() {
        let mut doc = doc_with(&[
            ("A1", "3"),
            ("A2", "=A1*2"),
            ("A3", "=A2/0"),
            ("B1", "=B2"),
            ("B2", "=B1"),
            ("C1", r#"=IF(A2>5,"big","small")"#),
        ]);
        let before: Vec<String> = doc.grid.iter().map(|(_, cell)| cell.display()).collect();
        assert_eq!(doc.recalculate_all(), 0);
        assert_eq!(doc.propagate_from(CellRef::new(0, 0)), 0);
        let after: Vec<String> = doc.grid.iter().map(|(_, cell)| cell.display()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_evaluate_formula() {
        let doc = doc_with(&[("A1", "5")]);
        assert_eq!(doc.evaluate_formula("=A1 + 3").unwrap(), "8");
        assert_eq!(doc.evaluate_formula("A1/2").unwrap(), "2.5");
        assert_eq!(doc.evaluate_formula("1/0"), Err(EvalError::DivisionByZero));
        assert!(doc.grid.formula_cells().is_empty());
    }
}
