//! Parser for .grd file format

use crate::error::{Result, SheetError};
use sheetsim_engine::engine::{CellRef, GridSize};
use std::fs;
use std::path::Path;

/// Parse a .grd file into `(cell, raw input)` pairs, in file order.
pub fn parse_grd(path: &Path, size: GridSize) -> Result<Vec<(CellRef, String)>> {
    let content = fs::read_to_string(path)?;
    parse_grd_content(&content, size)
}

/// Parse .grd content from a string. Every label must lie inside `size`.
pub fn parse_grd_content(content: &str, size: GridSize) -> Result<Vec<(CellRef, String)>> {
    let mut cells = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse "CELLREF: VALUE" format
        let Some((cell_ref_str, value_str)) = line.split_once(':') else {
            return Err(SheetError::Parse {
                line: line_num + 1,
                message: "Expected 'CELLREF: VALUE' format".to_string(),
            });
        };

        let cell_ref_str = cell_ref_str.trim();
        let cell_ref = CellRef::from_str(cell_ref_str).ok_or_else(|| SheetError::Parse {
            line: line_num + 1,
            message: format!("Invalid cell reference: {}", cell_ref_str),
        })?;
        if !size.contains(&cell_ref) {
            return Err(SheetError::Parse {
                line: line_num + 1,
                message: format!(
                    "Cell {} is outside the {}x{} grid",
                    cell_ref, size.rows, size.cols
                ),
            });
        }

        cells.push((cell_ref, parse_raw_value(value_str.trim())));
    }

    Ok(cells)
}

/// A fully quoted value is unquoted; anything else is taken verbatim.
fn parse_raw_value(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return unescape_grd_text(&value[1..value.len() - 1]);
    }
    value.to_string()
}

fn unescape_grd_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
