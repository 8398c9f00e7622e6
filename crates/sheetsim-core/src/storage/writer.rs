//! Writer for .grd file format

use crate::error::Result;
use sheetsim_engine::engine::{Grid, parse_number};
use std::fs;
use std::path::Path;

/// Write a Grid to a .grd file
pub fn write_grd(path: &Path, grid: &Grid) -> Result<()> {
    let content = write_grd_content(grid);
    fs::write(path, content)?;
    Ok(())
}

/// Write a Grid to a .grd format string. Cells come out row-major.
pub fn write_grd_content(grid: &Grid) -> String {
    let mut lines = vec!["# Sheetsim Spreadsheet".to_string()];

    for (cell_ref, cell) in grid.iter() {
        if cell.is_empty() {
            continue;
        }
        let value_str = if writes_bare(&cell.raw_input) {
            cell.raw_input.clone()
        } else {
            format!("\"{}\"", escape_grd_text(&cell.raw_input))
        };
        lines.push(format!("{}: {}", cell_ref, value_str));
    }

    lines.join("\n") + "\n"
}

/// Formulas and numbers survive the parser unquoted as long as they fit on
/// one line and have no surrounding whitespace for it to trim.
fn writes_bare(raw: &str) -> bool {
    raw.trim() == raw
        && !raw.contains(['\n', '\r'])
        && (raw.starts_with('=') || parse_number(raw).is_some())
}

fn escape_grd_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
