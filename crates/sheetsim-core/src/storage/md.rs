//! Markdown export functionality

use crate::document::Document;
use sheetsim_engine::engine::CellRef;
use std::io::Write;
use std::path::Path;

/// Write the grid to a markdown file
pub fn write_markdown(path: &Path, doc: &Document) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_markdown_to(&mut file, doc)
}

/// Render the bounding box of non-empty cells as a Markdown table.
pub fn write_markdown_to<W: Write>(w: &mut W, doc: &Document) -> std::io::Result<()> {
    writeln!(w, "# Sheet")?;
    writeln!(w)?;

    let Some((min_row, min_col, max_row, max_col)) = find_grid_bounds(doc) else {
        writeln!(w, "*Empty spreadsheet*")?;
        return Ok(());
    };

    // Write markdown table header with column letters
    write!(w, "|   |")?;
    for col in min_col..=max_col {
        write!(w, " {} |", CellRef::col_to_letters(col))?;
    }
    writeln!(w)?;

    // Write separator row
    write!(w, "|---|")?;
    for _ in min_col..=max_col {
        write!(w, "---|")?;
    }
    writeln!(w)?;

    // Write data rows
    for row in min_row..=max_row {
        write!(w, "| {} |", row + 1)?; // 1-based row numbers
        for col in min_col..=max_col {
            let display = doc.get_cell_display(&CellRef::new(row, col));
            write!(w, " {} |", escape_markdown(&display))?;
        }
        writeln!(w)?;
    }

    Ok(())
}

/// Find the bounds (min_row, min_col, max_row, max_col) of the non-empty cells
fn find_grid_bounds(doc: &Document) -> Option<(usize, usize, usize, usize)> {
    doc.grid
        .iter()
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(cell_ref, _)| cell_ref)
        .fold(None, |bounds, r| match bounds {
            None => Some((r.row, r.col, r.row, r.col)),
            Some((min_row, min_col, max_row, max_col)) => Some((
                min_row.min(r.row),
                min_col.min(r.col),
                max_row.max(r.row),
                max_col.max(r.col),
            )),
        })
}

/// Escape special markdown characters in cell content
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ").replace('\r', "")
}
