use super::Document;
use crate::error::{Result, SheetError};
use crate::storage::{parse_grd, read_snapshot, write_grd, write_snapshot};
use sheetsim_engine::engine::{Grid, Snapshot};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

impl Document {
    /// Save to current file path.
    /// Returns the path saved to.
    pub fn save_file(&mut self) -> Result<PathBuf> {
        let Some(path) = &self.file_path else {
            return Err(SheetError::NoFilePath);
        };

        write_grd(path, &self.grid)?;
        info!(path = %path.display(), "saved sheet");
        self.modified = false;
        Ok(path.clone())
    }

    /// Save to `path` and make it the current file path.
    pub fn save_file_as(&mut self, path: &Path) -> Result<PathBuf> {
        write_grd(path, &self.grid)?;
        info!(path = %path.display(), "saved sheet");
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(path.to_path_buf())
    }

    /// Load from file, replacing the whole grid. On error the document is unchanged.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let cells = parse_grd(path, self.size())?;

        // Build the new grid first so load is transactional.
        let mut grid = Grid::new(self.size());
        for (cell_ref, raw) in &cells {
            grid.set_raw(cell_ref, raw);
        }

        self.grid = grid;
        let changed = self.recalculate_all();
        info!(path = %path.display(), cells = cells.len(), changed, "loaded sheet");

        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Export every cell of the grid.
    pub fn export_snapshot(&self) -> Snapshot {
        self.grid.snapshot()
    }

    /// Replace the grid with `snapshot` and re-evaluate every formula.
    /// Returns the labels that were skipped because they are invalid or
    /// outside the grid.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Vec<String> {
        let skipped = self.grid.restore(snapshot);
        let changed = self.recalculate_all();
        if !skipped.is_empty() {
            warn!(skipped = skipped.len(), "snapshot entries were skipped");
        }
        info!(cells = snapshot.len() - skipped.len(), changed, "imported snapshot");
        self.modified = true;
        skipped
    }

    pub fn export_snapshot_file(&self, path: &Path) -> Result<()> {
        write_snapshot(path, &self.export_snapshot())?;
        info!(path = %path.display(), "exported snapshot");
        Ok(())
    }

    /// Read a JSON snapshot and import it. The grid is untouched if the file
    /// cannot be read or parsed.
    pub fn import_snapshot_file(&mut self, path: &Path) -> Result<Vec<String>> {
        let snapshot = read_snapshot(path)?;
        Ok(self.import_snapshot(&snapshot))
    }
}
