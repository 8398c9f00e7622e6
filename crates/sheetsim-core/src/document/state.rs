use crate::error::Result;
use sheetsim_engine::engine::{Grid, GridSize};
use std::path::PathBuf;

/// UI-agnostic document state for the spreadsheet.
pub struct Document {
    /// The spreadsheet grid
    pub grid: Grid,
    /// Current file path
    pub file_path: Option<PathBuf>,
    /// Whether the grid has been modified
    pub modified: bool,
}

impl Document {
    /// Create an empty document with the default grid size.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Self::with_size(GridSize::default())
    }

    pub fn with_size(size: GridSize) -> Self {
        Document {
            grid: Grid::new(size),
            file_path: None,
            modified: false,
        }
    }

    /// Create a new document and load a file if provided.
    /// A path that does not exist yet becomes the save target.
    pub fn with_file(path: Option<PathBuf>, size: GridSize) -> Result<Self> {
        let mut doc = Self::with_size(size);
        if let Some(p) = path {
            if p.exists() {
                doc.load_file(&p)?;
            } else {
                doc.file_path = Some(p);
            }
        }
        Ok(doc)
    }

    pub fn size(&self) -> GridSize {
        self.grid.size()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
