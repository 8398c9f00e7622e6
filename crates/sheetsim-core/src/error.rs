//! Error types for sheetsim core.

use thiserror::Error;

/// Errors that can occur while editing, loading or saving a sheet.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("invalid cell label '{0}'")]
    InvalidLabel(String),

    #[error("cell {label} is outside the {rows}x{cols} grid")]
    OutOfGrid {
        label: String,
        rows: usize,
        cols: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No file path set")]
    NoFilePath,
}

pub type Result<T> = std::result::Result<T, SheetError>;
