//! sheetsim-core - UI-agnostic document model + storage.

pub mod document;
pub mod error;
pub mod storage;

pub use document::Document;
pub use error::{Result, SheetError};

pub use sheetsim_engine::engine::{CellRef, CellSnapshot, EvalError, GridSize, Snapshot};
