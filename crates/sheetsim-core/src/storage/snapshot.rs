//! JSON persistence for [`Snapshot`]s.

use crate::error::{Result, SheetError};
use sheetsim_engine::engine::Snapshot;
use std::fs;
use std::path::Path;

/// Snapshots larger than this are refused.
const MAX_SNAPSHOT_BYTES: u64 = 64 * 1024 * 1024;

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json + "\n")?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let meta = fs::metadata(path)?;
    if meta.len() > MAX_SNAPSHOT_BYTES {
        return Err(SheetError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: snapshot too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_SNAPSHOT_BYTES
            ),
        )));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
