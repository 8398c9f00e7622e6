//! User configuration (`config.toml`).
//!
//! ```toml
//! [grid]
//! rows = 10
//! cols = 10
//! ```

use directories::ProjectDirs;
use serde::Deserialize;
use sheetsim_engine::engine::GridSize;
use std::path::{Path, PathBuf};

const MAX_CONFIG_FILE_BYTES: u64 = 65_536; // 64 KiB

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    pub rows: Option<usize>,
    pub cols: Option<usize>,
}

impl Config {
    /// Grid size from the file, with command-line values taking precedence.
    /// Values beyond the maximum grid size are clamped.
    pub fn grid_size(&self, rows: Option<usize>, cols: Option<usize>) -> GridSize {
        GridSize::new(
            rows.or(self.grid.rows).unwrap_or(GridSize::DEFAULT_ROWS),
            cols.or(self.grid.cols).unwrap_or(GridSize::DEFAULT_COLS),
        )
    }
}

/// Warnings for grid dimensions that will be clamped to the maximum size.
/// `rows_name` and `cols_name` say where the values came from.
pub fn grid_limit_warnings(
    rows: Option<usize>,
    cols: Option<usize>,
    rows_name: &str,
    cols_name: &str,
) -> Vec<String> {
    [
        (rows_name, rows, GridSize::MAX_ROWS),
        (cols_name, cols, GridSize::MAX_COLS),
    ]
    .into_iter()
    .filter_map(|(name, value, max)| match value {
        Some(value) if value > max => Some(format!(
            "{} = {} exceeds the maximum of {}; using {}",
            name, value, max, max
        )),
        _ => None,
    })
    .collect()
}

/// Load the config from `config_file`, or from the user config directory.
/// Problems are returned as warnings and fall back to the defaults.
pub fn load_config(config_file: Option<&Path>) -> (Config, Vec<String>) {
    let mut warnings = Vec::new();
    let Some(path) = config_file.map(Path::to_path_buf).or_else(user_config_path) else {
        return (Config::default(), warnings);
    };

    if !path.exists() {
        if config_file.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
        return (Config::default(), warnings);
    }

    let config = match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
            warnings.push(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            ));
            None
        }
        Ok(_) => match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(parsed) => {
                    warnings.extend(grid_limit_warnings(
                        parsed.grid.rows,
                        parsed.grid.cols,
                        "grid.rows",
                        "grid.cols",
                    ));
                    Some(parsed)
                }
                Err(err) => {
                    warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                    None
                }
            },
            Err(err) => {
                warnings.push(format!("Failed to read {}: {}", path.display(), err));
                None
            }
        },
        Err(err) => {
            warnings.push(format!(
                "Failed to read metadata for {}: {}",
                path.display(),
                err
            ));
            None
        }
    };

    (config.unwrap_or_default(), warnings)
}

fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetsim")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
