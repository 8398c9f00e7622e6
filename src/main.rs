//! Sheetsim - a small spreadsheet with a safe formula language

mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use sheetsim_core::Document;
use sheetsim_core::storage::{write_markdown, write_markdown_to};
use sheetsim_engine::engine::ERROR_TOKEN;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetsim")]
#[command(author, version, about = "Spreadsheet simulator with a small, safe formula language")]
struct Cli {
    /// Spreadsheet file to open (.grd)
    file: Option<PathBuf>,

    /// Set a cell, e.g. `--set A1=5` or `--set "B1==A1*2"` (can be repeated)
    #[arg(long = "set", value_name = "LABEL=RAW")]
    sets: Vec<String>,

    /// Evaluate a formula against the sheet and print the result
    #[arg(short, long, value_name = "FORMULA")]
    command: Option<String>,

    /// Replace the sheet with a JSON snapshot before applying edits
    #[arg(long, value_name = "PATH")]
    import_snapshot: Option<PathBuf>,

    /// Write the sheet as a JSON snapshot
    #[arg(long, value_name = "PATH")]
    export_snapshot: Option<PathBuf>,

    /// Save the sheet as a .grd file
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Export to markdown file (default: print the table to stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Number of rows (overrides the config file)
    #[arg(long)]
    rows: Option<usize>,

    /// Number of columns (overrides the config file)
    #[arg(long)]
    cols: Option<usize>,

    /// Load settings from this TOML file instead of the user config
    #[arg(long, value_name = "PATH", conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore any config file
    #[arg(long)]
    no_config: bool,

    /// Log evaluation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = if cli.no_config {
        config::Config::default()
    } else {
        let (config, warnings) = config::load_config(cli.config.as_deref());
        for warning in warnings {
            eprintln!("Warning: {}", warning);
        }
        config
    };
    for warning in config::grid_limit_warnings(cli.rows, cli.cols, "--rows", "--cols") {
        eprintln!("Warning: {}", warning);
    }
    let size = config.grid_size(cli.rows, cli.cols);
    debug!(rows = size.rows, cols = size.cols, "grid size");

    let mut doc = Document::with_file(cli.file.clone(), size).with_context(|| match &cli.file {
        Some(path) => format!("failed to open {}", path.display()),
        None => "failed to create sheet".to_string(),
    })?;

    if let Some(path) = &cli.import_snapshot {
        let skipped = doc
            .import_snapshot_file(path)
            .with_context(|| format!("failed to import {}", path.display()))?;
        for label in skipped {
            eprintln!("Warning: skipped snapshot cell {}", label);
        }
    }

    for assignment in &cli.sets {
        let Some((label, raw)) = assignment.split_once('=') else {
            bail!("expected LABEL=RAW, got '{}'", assignment);
        };
        doc.set_cell(label.trim(), raw)
            .with_context(|| format!("failed to set {}", label.trim()))?;
    }

    if let Some(path) = &cli.export_snapshot {
        doc.export_snapshot_file(path)
            .with_context(|| format!("failed to export {}", path.display()))?;
    }

    if let Some(path) = &cli.save {
        doc.save_file_as(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
    }

    if let Some(path) = &cli.output {
        write_markdown(path, &doc).with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Exported to {}", path.display());
    }

    if let Some(formula) = &cli.command {
        match doc.evaluate_formula(formula) {
            Ok(display) => println!("{}", display),
            Err(err) => {
                println!("{}", ERROR_TOKEN);
                eprintln!("Error: {}", err);
                std::process::exit(1);
            }
        }
    } else if cli.output.is_none() {
        let stdout = std::io::stdout();
        write_markdown_to(&mut stdout.lock(), &doc)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
