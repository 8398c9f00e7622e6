//! Storage for the .grd sheet format, JSON snapshots and Markdown export

mod md;
mod parser;
mod snapshot;
mod writer;

pub use md::{write_markdown, write_markdown_to};
pub use parser::{parse_grd, parse_grd_content};
pub use snapshot::{read_snapshot, write_snapshot};
pub use writer::{write_grd, write_grd_content};
