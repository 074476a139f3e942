pub mod json;
pub mod markdown;

pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Writes a report to `output_path`, or to stdout when there is none
pub(crate) fn emit(report: &str, output_path: Option<&str>) -> Result<()> {
    match output_path {
        Some(path) => fs::write(Path::new(path), report)
            .with_context(|| format!("Failed to write report {}", path)),
        None => {
            print!("{}", report);
            Ok(())
        }
    }
}
