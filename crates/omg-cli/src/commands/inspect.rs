use crate::reporters::{JsonReporter, MarkdownReporter};
use crate::ReportFormat;
use anyhow::Result;
use indicatif::ProgressBar;
use omg_core::odoo::{Module, ModuleScanner};
use std::path::Path;
use std::time::Duration;

/// Reports the modules, models and fields found under `path`
pub fn execute_inspect(path: &str, format: ReportFormat, output: Option<&str>) -> Result<Vec<Module>> {
    let pb = ProgressBar::new_spinner();
    pb.set_message("Scanning modules...");
    pb.enable_steady_tick(Duration::from_millis(100));
    let modules: Vec<Module> = ModuleScanner::default()
        .scan(Path::new(path))?
        .into_values()
        .collect();
    pb.finish_and_clear();

    match format {
        ReportFormat::Json => JsonReporter.generate(&modules, output)?,
        ReportFormat::Markdown => MarkdownReporter.generate(&modules, output)?,
    }
    if let Some(output) = output {
        eprintln!("Report saved to {}", output);
    }
    Ok(modules)
}
