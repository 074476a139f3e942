use crate::commands::progress_bar;
use crate::config::Settings;
use anyhow::{Context, Result};
use colored::Colorize;
use omg_core::odoo::{ModuleScanner, WriteOutcome};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the skeleton of every module under `path` into `output/<module>`,
/// leaving the sources untouched
pub fn execute_skeleton(
    settings: &Settings,
    path: &str,
    output: &str,
    version: Option<&str>,
) -> Result<Vec<(String, PathBuf)>> {
    let output = Path::new(output);
    let modules = ModuleScanner::default().scan(Path::new(path))?;
    let writer = settings.writer();

    let pb = progress_bar(modules.len(), "modules");
    let mut written = Vec::with_capacity(modules.len());
    for (name, mut module) in modules {
        pb.set_message(name.clone());
        if let Some(version) = version {
            module.set_version(version)?;
        }
        let target = output.join(&name);
        if target.canonicalize().ok() == module.path.canonicalize().ok() {
            anyhow::bail!(
                "Output {} is the module itself, use `omg codebase` to rewrite in place",
                target.display()
            );
        }
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;

        let WriteOutcome { written: files, .. } = writer.write(&module, &target, false)?;
        println!(
            "{} {} ({} files)",
            "✓".green(),
            name.bold(),
            files.len()
        );
        written.push((name, target));
        pb.inc(1);
    }
    pb.finish_with_message("Skeletons written");
    Ok(written)
}
