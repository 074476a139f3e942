use crate::commands::progress_bar;
use crate::config::Settings;
use crate::git::Git;
use anyhow::{Context, Result};
use colored::Colorize;
use omg_core::odoo::{ModuleScanner, ModuleVersion};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flags of the `codebase` command
#[derive(Debug, Clone, Copy)]
pub struct CodebaseOptions {
    /// Delete every file that is not regenerated
    pub clean: bool,
    /// Commit each module on the configured branch
    pub commit: bool,
    /// Write a field-rename migration worksheet
    pub rename: bool,
}

impl Default for CodebaseOptions {
    fn default() -> Self {
        Self {
            clean: true,
            commit: false,
            rename: false,
        }
    }
}

/// What happened to one module
#[derive(Debug, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub models: usize,
    pub fields: usize,
    pub written: usize,
    pub removed: usize,
    pub migration: Option<PathBuf>,
    pub committed: bool,
}

/// Rewrites every module under `path` in place as a skeleton at `version`
pub fn execute_codebase(
    settings: &Settings,
    path: &str,
    version: &str,
    options: CodebaseOptions,
) -> Result<Vec<ModuleReport>> {
    // Fails before anything is touched
    let version: ModuleVersion = version.parse()?;
    let root = Path::new(path);

    let git = if options.commit {
        let git = Git::new(root);
        if !git.is_repository() {
            git.init()?;
        }
        git.checkout(&settings.codebase.branch)?;
        Some(git)
    } else {
        None
    };

    let modules = ModuleScanner::default().scan(root)?;
    let writer = settings.writer();
    let version = version.to_string();

    let pb = progress_bar(modules.len(), "modules");
    let mut reports = Vec::with_capacity(modules.len());
    for (name, mut module) in modules {
        pb.set_message(name.clone());
        module.set_version(&version)?;
        let target = module.path.clone();
        let outcome = writer
            .write(&module, &target, options.clean)
            .with_context(|| format!("Failed to write module {}", name))?;

        let migration = if options.rename {
            Some(writer.rename(&module, &target)?)
        } else {
            None
        };

        let committed = match &git {
            Some(git) => {
                // git runs inside `root`
                let relative = match target.strip_prefix(root) {
                    Ok(rel) if !rel.as_os_str().is_empty() => rel,
                    _ => Path::new("."),
                };
                git.add(relative)?;
                git.commit(&settings.commit_message(&name))?
            }
            None => false,
        };

        reports.push(ModuleReport {
            models: module.written_models().count(),
            fields: module.field_count(),
            written: outcome.written.len(),
            removed: outcome.removed.len(),
            migration,
            committed,
            name,
        });
        pb.inc(1);
    }
    pb.finish_with_message("Codebase generated");

    info!(root = %root.display(), modules = reports.len(), %version, "Codebase done");
    print_summary(&reports);
    Ok(reports)
}

fn print_summary(reports: &[ModuleReport]) {
    if reports.is_empty() {
        println!("{}", "No module found".yellow());
        return;
    }
    for report in reports {
        let mut line = format!(
            "{} {} models, {} fields, {} files written, {} removed",
            report.name.bold(),
            report.models,
            report.fields,
            report.written,
            report.removed
        );
        if report.committed {
            line.push_str(&format!(" {}", "committed".green()));
        }
        println!("{}", line);
    }
    println!(
        "{}",
        format!("{} module(s) converted", reports.len()).green().bold()
    );
}
