use crate::config::Settings;
use crate::git::Git;
use anyhow::{Context, Result};
use colored::Colorize;
use omg_core::external::run_external;
use omg_core::scaffold::ScaffoldOptions;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Creates a new module at `path`
pub fn execute_scaffold_module(
    settings: &Settings,
    path: &str,
    options: &ScaffoldOptions,
) -> Result<Vec<PathBuf>> {
    let target = Path::new(path);
    let files = settings.scaffold().generate(target, options)?;
    for file in &files {
        println!("{} {}", "+".green(), file.display());
    }
    println!(
        "{}",
        format!("Module created in {}", target.display()).green().bold()
    );
    Ok(files)
}

/// Clones the configured repository template into `path` and runs the post-install hooks
pub fn execute_scaffold_repo(settings: &Settings, path: &str) -> Result<()> {
    let repository = &settings.repository;
    let url = repository
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("repository.url is not configured, see `omg init`"))?;

    let target = Path::new(path);
    if target.exists() {
        let mut entries = fs::read_dir(target)
            .with_context(|| format!("Failed to read {}", target.display()))?;
        if entries.next().is_some() {
            anyhow::bail!("{} is not empty", target.display());
        }
    }

    let git = Git::clone_into(url, repository.branch.as_deref(), target)?;
    if repository.commit {
        git.reset_history()?;
        git.add(Path::new("."))?;
        git.commit(&repository.commit_message)?;
    }

    for command in &repository.post_install {
        info!(command = %command, dir = %target.display(), "Running post-install hook");
        run_external(command, Some(target))?;
    }

    println!(
        "{}",
        format!("Repository created in {}", target.display()).green().bold()
    );
    Ok(())
}
