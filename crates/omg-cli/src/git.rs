use anyhow::{Context, Result};
use omg_core::external::run_external_args;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Git working copy driven through the `git` executable
pub struct Git {
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        run_external_args("git", args, Some(self.dir.as_path()))
    }

    /// Clones `url` into `dest`, optionally at `branch`
    pub fn clone_into(url: &str, branch: Option<&str>, dest: &Path) -> Result<Self> {
        let dest_arg = dest.to_string_lossy().into_owned();
        let mut args = vec!["clone", "--depth", "1"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend([url, dest_arg.as_str()]);
        run_external_args("git", &args, None)?;
        info!(url, dest = %dest.display(), "Repository cloned");
        Ok(Self::new(dest))
    }

    pub fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"]).is_ok()
    }

    pub fn init(&self) -> Result<()> {
        self.run(&["init", "--quiet"])?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(self.run(&["branch", "--show-current"])?.trim().to_string())
    }

    /// Switches to `branch`, creating it when needed
    pub fn checkout(&self, branch: &str) -> Result<()> {
        if self.current_branch()? == branch {
            return Ok(());
        }
        if self.run(&["checkout", "-b", branch]).is_err() {
            self.run(&["checkout", branch])?;
        }
        debug!(dir = %self.dir.display(), branch, "Checked out");
        Ok(())
    }

    pub fn add(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().into_owned();
        self.run(&["add", "-A", "--", path.as_str()])?;
        Ok(())
    }

    /// Commits staged changes; false when there was nothing to commit
    pub fn commit(&self, message: &str) -> Result<bool> {
        let staged = self.run(&["diff", "--cached", "--name-only"])?;
        if staged.trim().is_empty() {
            debug!(dir = %self.dir.display(), "Nothing to commit");
            return Ok(false);
        }
        self.run(&["commit", "--quiet", "-m", message])?;
        info!(dir = %self.dir.display(), message, "Committed");
        Ok(true)
    }

    /// Removes the history of a cloned template
    pub fn reset_history(&self) -> Result<()> {
        let git_dir = self.dir.join(".git");
        std::fs::remove_dir_all(&git_dir)
            .with_context(|| format!("Failed to remove {}", git_dir.display()))?;
        self.init()
    }
}
