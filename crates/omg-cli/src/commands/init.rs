use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const DEFAULT_SETTINGS: &str = r#"# omg settings

[manifest]
author = ""
website = ""
license = "LGPL-3"
category = "Uncategorized"
mainteners = []

[formatter]
# Command reading Python code on stdin, e.g. black
# command = "black -q -"

[codebase]
# Group granted full access to new models
group = "base.group_user"
branch = "codebase"
commit_message = "[IMP] {name}: codebase"

[repository]
# Template cloned by `omg scaffold repo`
# url = "https://github.com/OCA/oca-addons-repo-template.git"
# branch = "main"
post_install = []
commit = false
commit_message = "Initial commit"
"#;

/// Creates the settings file
pub fn execute_init(path: &str) -> Result<()> {
    let config_path = Path::new(path);
    if config_path.exists() {
        anyhow::bail!("Config file already exists: {}", path);
    }

    fs::write(config_path, DEFAULT_SETTINGS)
        .with_context(|| format!("Failed to write config file: {}", path))?;
    println!("Created config file: {}", path);

    Ok(())
}
