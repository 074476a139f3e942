use anyhow::{Context, Result};
use omg_core::codegen::{BuiltinFormatter, CodeFormatter, ExternalFormatter};
use omg_core::odoo::{ManifestDefaults, ModuleWriter};
use omg_core::scaffold::{BuiltinTemplates, ModuleScaffold};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "omg.toml";

/// Tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Values every generated manifest starts from
    pub manifest: ManifestDefaults,
    pub formatter: FormatterConfig,
    pub codebase: CodebaseConfig,
    pub repository: RepositoryConfig,
}

/// External formatter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Command reading code on stdin and writing it on stdout (`black -q -`).
    /// None = built-in whitespace normalization
    pub command: Option<String>,
}

/// `codebase` command configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodebaseConfig {
    /// Group granted access to new models
    pub group: String,
    /// Branch the generated code is committed on
    pub branch: String,
    /// Commit message, `{name}` is replaced by the module name
    pub commit_message: String,
}

impl Default for CodebaseConfig {
    fn default() -> Self {
        Self {
            group: omg_core::odoo::security::DEFAULT_GROUP.to_string(),
            branch: "codebase".to_string(),
            commit_message: "[IMP] {name}: codebase".to_string(),
        }
    }
}

/// Repository template used by `scaffold repo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Git URL of the template
    pub url: Option<String>,
    pub branch: Option<String>,
    /// Commands run in the new repository, in order
    pub post_install: Vec<String>,
    /// Commit the cloned files on a fresh history
    pub commit: bool,
    pub commit_message: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            branch: None,
            post_install: Vec::new(),
            commit: false,
            commit_message: "Initial commit".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from [`DEFAULT_CONFIG_FILE`] when `path` is None.
    /// A missing default file yields the default settings; a missing explicit file is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(path) => (Path::new(path), true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !config_path.exists() {
            debug!(path = %config_path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        settings.validate()?;
        debug!(path = %config_path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        let group = &self.codebase.group;
        if group.trim().is_empty() {
            anyhow::bail!("codebase.group cannot be empty");
        }
        if !group
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            anyhow::bail!("Invalid codebase.group: '{}', expected an XML id", group);
        }
        let branch = self.codebase.branch.trim();
        if branch.is_empty() || branch.contains(char::is_whitespace) {
            anyhow::bail!("Invalid codebase.branch: '{}'", self.codebase.branch);
        }
        if let Some(command) = &self.formatter.command {
            if command.trim().is_empty() {
                anyhow::bail!("formatter.command cannot be empty, remove it to use the built-in formatter");
            }
        }
        if self.manifest.license.trim().is_empty() {
            anyhow::bail!("manifest.license cannot be empty");
        }
        if let Some(url) = &self.repository.url {
            if url.trim().is_empty() {
                anyhow::bail!("repository.url cannot be empty");
            }
        }
        Ok(())
    }

    pub fn formatter(&self, cwd: Option<PathBuf>) -> Box<dyn CodeFormatter> {
        match &self.formatter.command {
            Some(command) => {
                let formatter = ExternalFormatter::new(command.clone());
                Box::new(match cwd {
                    Some(cwd) => formatter.with_cwd(cwd),
                    None => formatter,
                })
            }
            None => Box::new(BuiltinFormatter),
        }
    }

    pub fn writer(&self) -> ModuleWriter {
        ModuleWriter::new(self.formatter(None), self.manifest.clone())
            .with_group(self.codebase.group.clone())
    }

    pub fn scaffold(&self) -> ModuleScaffold {
        ModuleScaffold::new(
            Box::new(BuiltinTemplates),
            self.formatter(None),
            self.manifest.clone(),
        )
    }

    /// Commit message for one module
    pub fn commit_message(&self, module: &str) -> String {
        self.codebase.commit_message.replace("{name}", module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[manifest]
author = "Acme"

[codebase]
branch = "16.0-codebase"
"#,
        )
        .unwrap();
        assert_eq!(settings.manifest.author, "Acme");
        assert_eq!(settings.manifest.license, "LGPL-3");
        assert_eq!(settings.codebase.group, "base.group_user");
        assert_eq!(settings.codebase.branch, "16.0-codebase");
        assert!(settings.formatter.command.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn rejects_branch_with_spaces() {
        let mut settings = Settings::default();
        settings.codebase.branch = "my branch".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_group_that_is_not_an_xml_id() {
        let mut settings = Settings::default();
        settings.codebase.group = "base.group_user,base.group_portal".into();
        assert!(settings.validate().is_err());
        settings.codebase.group = "sales_team.group_sale_manager".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_blank_formatter() {
        let mut settings = Settings::default();
        settings.formatter.command = Some("  ".into());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Settings::load(path.to_str()).is_err());
    }

    #[test]
    fn commit_message_names_the_module() {
        assert_eq!(
            Settings::default().commit_message("sale_ext"),
            "[IMP] sale_ext: codebase"
        );
    }
}
