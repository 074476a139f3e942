use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use super::manifest::Manifest;
use super::model::Model;
use crate::error::ValidationError;

/// `MAJOR.MINOR.x.y.z`: framework series followed by the module's own version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleVersion {
    /// `17.0`
    pub framework: String,
    /// `1.0.0`
    pub module: String,
}

impl FromStr for ModuleVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        let valid = parts.len() == 5
            && parts
                .iter()
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return Err(ValidationError::VersionFormatInvalid(s.to_string()));
        }
        Ok(Self {
            framework: parts[..2].join("."),
            module: parts[2..].join("."),
        })
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.framework, self.module)
    }
}

/// One discovered addon and everything extracted from it
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub path: PathBuf,
    pub technical_name: String,
    pub manifest: Manifest,
    /// Keyed by effective model name
    pub models: IndexMap<String, Model>,
    pub visited_files: BTreeSet<PathBuf>,
    /// Other addons referenced by imports
    pub imports: BTreeSet<String>,
    pub version: Option<ModuleVersion>,
}

impl Module {
    pub fn new(path: PathBuf, technical_name: String, manifest: Manifest) -> Self {
        Self {
            path,
            technical_name,
            manifest,
            models: IndexMap::new(),
            visited_files: BTreeSet::new(),
            imports: BTreeSet::new(),
            version: None,
        }
    }

    /// Accepts five numeric segments only
    pub fn set_version(&mut self, version: &str) -> Result<(), ValidationError> {
        self.version = Some(version.parse()?);
        Ok(())
    }

    /// Adds a model, merging it with a previous class of the same name.
    /// Classes without an effective name are skipped.
    pub fn add_model(&mut self, model: Model) {
        let Some(name) = model.effective_name().map(str::to_string) else {
            debug!(
                module = %self.technical_name,
                class = %model.class_name,
                "Skipping class without model name"
            );
            return;
        };
        match self.models.get_mut(&name) {
            Some(existing) => existing.merge(model),
            None => {
                self.models.insert(name, model);
            }
        }
    }

    /// Models that produce a file
    pub fn written_models(&self) -> impl Iterator<Item = (&String, &Model)> {
        self.models.iter().filter(|(_, model)| !model.is_empty())
    }

    pub fn field_count(&self) -> usize {
        self.models.values().map(|model| model.fields.len()).sum()
    }
}
