use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::manifest::{Manifest, ManifestDefaults, INIT_FILE, MANIFEST_FILE};
use super::module::Module;
use super::scanner::is_skipped;
use super::security::{CrudLevel, ModelAccessHelper, ACCESS_FILE, DEFAULT_GROUP};
use crate::codegen::{
    render_init, render_manifest, render_migration, render_model, snake_case, BuiltinFormatter,
    CodeFormatter,
};
use crate::error::ValidationError;
use crate::parsers::PyValue;

/// Directory kept by the cleanup even when empty
const MODELS_DIR: &str = "models";

/// Files produced and removed by one write
#[derive(Debug, Default, Serialize)]
pub struct WriteOutcome {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Regenerates skeleton modules from scanned modules
pub struct ModuleWriter {
    formatter: Box<dyn CodeFormatter>,
    defaults: ManifestDefaults,
    group: String,
}

impl Default for ModuleWriter {
    fn default() -> Self {
        Self::new(Box::new(BuiltinFormatter), ManifestDefaults::default())
    }
}

impl ModuleWriter {
    pub fn new(formatter: Box<dyn CodeFormatter>, defaults: ManifestDefaults) -> Self {
        Self {
            formatter,
            defaults,
            group: DEFAULT_GROUP.to_string(),
        }
    }

    /// Group receiving access to new models
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Writes the skeleton of `module` into `target_dir`. With `clean`, every
    /// other file is deleted, then every empty directory but `models`.
    pub fn write(&self, module: &Module, target_dir: &Path, clean: bool) -> Result<WriteOutcome> {
        let models_dir = target_dir.join(MODELS_DIR);
        fs::create_dir_all(&models_dir)
            .with_context(|| format!("Failed to create {}", models_dir.display()))?;

        let mut keep = BTreeSet::new();
        let mut access = ModelAccessHelper::new();
        let mut model_files = Vec::new();

        for (name, model) in module.written_models() {
            let Some(code) = render_model(model) else {
                continue;
            };
            let filename = snake_case(name);
            self.write_python(&models_dir.join(format!("{}.py", filename)), &code, &mut keep)?;
            model_files.push(filename);

            if model.is_new() {
                access.add(name, &self.group, CrudLevel::FULL, None);
            }
        }

        self.write_python(&models_dir.join(INIT_FILE), &render_init(&model_files), &mut keep)?;
        self.write_python(
            &target_dir.join(INIT_FILE),
            &render_init(&[MODELS_DIR.to_string()]),
            &mut keep,
        )?;

        let mut data = Vec::new();
        if let Some(path) = access.save(target_dir)? {
            keep.insert(path);
            data.push(ACCESS_FILE.to_string());
        }

        let manifest = self.manifest(module, data);
        self.write_python(
            &target_dir.join(MANIFEST_FILE),
            &render_manifest(&manifest.ordered()),
            &mut keep,
        )?;

        let removed = if clean {
            Self::clean(target_dir, &keep)?
        } else {
            Vec::new()
        };

        info!(
            module = %module.technical_name,
            target = %target_dir.display(),
            written = keep.len(),
            removed = removed.len(),
            "Skeleton written"
        );
        Ok(WriteOutcome {
            written: keep.into_iter().collect(),
            removed,
        })
    }

    /// Baseline, then the original non-empty values, then the assigned version;
    /// `data` and `demo` are replaced.
    pub fn manifest(&self, module: &Module, data: Vec<String>) -> Manifest {
        let mut manifest = Manifest::baseline(&self.defaults);
        manifest.overlay(&module.manifest);
        if let Some(version) = &module.version {
            manifest.insert("version", PyValue::Str(version.to_string()));
        }
        manifest.insert(
            "data",
            PyValue::List(data.into_iter().map(PyValue::Str).collect()),
        );
        manifest.insert("demo", PyValue::List(Vec::new()));
        manifest
    }

    /// Writes `migrations/<version>/pre-migrate.py`, the field-rename worksheet
    pub fn rename(&self, module: &Module, target_dir: &Path) -> Result<PathBuf> {
        let version = module
            .version
            .as_ref()
            .ok_or_else(|| ValidationError::VersionMissing(module.technical_name.clone()))?;
        let dir = target_dir.join("migrations").join(version.to_string());
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join("pre-migrate.py");
        let code = render_migration(
            module
                .models
                .iter()
                .map(|(name, model)| (name.as_str(), model)),
        );
        let mut keep = BTreeSet::new();
        self.write_python(&path, &code, &mut keep)?;
        info!(module = %module.technical_name, path = %path.display(), "Rename worksheet written");
        Ok(path)
    }

    fn write_python(&self, path: &Path, code: &str, keep: &mut BTreeSet<PathBuf>) -> Result<()> {
        let formatted = self
            .formatter
            .format(code)
            .with_context(|| format!("Failed to format {}", path.display()))?;
        fs::write(path, formatted).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Written");
        keep.insert(path.to_path_buf());
        Ok(())
    }

    fn clean(target_dir: &Path, keep: &BTreeSet<PathBuf>) -> Result<Vec<PathBuf>> {
        let entries = WalkDir::new(target_dir)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list {}", target_dir.display()))?;

        let mut removed = Vec::new();
        for entry in entries {
            let path = entry.path();
            if entry.file_type().is_dir() {
                if entry.file_name() == MODELS_DIR {
                    continue;
                }
                let is_empty = fs::read_dir(path)
                    .with_context(|| format!("Failed to list {}", path.display()))?
                    .next()
                    .is_none();
                if is_empty {
                    fs::remove_dir(path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                    removed.push(path.to_path_buf());
                }
            } else if !keep.contains(path) {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed.push(path.to_path_buf());
            }
        }
        debug!(target = %target_dir.display(), removed = removed.len(), "Cleaned");
        Ok(removed)
    }
}
