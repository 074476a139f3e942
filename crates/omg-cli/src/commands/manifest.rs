use crate::config::Settings;
use anyhow::{Context, Result};
use colored::Colorize;
use omg_core::codegen::render_manifest;
use omg_core::odoo::manifest::{Manifest, MANIFEST_FILE, MANIFEST_FILES};
use omg_core::odoo::{ModuleScanner, ModuleVersion};
use omg_core::parsers::PyValue;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rewrites the manifest of every module under `path`: configured defaults,
/// then the module's own non-empty values, recognized keys only, in canonical order.
/// Legacy manifest files are replaced by `__manifest__.py`.
pub fn execute_manifest(settings: &Settings, path: &str, version: Option<&str>) -> Result<Vec<PathBuf>> {
    let version = version.map(str::parse::<ModuleVersion>).transpose()?;
    let modules = ModuleScanner::default().scan(Path::new(path))?;
    let formatter = settings.formatter(None);

    let mut written = Vec::with_capacity(modules.len());
    for (name, module) in modules {
        let mut manifest = Manifest::baseline(&settings.manifest);
        manifest.overlay(&module.manifest);
        if let Some(version) = &version {
            manifest.insert("version", PyValue::Str(version.to_string()));
        }

        let target = module.path.join(MANIFEST_FILE);
        let content = formatter.format(&render_manifest(&manifest.ordered()))?;
        fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        for legacy in MANIFEST_FILES.iter().filter(|file| **file != MANIFEST_FILE) {
            let previous = module.path.join(legacy);
            if previous.is_file() {
                fs::remove_file(&previous)
                    .with_context(|| format!("Failed to remove {}", previous.display()))?;
                debug!(module = %name, removed = %previous.display(), "Legacy manifest replaced");
            }
        }
        println!("{} {}", "✓".green(), target.display());
        written.push(target);
    }
    Ok(written)
}
