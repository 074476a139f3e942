use anyhow::{bail, Result};
use indexmap::IndexMap;
use rustpython_parser::ast;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::classifier::ModelClassifier;
use super::manifest::{Manifest, INIT_FILE};
use super::model::ModelBuilder;
use super::module::Module;
use crate::error::ParseError;
use crate::parsers::{is_excluded, ImportResolver, ImportTarget, SourceLoader};

/// Finds addons under a directory and extracts their models
#[derive(Default)]
pub struct ModuleScanner {
    loader: SourceLoader,
}

/// Hidden entries and bytecode caches; never scanned nor cleaned
pub(super) fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.') || name == "__pycache__")
            .unwrap_or(false)
}

impl ModuleScanner {
    pub fn new(loader: SourceLoader) -> Self {
        Self { loader }
    }

    /// Depth-first walk in file-name order. A directory holding an addon is
    /// not descended into; directories failing discovery are logged and their
    /// children still visited.
    pub fn scan(&self, root: &Path) -> Result<IndexMap<String, Module>> {
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }

        let mut modules: IndexMap<String, Module> = IndexMap::new();
        let mut walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_type().is_dir() && !is_skipped(entry));

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Cannot read directory");
                    continue;
                }
            };

            match self.discover(entry.path()) {
                Ok(Some(module)) => {
                    walker.skip_current_dir();
                    if let Some(previous) = modules.get(&module.technical_name) {
                        warn!(
                            module = %module.technical_name,
                            kept = %previous.path.display(),
                            ignored = %module.path.display(),
                            "Duplicate module name"
                        );
                        continue;
                    }
                    modules.insert(module.technical_name.clone(), module);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %format!("{:#}", err), "Module discovery failed");
                }
            }
        }

        info!(root = %root.display(), modules = modules.len(), "Scan finished");
        Ok(modules)
    }

    /// Single-directory discovery: manifest and init script must both be here
    pub fn discover(&self, dir: &Path) -> Result<Option<Module>> {
        let Some(manifest_path) = Manifest::find(dir) else {
            return Ok(None);
        };
        if !dir.join(INIT_FILE).is_file() {
            debug!(path = %dir.display(), "Manifest without init script");
            return Ok(None);
        }

        let manifest = match Manifest::load(&manifest_path) {
            Ok(manifest) => manifest,
            Err(err)
                if matches!(
                    err.downcast_ref::<ParseError>(),
                    Some(ParseError::ManifestMalformed { .. })
                ) =>
            {
                debug!(path = %manifest_path.display(), error = %err, "Ignoring malformed manifest");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let dir = match dir.file_name() {
            Some(_) => dir.to_path_buf(),
            None => dir.canonicalize()?,
        };
        let technical_name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut module = Module::new(dir.clone(), technical_name, manifest);
        self.parse_file(&mut module, &dir.join(INIT_FILE))?;
        debug!(
            module = %module.technical_name,
            files = module.visited_files.len(),
            models = module.models.len(),
            "Module discovered"
        );
        Ok(Some(module))
    }

    /// Parses one file, following its imports in statement order
    fn parse_file(&self, module: &mut Module, path: &Path) -> Result<()> {
        if is_excluded(path) || !module.visited_files.insert(path.to_path_buf()) {
            return Ok(());
        }
        let (Some(dir), Some(filename)) = (path.parent(), path.file_name()) else {
            return Ok(());
        };
        let file = self.loader.parse(dir, &filename.to_string_lossy())?;
        if !file.repaired_by.is_empty() {
            debug!(file = %path.display(), repairs = ?file.repaired_by, "Source repaired");
        }

        let root: PathBuf = module.path.clone();
        let technical_name = module.technical_name.clone();
        let resolver = ImportResolver::new(&root, &technical_name);
        let builder = ModelBuilder::new(&file);

        for stmt in &file.body {
            match stmt {
                ast::Stmt::Import(_) | ast::Stmt::ImportFrom(_) => {
                    for target in resolver.resolve_stmt(&file, stmt) {
                        match target {
                            ImportTarget::Local(target) => self.parse_file(module, &target)?,
                            ImportTarget::CrossModule(name) => {
                                module.imports.insert(name);
                            }
                        }
                    }
                }
                ast::Stmt::ClassDef(class) if ModelClassifier::is_model(class) => {
                    module.add_model(builder.build(class));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn manifest_without_init_is_not_a_module() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("half");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("__manifest__.py"), "{'name': 'Half'}").unwrap();
        assert!(ModuleScanner::default().discover(&module).unwrap().is_none());
    }

    #[test]
    fn malformed_manifest_is_not_a_module() {
        let dir = tempdir().unwrap();
        let module = dir.path().join("bad");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("__manifest__.py"), "{'name': compute()}").unwrap();
        fs::write(module.join("__init__.py"), "").unwrap();
        assert!(ModuleScanner::default().discover(&module).unwrap().is_none());
    }

    #[test]
    fn scanning_a_file_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.py");
        fs::write(&file, "").unwrap();
        assert!(ModuleScanner::default().scan(&file).is_err());
    }
}
