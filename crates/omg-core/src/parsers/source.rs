use anyhow::{Context, Result};
use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::{parse, Mode};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::location::LineIndex;
use super::repair::{default_strategies, RepairStrategy};
use crate::error::ParseError;

/// Folders whose files never contribute models
pub const EXCLUDED_FOLDERS: [&str; 6] = [
    "report",
    "reports",
    "controller",
    "controllers",
    "wizard",
    "wizards",
];

/// Framework package names; their imports are never followed
const FRAMEWORK_PACKAGES: [&str; 2] = ["odoo", "openerp"];

/// Returns true when the file lives directly under an excluded folder
pub fn is_excluded(path: &Path) -> bool {
    path.parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .map(|name| EXCLUDED_FOLDERS.contains(&name))
        .unwrap_or(false)
}

/// A parsed Python file and the text its syntax tree points into
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub body: Vec<ast::Stmt>,
    /// Names of the repair strategies that were needed, in order
    pub repaired_by: Vec<&'static str>,
    lines: LineIndex,
}

impl SourceFile {
    /// Original source text covered by `node`
    pub fn segment<T: Ranged>(&self, node: &T) -> &str {
        let range = node.range();
        let start: usize = range.start().into();
        let end: usize = range.end().into();
        self.text.get(start..end).unwrap_or("")
    }

    /// 1-based line where `node` starts
    pub fn line_of<T: Ranged>(&self, node: &T) -> usize {
        self.lines.line_of(node.range().start().into())
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Loads Python files, repairing them when the parser rejects the raw text
pub struct SourceLoader {
    strategies: Vec<Box<dyn RepairStrategy>>,
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}

impl SourceLoader {
    pub fn new(strategies: Vec<Box<dyn RepairStrategy>>) -> Self {
        Self { strategies }
    }

    /// Reads and parses `dir/filename`
    pub fn parse(&self, dir: &Path, filename: &str) -> Result<SourceFile> {
        let path = dir.join(filename);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(self.parse_text(&path, text)?)
    }

    /// Parses already loaded text; repairs are applied cumulatively
    pub fn parse_text(&self, path: &Path, text: String) -> Result<SourceFile, ParseError> {
        let source_path = path.to_string_lossy();
        let mut text = text;
        let mut repaired_by = Vec::new();
        let mut last_error = match parse(&text, Mode::Module, &source_path) {
            Ok(parsed) => return Ok(Self::build(path, text, parsed, repaired_by)),
            Err(err) => err.to_string(),
        };

        for strategy in &self.strategies {
            text = strategy.repair(&text);
            repaired_by.push(strategy.name());
            match parse(&text, Mode::Module, &source_path) {
                Ok(parsed) => {
                    debug!(
                        file = %path.display(),
                        repairs = ?repaired_by,
                        "Parsed after repair"
                    );
                    return Ok(Self::build(path, text, parsed, repaired_by));
                }
                Err(err) => last_error = err.to_string(),
            }
        }

        Err(ParseError::SourceNotParsable {
            path: path.to_path_buf(),
            message: last_error,
        })
    }

    fn build(
        path: &Path,
        text: String,
        parsed: ast::Mod,
        repaired_by: Vec<&'static str>,
    ) -> SourceFile {
        let body = match parsed {
            ast::Mod::Module(module) => module.body,
            _ => Vec::new(),
        };
        SourceFile {
            path: path.to_path_buf(),
            lines: LineIndex::new(&text),
            text,
            body,
            repaired_by,
        }
    }
}

/// Where an import statement leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A file of the module being scanned
    Local(PathBuf),
    /// Another addon, recorded as a dependency and never followed
    CrossModule(String),
}

/// Resolves import statements against one module directory
pub struct ImportResolver<'a> {
    module_root: &'a Path,
    technical_name: &'a str,
}

impl<'a> ImportResolver<'a> {
    pub fn new(module_root: &'a Path, technical_name: &'a str) -> Self {
        Self {
            module_root,
            technical_name,
        }
    }

    /// Every import target of `file`, in source order
    pub fn resolve_imports(&self, file: &SourceFile) -> Vec<ImportTarget> {
        file.body
            .iter()
            .flat_map(|stmt| self.resolve_stmt(file, stmt))
            .collect()
    }

    /// Import targets of one top-level statement
    pub fn resolve_stmt(&self, file: &SourceFile, stmt: &ast::Stmt) -> Vec<ImportTarget> {
        match stmt {
            ast::Stmt::Import(import) => import
                .names
                .iter()
                .flat_map(|alias| {
                    let name = alias.name.as_str();
                    match self.absolute_target(name) {
                        Some(target) => vec![target],
                        None => self.implicit_relative(file, name, &[]),
                    }
                })
                .collect(),
            ast::Stmt::ImportFrom(import) => {
                let level = import.level.map(|level| level.to_u32()).unwrap_or(0);
                let module = import.module.as_ref().map(|m| m.as_str());
                let names: Vec<&str> = import.names.iter().map(|a| a.name.as_str()).collect();
                if level == 0 {
                    let Some(module) = module else {
                        return Vec::new();
                    };
                    let mut targets: Vec<ImportTarget> =
                        self.absolute_target(module).into_iter().collect();
                    // from odoo.addons import other_module
                    if targets.is_empty() && Self::is_addons_package(module) {
                        targets.extend(
                            names
                                .iter()
                                .filter(|name| **name != self.technical_name && **name != "*")
                                .map(|name| ImportTarget::CrossModule(name.to_string())),
                        );
                    } else if targets.is_empty() {
                        targets = self.implicit_relative(file, module, &names);
                    }
                    return targets;
                }
                self.relative_targets(file.dir(), level, module, &names)
            }
            _ => Vec::new(),
        }
    }

    fn is_addons_package(module: &str) -> bool {
        FRAMEWORK_PACKAGES
            .iter()
            .any(|package| module == format!("{}.addons", package))
    }

    /// Legacy `import models` style: a sibling file or package when one exists,
    /// nothing for framework and third-party names
    fn implicit_relative(
        &self,
        file: &SourceFile,
        module: &str,
        names: &[&str],
    ) -> Vec<ImportTarget> {
        let root = module.split('.').next().unwrap_or(module);
        if FRAMEWORK_PACKAGES.contains(&root) {
            return Vec::new();
        }
        self.relative_targets(file.dir(), 1, Some(module), names)
    }

    /// `odoo.addons.<other>` is a dependency, other framework imports are ignored
    fn absolute_target(&self, module: &str) -> Option<ImportTarget> {
        let mut parts = module.split('.');
        let root = parts.next()?;
        if !FRAMEWORK_PACKAGES.contains(&root) {
            return None;
        }
        if parts.next() != Some("addons") {
            return None;
        }
        let addon = parts.next()?;
        (addon != self.technical_name).then(|| ImportTarget::CrossModule(addon.to_string()))
    }

    fn relative_targets(
        &self,
        file_dir: &Path,
        level: u32,
        module: Option<&str>,
        names: &[&str],
    ) -> Vec<ImportTarget> {
        let mut base = file_dir.to_path_buf();
        for _ in 1..level {
            if !base.pop() {
                return Vec::new();
            }
        }

        if !base.starts_with(self.module_root) {
            // Climbed out of the module: the first segment names another addon
            let addon = module
                .and_then(|m| m.split('.').next())
                .map(|m| vec![m.to_string()])
                .unwrap_or_else(|| names.iter().map(|n| n.to_string()).collect());
            return addon
                .into_iter()
                .filter(|name| name != self.technical_name && name != "*")
                .map(ImportTarget::CrossModule)
                .collect();
        }

        let mut targets = Vec::new();
        match module {
            Some(module) => {
                let package = module.split('.').fold(base, |path, part| path.join(part));
                if let Some(file) = Self::python_file(&package) {
                    let is_package = file.ends_with("__init__.py");
                    targets.push(ImportTarget::Local(file));
                    if is_package {
                        targets.extend(Self::submodules(&package, names));
                    }
                }
            }
            None => targets.extend(Self::submodules(&base, names)),
        }
        targets
    }

    fn submodules(package: &Path, names: &[&str]) -> Vec<ImportTarget> {
        names
            .iter()
            .filter(|name| **name != "*")
            .filter_map(|name| Self::python_file(&package.join(name)))
            .map(ImportTarget::Local)
            .collect()
    }

    /// `<path>.py`, then `<path>/__init__.py`
    fn python_file(path: &Path) -> Option<PathBuf> {
        let file = path.with_extension("py");
        if file.is_file() {
            return Some(file);
        }
        let init = path.join("__init__.py");
        init.is_file().then_some(init)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_valid_source_without_repair() {
        let loader = SourceLoader::default();
        let file = loader
            .parse_text(Path::new("a.py"), "x = 1\ny = 2\n".to_string())
            .unwrap();
        assert_eq!(file.body.len(), 2);
        assert!(file.repaired_by.is_empty());
        assert_eq!(file.line_of(&file.body[1]), 2);
        assert_eq!(file.segment(&file.body[1]), "y = 2");
    }

    #[test]
    fn repairs_cumulatively() {
        let source = "class A:\n\tdef f(self):\n\t\ttry:\n\t\t\tpass\n\t\texcept Exception, e:\n\t\t\tpass\n";
        let file = SourceLoader::default()
            .parse_text(Path::new("legacy.py"), source.to_string())
            .unwrap();
        assert_eq!(file.repaired_by, vec!["expand-tabs", "legacy-port"]);
    }

    #[test]
    fn reports_last_parser_message() {
        let err = SourceLoader::default()
            .parse_text(Path::new("broken.py"), "def (:\n".to_string())
            .unwrap_err();
        match err {
            ParseError::SourceNotParsable { path, message } => {
                assert_eq!(path, PathBuf::from("broken.py"));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn excludes_wizard_and_report_files() {
        assert!(is_excluded(Path::new("/m/wizard/w.py")));
        assert!(is_excluded(Path::new("/m/reports/r.py")));
        assert!(!is_excluded(Path::new("/m/models/partner.py")));
    }

    #[test]
    fn resolves_local_and_cross_module_imports() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("sale_ext");
        fs::create_dir_all(root.join("models")).unwrap();
        fs::write(root.join("models/__init__.py"), "from . import order\n").unwrap();
        fs::write(root.join("models/order.py"), "").unwrap();
        fs::write(root.join("utils.py"), "").unwrap();
        let init = "\
from . import models, utils, missing
from odoo import api, fields
from odoo.addons.sale.models import sale_order
from odoo.addons.sale_ext import models as own
import logging
";
        fs::write(root.join("__init__.py"), init).unwrap();

        let file = SourceLoader::default().parse(&root, "__init__.py").unwrap();
        let resolver = ImportResolver::new(&root, "sale_ext");
        assert_eq!(
            resolver.resolve_imports(&file),
            vec![
                ImportTarget::Local(root.join("models/__init__.py")),
                ImportTarget::Local(root.join("utils.py")),
                ImportTarget::CrossModule("sale".to_string()),
            ]
        );

        let models = SourceLoader::default()
            .parse(&root.join("models"), "__init__.py")
            .unwrap();
        assert_eq!(
            resolver.resolve_imports(&models),
            vec![ImportTarget::Local(root.join("models/order.py"))]
        );
    }

    #[test]
    fn legacy_implicit_imports_resolve_siblings() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("legacy");
        fs::create_dir_all(root.join("wizard")).unwrap();
        fs::write(root.join("wizard/__init__.py"), "").unwrap();
        fs::write(root.join("wizard/confirm.py"), "").unwrap();
        fs::write(root.join("models.py"), "").unwrap();
        let init = "\
import models
import logging
import openerp.tools
from wizard import confirm
";
        fs::write(root.join("__init__.py"), init).unwrap();

        let file = SourceLoader::default().parse(&root, "__init__.py").unwrap();
        let resolver = ImportResolver::new(&root, "legacy");
        assert_eq!(
            resolver.resolve_imports(&file),
            vec![
                ImportTarget::Local(root.join("models.py")),
                ImportTarget::Local(root.join("wizard/__init__.py")),
                ImportTarget::Local(root.join("wizard/confirm.py")),
            ]
        );
    }

    #[test]
    fn relative_import_above_root_is_a_dependency() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("mod_a");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("__init__.py"), "from ..mod_b.models import thing\n").unwrap();
        let file = SourceLoader::default().parse(&root, "__init__.py").unwrap();
        let resolver = ImportResolver::new(&root, "mod_a");
        assert_eq!(
            resolver.resolve_imports(&file),
            vec![ImportTarget::CrossModule("mod_b".to_string())]
        );
    }
}
