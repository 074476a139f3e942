use anyhow::{Context, Result};
use indexmap::IndexMap;
use rustpython_parser::ast;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ParseError;
use crate::parsers::{PyValue, SourceLoader};

/// Manifest file names, newest first
pub const MANIFEST_FILES: [&str; 3] = ["__manifest__.py", "__odoo__.py", "__openerp__.py"];

/// File written by the generator
pub const MANIFEST_FILE: &str = "__manifest__.py";

pub const INIT_FILE: &str = "__init__.py";

/// Keys written back, in this order
pub const MANIFEST_KEYS: [&str; 17] = [
    "name",
    "summary",
    "description",
    "version",
    "category",
    "author",
    "mainteners",
    "website",
    "license",
    "depends",
    "external_dependencies",
    "data",
    "demo",
    "assets",
    "installable",
    "auto_install",
    "application",
];

/// Values every generated manifest starts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestDefaults {
    pub author: String,
    pub website: String,
    pub license: String,
    pub category: String,
    pub mainteners: Vec<String>,
}

impl Default for ManifestDefaults {
    fn default() -> Self {
        Self {
            author: String::new(),
            website: String::new(),
            license: "LGPL-3".to_string(),
            category: "Uncategorized".to_string(),
            mainteners: Vec::new(),
        }
    }
}

/// Module manifest: a literal dict
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    values: IndexMap<String, PyValue>,
}

impl Manifest {
    /// First manifest file present in `dir`
    pub fn find(dir: &Path) -> Option<PathBuf> {
        MANIFEST_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Ok(Self::parse(path, &text)?)
    }

    /// Evaluates the single dict expression of a manifest file
    pub fn parse(path: &Path, text: &str) -> Result<Self, ParseError> {
        let malformed = |reason: String| ParseError::ManifestMalformed {
            path: path.to_path_buf(),
            reason,
        };
        let file = SourceLoader::default()
            .parse_text(path, text.to_string())
            .map_err(|err| malformed(err.to_string()))?;

        let mut expressions = file.body.iter().filter_map(|stmt| match stmt {
            ast::Stmt::Expr(expr) => Some(expr.value.as_ref()),
            _ => None,
        });
        let (Some(expr), None) = (expressions.next(), expressions.next()) else {
            return Err(malformed("expected a single dict expression".to_string()));
        };

        match PyValue::from_expr(expr) {
            Ok(PyValue::Dict(values)) => Ok(Self { values }),
            Ok(other) => Err(malformed(format!("expected a dict, got {}", other.to_python()))),
            Err(err) => Err(malformed(err.to_string())),
        }
    }

    /// Starting point of generated manifests
    pub fn baseline(defaults: &ManifestDefaults) -> Self {
        let mut manifest = Self::default();
        for (key, value) in [
            ("author", &defaults.author),
            ("website", &defaults.website),
            ("license", &defaults.license),
            ("category", &defaults.category),
        ] {
            if !value.is_empty() {
                manifest.insert(key, PyValue::Str(value.clone()));
            }
        }
        if !defaults.mainteners.is_empty() {
            manifest.insert(
                "mainteners",
                PyValue::List(defaults.mainteners.iter().cloned().map(PyValue::Str).collect()),
            );
        }
        manifest.insert("depends", PyValue::List(vec![PyValue::Str("base".to_string())]));
        manifest.insert("external_dependencies", PyValue::Dict(IndexMap::new()));
        manifest.insert("data", PyValue::List(Vec::new()));
        manifest.insert("demo", PyValue::List(Vec::new()));
        manifest.insert("installable", PyValue::Bool(true));
        manifest.insert("auto_install", PyValue::Bool(false));
        manifest.insert("application", PyValue::Bool(false));
        manifest
    }

    /// Copies every non-empty value of `other` over this manifest
    pub fn overlay(&mut self, other: &Manifest) {
        for (key, value) in &other.values {
            if value.is_truthy() {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&PyValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: &str, value: PyValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(PyValue::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version").and_then(PyValue::as_str)
    }

    pub fn depends(&self) -> Vec<String> {
        self.get("depends")
            .map(PyValue::string_items)
            .unwrap_or_default()
    }

    pub fn data(&self) -> Vec<String> {
        self.get("data").map(PyValue::string_items).unwrap_or_default()
    }

    /// Recognized keys in write order; unknown keys are left out
    pub fn ordered(&self) -> IndexMap<String, PyValue> {
        MANIFEST_KEYS
            .iter()
            .filter_map(|key| {
                self.values
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect()
    }

    pub fn values(&self) -> &IndexMap<String, PyValue> {
        &self.values
    }
}
