//! New modules from built-in templates.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::codegen::{camel_case, human_readable, render_init, render_manifest, snake_case};
use crate::codegen::{BuiltinFormatter, CodeFormatter};
use crate::error::{RenderError, ValidationError};
use crate::odoo::manifest::{Manifest, ManifestDefaults, INIT_FILE, MANIFEST_FILE};
use crate::odoo::security::{CrudLevel, ModelAccessHelper, ACCESS_FILE, DEFAULT_GROUP};
use crate::odoo::ModuleVersion;
use crate::parsers::PyValue;

/// Group given full rights on scaffolded models
pub const MANAGER_GROUP: &str = "base.group_system";

const DIRECTORIES: [&str; 4] = ["models", "security", "views", "static/description"];

const TEMPLATES: [(&str, &str); 3] = [
    ("model.py", include_str!("../templates/model.py.tmpl")),
    ("views.xml", include_str!("../templates/views.xml.tmpl")),
    ("index.html", include_str!("../templates/index.html.tmpl")),
];

/// Renders a named template with string variables
pub trait TemplateRenderer {
    fn render(&self, template_id: &str, context: &BTreeMap<String, String>) -> Result<String>;
}

/// Templates compiled into the binary, `{{ variable }}` placeholders
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTemplates;

fn placeholder() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").ok())
        .as_ref()
}

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, template_id: &str, context: &BTreeMap<String, String>) -> Result<String> {
        let template = TEMPLATES
            .iter()
            .find(|(id, _)| *id == template_id)
            .map(|(_, content)| *content)
            .ok_or_else(|| RenderError::TemplateNotFound(template_id.to_string()))?;

        let Some(placeholder) = placeholder() else {
            bail!("Template placeholder pattern failed to compile");
        };

        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for captures in placeholder.captures_iter(template) {
            let (Some(whole), Some(variable)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let value = context.get(variable.as_str()).ok_or_else(|| {
                RenderError::MissingVariable {
                    template: template_id.to_string(),
                    variable: variable.as_str().to_string(),
                }
            })?;
            out.push_str(&template[last..whole.start()]);
            out.push_str(value);
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `my_module` -> `My module`
fn humanize(technical_name: &str) -> String {
    let spaced = technical_name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn validate_model_name(model: &str) -> Result<(), ValidationError> {
    static MODEL_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    let valid = MODEL_NAME
        .get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z0-9_]+)*$").ok())
        .as_ref()
        .map(|re| re.is_match(model))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::ModelNameInvalid(model.to_string()))
    }
}

/// What to put in a scaffolded module
#[derive(Debug, Clone, Default)]
pub struct ScaffoldOptions {
    /// Display name; derived from the directory name when absent
    pub name: Option<String>,
    /// Model to create along with its views, action and menu
    pub model: Option<String>,
    /// Five-part version
    pub version: Option<String>,
    pub depends: Vec<String>,
}

/// Creates new module directories
pub struct ModuleScaffold {
    renderer: Box<dyn TemplateRenderer>,
    formatter: Box<dyn CodeFormatter>,
    defaults: ManifestDefaults,
}

impl Default for ModuleScaffold {
    fn default() -> Self {
        Self::new(
            Box::new(BuiltinTemplates),
            Box::new(BuiltinFormatter),
            ManifestDefaults::default(),
        )
    }
}

impl ModuleScaffold {
    pub fn new(
        renderer: Box<dyn TemplateRenderer>,
        formatter: Box<dyn CodeFormatter>,
        defaults: ManifestDefaults,
    ) -> Self {
        Self {
            renderer,
            formatter,
            defaults,
        }
    }

    /// Creates the module at `target`; refuses to touch an existing module
    pub fn generate(&self, target: &Path, options: &ScaffoldOptions) -> Result<Vec<PathBuf>> {
        let Some(technical_name) = target.file_name().map(|n| n.to_string_lossy().into_owned())
        else {
            bail!("Cannot derive a module name from {}", target.display());
        };
        if let Some(existing) = Manifest::find(target) {
            bail!("{} already contains a manifest", existing.display());
        }
        let version = options
            .version
            .as_deref()
            .map(str::parse::<ModuleVersion>)
            .transpose()?;
        if let Some(model) = &options.model {
            validate_model_name(model)?;
        }

        for dir in DIRECTORIES {
            let path = target.join(dir);
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }

        let name = options
            .name
            .clone()
            .unwrap_or_else(|| humanize(&technical_name));
        let mut context = BTreeMap::new();
        context.insert("module_name".to_string(), technical_name.clone());
        context.insert("name".to_string(), name.clone());
        context.insert("summary".to_string(), name.clone());

        let mut written = Vec::new();
        let mut model_files = Vec::new();
        let mut data = Vec::new();

        if let Some(model) = &options.model {
            let slug = snake_case(model);
            context.insert("model_name".to_string(), model.clone());
            context.insert("class_name".to_string(), camel_case(model));
            context.insert("model_description".to_string(), human_readable(model));
            context.insert("model_slugified".to_string(), slug.clone());

            let code = self.renderer.render("model.py", &context)?;
            written.push(self.write_python(&target.join("models").join(format!("{}.py", slug)), &code)?);
            model_files.push(slug.clone());

            let mut access = ModelAccessHelper::new();
            access.add(model, DEFAULT_GROUP, CrudLevel::NO_UNLINK, None);
            access.add(model, MANAGER_GROUP, CrudLevel::FULL, Some("manager"));
            if let Some(path) = access.save(target)? {
                written.push(path);
                data.push(ACCESS_FILE.to_string());
            }

            let xml_context = context
                .iter()
                .map(|(key, value)| (key.clone(), xml_escape(value)))
                .collect();
            let views = self.renderer.render("views.xml", &xml_context)?;
            let views_file = format!("views/{}_views.xml", slug);
            written.push(self.write(&target.join(&views_file), &views)?);
            data.push(views_file);
        }

        written.push(self.write_python(&target.join("models").join(INIT_FILE), &render_init(&model_files))?);
        written.push(self.write_python(&target.join(INIT_FILE), &render_init(&["models".to_string()]))?);

        let html_context = context
            .iter()
            .map(|(key, value)| (key.clone(), xml_escape(value)))
            .collect();
        let index = self.renderer.render("index.html", &html_context)?;
        written.push(self.write(&target.join("static/description/index.html"), &index)?);

        let mut manifest = Manifest::baseline(&self.defaults);
        manifest.insert("name", PyValue::Str(name.clone()));
        manifest.insert("summary", PyValue::Str(name));
        if let Some(version) = version {
            manifest.insert("version", PyValue::Str(version.to_string()));
        }
        if !options.depends.is_empty() {
            manifest.insert(
                "depends",
                PyValue::List(options.depends.iter().cloned().map(PyValue::Str).collect()),
            );
        }
        manifest.insert("data", PyValue::List(data.into_iter().map(PyValue::Str).collect()));
        written.push(self.write_python(&target.join(MANIFEST_FILE), &render_manifest(&manifest.ordered()))?);

        info!(module = %technical_name, files = written.len(), "Module scaffolded");
        Ok(written)
    }

    fn write_python(&self, path: &Path, code: &str) -> Result<PathBuf> {
        let formatted = self.formatter.format(code)?;
        self.write(path, &formatted)
    }

    fn write(&self, path: &Path, content: &str) -> Result<PathBuf> {
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Written");
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_placeholders() {
        let rendered = BuiltinTemplates
            .render(
                "index.html",
                &context(&[("name", "Helpdesk"), ("summary", "Tickets")]),
            )
            .unwrap();
        assert!(rendered.contains("<h2 class=\"oe_slogan\">Helpdesk</h2>"));
        assert!(rendered.contains("<h3 class=\"oe_slogan\">Tickets</h3>"));
    }

    #[test]
    fn reports_missing_variables_and_templates() {
        let err = BuiltinTemplates
            .render("index.html", &context(&[("name", "x")]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::MissingVariable { variable, .. }) if variable == "summary"
        ));
        let err = BuiltinTemplates.render("nope", &BTreeMap::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn scaffolds_module_with_model() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("helpdesk_lite");
        let options = ScaffoldOptions {
            model: Some("helpdesk.ticket".into()),
            version: Some("17.0.1.0.0".into()),
            ..Default::default()
        };
        ModuleScaffold::default().generate(&target, &options).unwrap();

        let model = fs::read_to_string(target.join("models/helpdesk_ticket.py")).unwrap();
        assert!(model.contains("class HelpdeskTicket(models.Model):"));
        assert!(model.contains("_description = \"Helpdesk Ticket\""));
        assert_eq!(
            fs::read_to_string(target.join("models/__init__.py")).unwrap(),
            "from . import helpdesk_ticket\n"
        );

        let csv = fs::read_to_string(target.join(ACCESS_FILE)).unwrap();
        assert!(csv.contains("access_helpdesk_ticket,access_helpdesk_ticket,model_helpdesk_ticket,base.group_user,1,1,1,0"));
        assert!(csv.contains("access_helpdesk_ticket_manager,"));

        let views = fs::read_to_string(target.join("views/helpdesk_ticket_views.xml")).unwrap();
        assert!(views.contains("<field name=\"res_model\">helpdesk.ticket</field>"));
        assert!(views.contains("name=\"Helpdesk lite\""));

        let manifest = Manifest::load(&target.join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.name(), Some("Helpdesk lite"));
        assert_eq!(manifest.version(), Some("17.0.1.0.0"));
        assert_eq!(
            manifest.data(),
            vec!["security/ir.model.access.csv", "views/helpdesk_ticket_views.xml"]
        );
        assert!(target.join("static/description/index.html").is_file());
    }

    #[test]
    fn refuses_existing_module() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("existing");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("__openerp__.py"), "{}").unwrap();
        assert!(ModuleScaffold::default()
            .generate(&target, &ScaffoldOptions::default())
            .is_err());
    }

    #[test]
    fn rejects_bad_model_and_version() {
        let dir = tempdir().unwrap();
        let scaffold = ModuleScaffold::default();
        let bad_model = ScaffoldOptions {
            model: Some("Bad Model".into()),
            ..Default::default()
        };
        let err = scaffold.generate(&dir.path().join("a"), &bad_model).unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());

        let bad_version = ScaffoldOptions {
            version: Some("17.0".into()),
            ..Default::default()
        };
        let err = scaffold.generate(&dir.path().join("b"), &bad_version).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::VersionFormatInvalid(_))
        ));
        assert!(!dir.path().join("b").exists());
    }
}
