use anyhow::Result;
use omg_core::odoo::{Model, Module};

/// Markdown report generator
pub struct MarkdownReporter;

/// Pipes would end the table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl MarkdownReporter {
    /// Generates the inspection report
    pub fn generate(&self, modules: &[Module], output_path: Option<&str>) -> Result<()> {
        super::emit(&self.render(modules), output_path)
    }

    pub fn render(&self, modules: &[Module]) -> String {
        let mut report = String::new();

        report.push_str("# Odoo Module Inspection Report\n\n");
        report.push_str(&format!(
            "## Inspection Date\n{}\n\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));

        let models: usize = modules.iter().map(|m| m.models.len()).sum();
        let new_models = modules
            .iter()
            .flat_map(|m| m.models.values())
            .filter(|model| model.is_new())
            .count();
        let fields: usize = modules.iter().map(Module::field_count).sum();

        report.push_str("## Statistics\n\n");
        report.push_str(&format!("- **Modules**: {}\n", modules.len()));
        report.push_str(&format!("- **Models**: {}\n", models));
        report.push_str(&format!("  - New: {}\n", new_models));
        report.push_str(&format!("  - Extensions: {}\n", models - new_models));
        report.push_str(&format!("- **Fields**: {}\n\n", fields));

        if modules.is_empty() {
            report.push_str("No module found.\n");
            return report;
        }

        report.push_str("## Modules\n\n");
        for module in modules {
            Self::push_module(&mut report, module);
        }
        report
    }

    fn push_module(report: &mut String, module: &Module) {
        match module.manifest.name() {
            Some(name) => report.push_str(&format!("### `{}` ({})\n\n", module.technical_name, name)),
            None => report.push_str(&format!("### `{}`\n\n", module.technical_name)),
        }
        report.push_str(&format!("- Path: `{}`\n", module.path.display()));
        if let Some(version) = module.manifest.version() {
            report.push_str(&format!("- Version: {}\n", version));
        }
        let depends = module.manifest.depends();
        if !depends.is_empty() {
            report.push_str(&format!("- Depends: {}\n", depends.join(", ")));
        }
        if !module.imports.is_empty() {
            let imports: Vec<&str> = module.imports.iter().map(String::as_str).collect();
            report.push_str(&format!("- Imports from: {}\n", imports.join(", ")));
        }
        report.push_str(&format!("- Files parsed: {}\n\n", module.visited_files.len()));

        if module.models.is_empty() {
            report.push_str("No model.\n\n");
            return;
        }

        report.push_str("| Model | Kind | Flavor | Fields |\n");
        report.push_str("|-------|------|--------|--------|\n");
        for (name, model) in &module.models {
            let kind = if model.is_new() { "new" } else { "extension" };
            report.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                name,
                kind,
                model.flavor,
                model.fields.len()
            ));
        }
        report.push('\n');

        for (name, model) in module.written_models() {
            Self::push_fields(report, name, model);
        }
    }

    fn push_fields(report: &mut String, name: &str, model: &Model) {
        report.push_str(&format!("#### `{}`\n\n", name));
        report.push_str("| Field | Type | Arguments |\n");
        report.push_str("|-------|------|-----------|\n");
        for field in model.fields.values() {
            report.push_str(&format!(
                "| `{}` | {} | `{}` |\n",
                field.name,
                field.type_tag,
                cell(&field.arguments().join(", "))
            ));
        }
        report.push('\n');
    }
}
