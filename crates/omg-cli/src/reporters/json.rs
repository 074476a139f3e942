use anyhow::Result;
use omg_core::odoo::Module;
use std::collections::BTreeMap;

/// JSON report generator
pub struct JsonReporter;

impl JsonReporter {
    /// Generates a JSON report
    pub fn generate(&self, modules: &[Module], output_path: Option<&str>) -> Result<()> {
        let mut json_string = self.render(modules)?;
        json_string.push('\n');
        super::emit(&json_string, output_path)
    }

    pub fn render(&self, modules: &[Module]) -> Result<String> {
        let report = serde_json::json!({
            "version": "1.0.0",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "summary": Self::build_summary(modules),
            "modules": modules,
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }

    fn build_summary(modules: &[Module]) -> serde_json::Value {
        let models: usize = modules.iter().map(|m| m.models.len()).sum();
        let new_models = modules
            .iter()
            .flat_map(|m| m.models.values())
            .filter(|model| model.is_new())
            .count();
        let fields: usize = modules.iter().map(Module::field_count).sum();

        // Field types across every module
        let mut fields_by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for field in modules
            .iter()
            .flat_map(|m| m.models.values())
            .flat_map(|model| model.fields.values())
        {
            *fields_by_type.entry(field.type_tag.as_str()).or_insert(0) += 1;
        }

        serde_json::json!({
            "modules": modules.len(),
            "models": models,
            "new_models": new_models,
            "fields": fields,
            "fields_by_type": fields_by_type,
        })
    }
}
