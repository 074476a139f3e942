//! Python source generation for skeleton modules.

pub mod format;

pub use format::{BuiltinFormatter, CodeFormatter, ExternalFormatter};

use indexmap::IndexMap;

use crate::odoo::{Field, Model};
use crate::parsers::{quote_str, PyValue, LINE_LENGTH};

pub const CODING_HEADER: &str = "# -*- coding: utf-8 -*-";

const INDENT: &str = "    ";

/// Capitalizes the first letter and lowercases the rest
fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `res.partner` -> `ResPartner`
pub fn camel_case(model_name: &str) -> String {
    model_name.split('.').map(capitalize).collect()
}

/// `res.partner` -> `Res Partner`
pub fn human_readable(model_name: &str) -> String {
    model_name
        .split('.')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `res.partner` -> `res_partner`
pub fn snake_case(model_name: &str) -> String {
    model_name.replace('.', "_")
}

/// `from . import a` lines
pub fn render_init(modules: &[String]) -> String {
    modules
        .iter()
        .map(|module| format!("from . import {}\n", module))
        .collect()
}

/// Manifest file content: coding header and one key per line
pub fn render_manifest(values: &IndexMap<String, PyValue>) -> String {
    format!(
        "{}\n{}\n",
        CODING_HEADER,
        PyValue::render_dict_block(values)
    )
}

/// Class-level field assignment, wrapped the way black wraps calls
pub fn render_field(field: &Field, indent: &str) -> String {
    let single = format!("{}{}", indent, field.declaration());
    if single.chars().count() <= LINE_LENGTH {
        return single;
    }

    let head = format!("{}{} = fields.{}(", indent, field.name, field.type_tag);
    let arguments = field.arguments();
    let inner_indent = format!("{}{}", indent, INDENT);
    let hugged = format!("{}{}", inner_indent, arguments.join(", "));
    if hugged.chars().count() <= LINE_LENGTH && !hugged.contains('\n') {
        return format!("{}\n{}\n{})", head, hugged, indent);
    }

    let mut lines = vec![head];
    lines.extend(
        arguments
            .iter()
            .map(|argument| format!("{}{},", inner_indent, argument)),
    );
    lines.push(format!("{})", indent));
    lines.join("\n")
}

/// Minimal model file: imports and the class with its declarations and fields.
/// Returns `None` for models without a name.
pub fn render_model(model: &Model) -> Option<String> {
    let name = model.effective_name()?;
    let class_name = camel_case(name);

    let inherit: Vec<&String> = model
        .inherited_names
        .iter()
        .filter(|inherited| !(model.is_new() && inherited.as_str() == name))
        .collect();
    let declares_name = model.is_new()
        || model
            .declared_name
            .as_deref()
            .map(|declared| !model.inherited_names.contains(declared))
            .unwrap_or(false);

    let mut body = Vec::new();
    if declares_name {
        body.push(format!("{}_name = {}", INDENT, quote_str(name)));
    }
    if model.is_new() {
        let description = model
            .description
            .clone()
            .unwrap_or_else(|| human_readable(name));
        body.push(format!("{}_description = {}", INDENT, quote_str(&description)));
    }
    match inherit.as_slice() {
        [] => {}
        [single] => body.push(format!("{}_inherit = {}", INDENT, quote_str(single))),
        many => {
            let value = PyValue::List(many.iter().map(|n| PyValue::Str(n.to_string())).collect());
            body.push(value.render_at("_inherit = ", INDENT.len(), ""));
        }
    }
    if !model.inherits_map.is_empty() {
        let value = PyValue::Dict(
            model
                .inherits_map
                .iter()
                .map(|(comodel, field)| (comodel.clone(), PyValue::Str(field.clone())))
                .collect(),
        );
        body.push(value.render_at("_inherits = ", INDENT.len(), ""));
    }

    let fields: Vec<String> = model
        .fields
        .values()
        .map(|field| render_field(field, INDENT))
        .collect();

    let mut out = String::from("from odoo import fields, models\n\n\n");
    out.push_str(&format!(
        "class {}({}):\n",
        class_name,
        model.flavor.base_class()
    ));
    out.push_str(&body.join("\n"));
    if !body.is_empty() && !fields.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(&fields.join("\n"));
    if body.is_empty() && fields.is_empty() {
        out.push_str(INDENT);
        out.push_str("pass");
    }
    out.push('\n');
    Some(out)
}

/// Pre-migration script holding the field-rename worksheet of every model
pub fn render_migration<'a>(models: impl IntoIterator<Item = (&'a str, &'a Model)>) -> String {
    let mut worksheet = Vec::new();
    for (name, model) in models {
        if model.is_empty() {
            continue;
        }
        let mut lines = vec![format!("{}{}: {{", INDENT, quote_str(name))];
        lines.extend(
            model
                .fields
                .keys()
                .map(|field| format!("{}{}{}: \"\",", INDENT, INDENT, quote_str(field))),
        );
        lines.push(format!("{}}},", INDENT));
        worksheet.push(lines.join("\n"));
    }
    let renames = if worksheet.is_empty() {
        "field_renames = {}".to_string()
    } else {
        format!("field_renames = {{\n{}\n}}", worksheet.join("\n"))
    };

    format!(
        r#"{header}
import logging

_logger = logging.getLogger(__name__)

# Fill in the new name of every renamed field; empty entries are skipped.
{renames}


def migrate(cr, version):
    for model, renames in field_renames.items():
        table = model.replace(".", "_")
        for old_name, new_name in renames.items():
            if not new_name or new_name == old_name:
                continue
            _logger.info("Renaming %s.%s to %s", model, old_name, new_name)
            cr.execute(
                'ALTER TABLE "%s" RENAME COLUMN "%s" TO "%s"' % (table, old_name, new_name)
            )
"#,
        header = CODING_HEADER,
        renames = renames
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odoo::FieldRewriter;
    use indexmap::{IndexMap, IndexSet};

    fn model(declared: Option<&str>, inherit: &[&str], fields: &[&str]) -> Model {
        let fields: IndexMap<String, Field> = fields
            .iter()
            .map(|code| {
                let field = FieldRewriter::from_source(code).unwrap();
                (field.name.clone(), field)
            })
            .collect();
        let inherited_names: IndexSet<String> = inherit.iter().map(|s| s.to_string()).collect();
        Model {
            class_name: "Whatever".into(),
            declared_name: declared.map(str::to_string),
            description: None,
            new_declaration: declared.is_some() && inherited_names.is_empty(),
            inherited_names,
            inherits_map: IndexMap::new(),
            fields,
            flavor: Default::default(),
        }
    }

    #[test]
    fn naming_helpers() {
        assert_eq!(camel_case("res.partner"), "ResPartner");
        assert_eq!(camel_case("sale.order.LINE"), "SaleOrderLine");
        assert_eq!(human_readable("res.partner"), "Res Partner");
        assert_eq!(snake_case("res.partner"), "res_partner");
    }

    #[test]
    fn renders_new_model() {
        let model = model(Some("helpdesk.ticket"), &[], &["name = fields.Char(required=True)"]);
        assert_eq!(
            render_model(&model).unwrap(),
            "from odoo import fields, models\n\n\n\
             class HelpdeskTicket(models.Model):\n    \
             _name = \"helpdesk.ticket\"\n    \
             _description = \"Helpdesk Ticket\"\n\n    \
             name = fields.Char(required=True)\n"
        );
    }

    #[test]
    fn renders_extension() {
        let model = model(None, &["res.partner"], &["x_code = fields.Char('Code')"]);
        assert_eq!(
            render_model(&model).unwrap(),
            "from odoo import fields, models\n\n\n\
             class ResPartner(models.Model):\n    \
             _inherit = \"res.partner\"\n\n    \
             x_code = fields.Char(string=\"Code\")\n"
        );
    }

    #[test]
    fn wraps_long_field_declarations() {
        let field = FieldRewriter::from_source(
            "partner_shipping_id = fields.Many2one('res.partner', string='Delivery Address', required=True, index=True)",
        )
        .unwrap();
        assert_eq!(
            render_field(&field, INDENT),
            "    partner_shipping_id = fields.Many2one(\n        \
             string=\"Delivery Address\", required=True, index=True, comodel_name=\"res.partner\"\n    )"
        );
    }

    #[test]
    fn explodes_declarations_that_do_not_fit_hugged() {
        let field = FieldRewriter::from_source(
            "state = fields.Selection([('draft', 'Quotation'), ('sent', 'Quotation Sent'), ('sale', 'Sales Order')], string='Status')",
        )
        .unwrap();
        let rendered = render_field(&field, INDENT);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "    state = fields.Selection(");
        assert_eq!(lines[1], "        string=\"Status\",");
        assert!(lines[2].starts_with("        selection=[(\"draft\", \"Quotation\")"));
        assert_eq!(lines[3], "    )");
    }

    #[test]
    fn renders_init_and_manifest() {
        assert_eq!(
            render_init(&["a".to_string(), "b".to_string()]),
            "from . import a\nfrom . import b\n"
        );
        let mut values = IndexMap::new();
        values.insert("name".to_string(), PyValue::Str("test module".into()));
        values.insert("data".to_string(), PyValue::List(vec![]));
        values.insert("installable".to_string(), PyValue::Bool(true));
        assert_eq!(
            render_manifest(&values),
            "# -*- coding: utf-8 -*-\n{\n    \"name\": \"test module\",\n    \"data\": [],\n    \"installable\": True,\n}\n"
        );
    }

    #[test]
    fn migration_lists_every_field() {
        let model = model(Some("a.b"), &[], &["x = fields.Char()", "y = fields.Integer()"]);
        let script = render_migration([("a.b", &model)]);
        assert!(script.contains("field_renames = {\n    \"a.b\": {\n        \"x\": \"\",\n        \"y\": \"\",\n    },\n}"));
        assert!(script.contains("def migrate(cr, version):"));
    }
}
