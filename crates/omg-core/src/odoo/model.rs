use indexmap::{IndexMap, IndexSet};
use rustpython_parser::ast;
use serde::Serialize;
use tracing::debug;

use super::classifier::{ModelClassifier, ModelFlavor};
use super::field::{Field, FieldRewriter};
use crate::parsers::{PyValue, SourceFile};

/// Structure of one model, as declared by one or more classes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub class_name: String,
    pub declared_name: Option<String>,
    pub description: Option<String>,
    pub inherited_names: IndexSet<String>,
    pub inherits_map: IndexMap<String, String>,
    pub fields: IndexMap<String, Field>,
    pub flavor: ModelFlavor,
    /// Declared with `_name` and without `_inherit` in at least one class
    pub new_declaration: bool,
}

impl Model {
    /// `_name`, or the only `_inherit` entry
    pub fn effective_name(&self) -> Option<&str> {
        if let Some(name) = &self.declared_name {
            return Some(name);
        }
        if self.inherited_names.len() == 1 {
            return self.inherited_names.first().map(String::as_str);
        }
        None
    }

    /// Models without fields are never written
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_new(&self) -> bool {
        self.new_declaration
    }

    /// Folds a later class for the same model into this one; later fields win
    pub fn merge(&mut self, other: Model) {
        if self.declared_name.is_none() {
            self.declared_name = other.declared_name;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        self.inherited_names.extend(other.inherited_names);
        self.inherits_map.extend(other.inherits_map);
        self.fields.extend(other.fields);
        self.new_declaration |= other.new_declaration;
    }
}

/// Reads the class-level declarations of a model class
pub struct ModelBuilder<'a> {
    file: &'a SourceFile,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self { file }
    }

    pub fn build(&self, class_def: &ast::StmtClassDef) -> Model {
        let mut model = Model {
            class_name: class_def.name.as_str().to_string(),
            declared_name: None,
            description: None,
            inherited_names: IndexSet::new(),
            inherits_map: IndexMap::new(),
            fields: IndexMap::new(),
            flavor: ModelClassifier::flavor(class_def),
            new_declaration: false,
        };
        let rewriter = FieldRewriter::new(self.file);

        for stmt in &class_def.body {
            let ast::Stmt::Assign(assign) = stmt else {
                continue;
            };
            let [ast::Expr::Name(target)] = assign.targets.as_slice() else {
                continue;
            };
            let value = assign.value.as_ref();

            match target.id.as_str() {
                "_name" => {
                    if let Ok(PyValue::Str(name)) = PyValue::from_expr(value) {
                        model.declared_name = Some(name);
                    }
                }
                "_description" => {
                    if let Ok(PyValue::Str(description)) = PyValue::from_expr(value) {
                        model.description = Some(description);
                    }
                }
                "_inherit" => self.read_inherit(&mut model, value),
                "_inherits" => self.read_inherits(&mut model, value),
                name => {
                    if let ast::Expr::Call(call) = value {
                        if let Some(field) = rewriter.from_call(name, call) {
                            model.fields.insert(name.to_string(), field);
                        }
                    }
                }
            }
        }

        model.new_declaration = model.declared_name.is_some() && model.inherited_names.is_empty();
        debug!(
            file = %self.file.path.display(),
            class = %model.class_name,
            model = ?model.effective_name(),
            fields = model.fields.len(),
            "Built model"
        );
        model
    }

    fn read_inherit(&self, model: &mut Model, value: &ast::Expr) {
        if let ast::Expr::Name(name) = value {
            // _inherit = _name
            if name.id.as_str() == "_name" {
                if let Some(declared) = &model.declared_name {
                    model.inherited_names.insert(declared.clone());
                }
            }
            return;
        }
        match PyValue::from_expr(value) {
            Ok(PyValue::Str(name)) => {
                model.inherited_names.insert(name);
            }
            Ok(items @ (PyValue::List(_) | PyValue::Tuple(_))) => {
                model.inherited_names.extend(items.string_items());
            }
            _ => {}
        }
    }

    fn read_inherits(&self, model: &mut Model, value: &ast::Expr) {
        let Ok(PyValue::Dict(map)) = PyValue::from_expr(value) else {
            return;
        };
        for (comodel, field_value) in map {
            let Some(field_name) = field_value.as_str() else {
                continue;
            };
            model
                .fields
                .entry(field_name.to_string())
                .or_insert_with(|| Field::implicit_many2one(field_name, &comodel));
            model.inherits_map.insert(comodel, field_name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::SourceLoader;
    use std::path::Path;

    fn build_all(source: &str) -> Vec<Model> {
        let file = SourceLoader::default()
            .parse_text(Path::new("models.py"), source.to_string())
            .unwrap();
        let builder = ModelBuilder::new(&file);
        file.body
            .iter()
            .filter_map(|stmt| match stmt {
                ast::Stmt::ClassDef(class) => Some(builder.build(class)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn reads_declarations() {
        let models = build_all(
            r#"
class Ticket(models.Model):
    _name = "helpdesk.ticket"
    _description = "Ticket"
    _inherit = ["mail.thread", "mail.activity.mixin"]
    _order = "id desc"

    name = fields.Char("Subject", required=True)
    user_id = fields.Many2one("res.users")
    a = b = fields.Char()
    helper = some_function()

    def action_done(self):
        pass
"#,
        );
        let model = &models[0];
        assert_eq!(model.class_name, "Ticket");
        assert_eq!(model.effective_name(), Some("helpdesk.ticket"));
        assert_eq!(model.description.as_deref(), Some("Ticket"));
        assert_eq!(
            model.inherited_names.iter().collect::<Vec<_>>(),
            vec!["mail.thread", "mail.activity.mixin"]
        );
        assert_eq!(model.fields.keys().collect::<Vec<_>>(), vec!["name", "user_id"]);
        assert!(!model.is_new());
    }

    #[test]
    fn self_reference_inherit_uses_declared_name() {
        let models = build_all(
            "class P(models.Model):\n    _name = 'res.partner'\n    _inherit = _name\n",
        );
        assert_eq!(
            models[0].inherited_names.iter().collect::<Vec<_>>(),
            vec!["res.partner"]
        );
        assert!(models[0].is_empty());
    }

    #[test]
    fn inherits_synthesizes_many2one() {
        let models = build_all(
            "class U(models.Model):\n    _name = 'res.users'\n    _inherits = {'res.partner': 'partner_id'}\n",
        );
        let model = &models[0];
        assert_eq!(model.inherits_map["res.partner"], "partner_id");
        assert_eq!(
            model.fields["partner_id"].definition(),
            "fields.Many2one(comodel_name=\"res.partner\")"
        );
        assert!(model.is_new());
    }

    #[test]
    fn effective_name_needs_a_single_inherit() {
        let models = build_all(
            "class A(models.Model):\n    _inherit = 'sale.order'\n\nclass B(models.AbstractModel):\n    _inherit = ['a', 'b']\n",
        );
        assert_eq!(models[0].effective_name(), Some("sale.order"));
        assert_eq!(models[1].effective_name(), None);
        assert_eq!(models[1].flavor, ModelFlavor::Abstract);
    }

    #[test]
    fn merge_later_fields_win() {
        let mut models = build_all(
            r#"
class A(models.Model):
    _name = "x.model"
    a = fields.Char("First")
    shared = fields.Integer()

class B(models.Model):
    _inherit = "x.model"
    shared = fields.Float()
    b = fields.Boolean()
"#,
        );
        let second = models.pop().unwrap();
        let mut first = models.pop().unwrap();
        first.merge(second);
        assert_eq!(first.fields.keys().collect::<Vec<_>>(), vec!["a", "shared", "b"]);
        assert_eq!(first.fields["shared"].type_tag, "Float");
        assert!(first.is_new());
        assert!(first.inherited_names.contains("x.model"));
    }
}
