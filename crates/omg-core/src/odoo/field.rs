//! Field declarations (`name = fields.Type(...)`) and their normalization.

use indexmap::IndexMap;
use rustpython_parser::ast;
use serde::Serialize;
use std::path::Path;

use crate::error::ParseError;
use crate::parsers::{quote_str, PyValue, SourceFile, SourceLoader};

/// Alias the framework's field classes are accessed through
pub const FIELDS_NAMESPACE: &str = "fields";

/// Keywords that never survive a rewrite
pub const EXCLUDED_KEYWORDS: [&str; 5] = ["default", "compute", "store", "tracking", "readonly"];

pub const HELP_UNSTORED: &str = "Field previously unstored (lost value)";
pub const HELP_STORED: &str = "Field previously stored (retained value)";

/// Field types of the framework; anything else is kept verbatim, without promotion
pub const KNOWN_TYPES: [&str; 21] = [
    "Binary",
    "Boolean",
    "Char",
    "Date",
    "Datetime",
    "Float",
    "Html",
    "Id",
    "Image",
    "Integer",
    "Json",
    "Many2many",
    "Many2one",
    "Many2oneReference",
    "Monetary",
    "One2many",
    "Properties",
    "PropertiesDefinition",
    "Reference",
    "Selection",
    "Text",
];

/// Value of one positional or keyword argument
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    /// List of tuples (selection choices, domains), flattened best-effort
    Choices {
        items: Vec<Vec<String>>,
        source: String,
    },
    /// Anything else, as source text
    Expr(String),
}

impl ArgValue {
    /// Python source for this argument
    pub fn to_python(&self) -> String {
        match self {
            ArgValue::Str(s) => quote_str(s),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Float(f) => PyValue::Float(*f).to_python(),
            ArgValue::Bool(b) => PyValue::Bool(*b).to_python(),
            ArgValue::None => "None".to_string(),
            ArgValue::Choices { source, .. } => source.clone(),
            ArgValue::Expr(source) => source.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One field of a model, after normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub type_tag: String,
    pub positional_args: Vec<ArgValue>,
    pub keyword_args: IndexMap<String, ArgValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Field {
    /// Relational field implied by an `_inherits` entry
    pub fn implicit_many2one(name: &str, comodel: &str) -> Self {
        let mut keyword_args = IndexMap::new();
        keyword_args.insert("comodel_name".to_string(), ArgValue::Str(comodel.to_string()));
        Self {
            name: name.to_string(),
            type_tag: "Many2one".to_string(),
            positional_args: Vec::new(),
            keyword_args,
            source_text: None,
            line: None,
        }
    }

    pub fn keyword(&self, key: &str) -> Option<&ArgValue> {
        self.keyword_args.get(key)
    }

    /// Argument list without parentheses: `a, key=value`
    pub fn arguments(&self) -> Vec<String> {
        self.positional_args
            .iter()
            .map(ArgValue::to_python)
            .chain(
                self.keyword_args
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value.to_python())),
            )
            .collect()
    }

    /// `fields.Type(...)` on a single line
    pub fn definition(&self) -> String {
        format!(
            "{}.{}({})",
            FIELDS_NAMESPACE,
            self.type_tag,
            self.arguments().join(", ")
        )
    }

    /// `name = fields.Type(...)` on a single line
    pub fn declaration(&self) -> String {
        format!("{} = {}", self.name, self.definition())
    }
}

/// Turns field-declaration calls of one source file into normalized fields
pub struct FieldRewriter<'a> {
    file: &'a SourceFile,
}

impl<'a> FieldRewriter<'a> {
    pub fn new(file: &'a SourceFile) -> Self {
        Self { file }
    }

    /// Builds the field declared by `name = <call>`; `None` unless the callee
    /// is `fields.<Type>`
    pub fn from_call(&self, name: &str, call: &ast::ExprCall) -> Option<Field> {
        let type_tag = field_type(call)?;

        let positional_args = call.args.iter().map(|arg| self.arg_value(arg)).collect();
        let keyword_args = call
            .keywords
            .iter()
            .filter_map(|keyword| {
                // **kwargs has no name
                let key = keyword.arg.as_ref()?;
                Some((key.as_str().to_string(), self.arg_value(&keyword.value)))
            })
            .collect();

        let field = Field {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
            positional_args,
            keyword_args,
            source_text: Some(self.file.segment(call).to_string()),
            line: Some(self.file.line_of(call)),
        };
        Some(Self::filter_keywords(Self::promote_positional(field)))
    }

    /// Parses a standalone declaration such as `user_id = fields.Many2one("res.users")`;
    /// a declaration nested in a class body is found as well.
    pub fn from_source(code: &str) -> Result<Field, ParseError> {
        let code = code.trim().trim_matches('"');
        let file = SourceLoader::default().parse_text(Path::new("<field>"), code.to_string())?;
        let assign = first_assign(&file.body)
            .ok_or_else(|| ParseError::NotAFieldDeclaration(code.to_string()))?;

        let (Some(ast::Expr::Name(target)), ast::Expr::Call(call)) =
            (assign.targets.first(), assign.value.as_ref())
        else {
            return Err(ParseError::NotAFieldDeclaration(code.to_string()));
        };
        FieldRewriter::new(&file)
            .from_call(target.id.as_str(), call)
            .ok_or_else(|| ParseError::NotAFieldDeclaration(code.to_string()))
    }

    /// Moves positional arguments to their keyword according to the field type.
    /// The one- and two-argument rules are exclusive and run once.
    pub fn promote_positional(mut field: Field) -> Field {
        if !KNOWN_TYPES.contains(&field.type_tag.as_str()) {
            return field;
        }
        let keywords = &mut field.keyword_args;
        let args = &mut field.positional_args;

        match args.len() {
            1 => {
                let key = match field.type_tag.as_str() {
                    "Many2one" | "One2many" if !keywords.contains_key("comodel_name") => {
                        "comodel_name"
                    }
                    "Selection" if !keywords.contains_key("selection") => "selection",
                    _ => "string",
                };
                if !keywords.contains_key(key) {
                    keywords.insert(key.to_string(), args.remove(0));
                }
            }
            2 => {
                let keys = match field.type_tag.as_str() {
                    "Many2one" => Some(("comodel_name", "string")),
                    "One2many" => Some(("comodel_name", "inverse_name")),
                    "Selection" => Some(("selection", "string")),
                    _ => None,
                };
                if let Some((first, second)) = keys {
                    if !keywords.contains_key(first) && !keywords.contains_key(second) {
                        let mut drained = args.drain(..);
                        if let (Some(a), Some(b)) = (drained.next(), drained.next()) {
                            keywords.insert(first.to_string(), a);
                            keywords.insert(second.to_string(), b);
                        }
                    }
                }
            }
            _ => {}
        }
        field
    }

    /// Drops transient keywords and annotates computed fields that become plain.
    /// Applying it twice gives the same field.
    pub fn filter_keywords(mut field: Field) -> Field {
        let keywords = &mut field.keyword_args;
        let computed = keywords.contains_key("compute");
        let stored = keywords.contains_key("store");

        let message = match (computed, stored) {
            (true, false) => Some(HELP_UNSTORED),
            (true, true) => Some(HELP_STORED),
            _ => None,
        };

        keywords.retain(|key, _| !EXCLUDED_KEYWORDS.contains(&key.as_str()));

        match message {
            Some(message) => {
                keywords.insert("help".to_string(), ArgValue::Str(message.to_string()));
            }
            None => {
                let advisory = keywords
                    .get("help")
                    .and_then(ArgValue::as_str)
                    .map(|help| help == HELP_UNSTORED || help == HELP_STORED)
                    .unwrap_or(false);
                if !advisory {
                    keywords.shift_remove("help");
                }
            }
        }
        field
    }

    fn arg_value(&self, expr: &ast::Expr) -> ArgValue {
        match expr {
            ast::Expr::Constant(constant) => match &constant.value {
                ast::Constant::Str(s) => ArgValue::Str(s.clone()),
                ast::Constant::Bool(b) => ArgValue::Bool(*b),
                ast::Constant::None => ArgValue::None,
                ast::Constant::Float(f) => ArgValue::Float(*f),
                ast::Constant::Int(i) => i
                    .to_string()
                    .parse()
                    .map(ArgValue::Int)
                    .unwrap_or_else(|_| ArgValue::Expr(self.file.segment(expr).to_string())),
                _ => ArgValue::Expr(self.file.segment(expr).to_string()),
            },
            ast::Expr::List(ast::ExprList { elts, .. })
            | ast::Expr::Tuple(ast::ExprTuple { elts, .. })
                if !elts.is_empty() && elts.iter().all(|e| matches!(e, ast::Expr::Tuple(_))) =>
            {
                let items = elts
                    .iter()
                    .map(|elt| match elt {
                        ast::Expr::Tuple(tuple) => {
                            tuple.elts.iter().map(|e| self.choice_item(e)).collect()
                        }
                        _ => Vec::new(),
                    })
                    .collect();
                ArgValue::Choices {
                    items,
                    source: self.expr_text(expr),
                }
            }
            _ => ArgValue::Expr(self.expr_text(expr)),
        }
    }

    fn choice_item(&self, expr: &ast::Expr) -> String {
        match expr {
            ast::Expr::Constant(ast::ExprConstant {
                value: ast::Constant::Str(s),
                ..
            }) => s.clone(),
            _ => self.file.segment(expr).to_string(),
        }
    }

    /// Literal expressions are re-rendered so quoting is normalized
    fn expr_text(&self, expr: &ast::Expr) -> String {
        PyValue::from_expr(expr)
            .map(|value| value.to_python())
            .unwrap_or_else(|_| self.file.segment(expr).to_string())
    }
}

/// `Type` of a `fields.Type(...)` call
pub fn field_type(call: &ast::ExprCall) -> Option<&str> {
    match call.func.as_ref() {
        ast::Expr::Attribute(attr) => match attr.value.as_ref() {
            ast::Expr::Name(name) if name.id.as_str() == FIELDS_NAMESPACE => Some(attr.attr.as_str()),
            _ => None,
        },
        _ => None,
    }
}

fn first_assign(body: &[ast::Stmt]) -> Option<&ast::StmtAssign> {
    body.iter().find_map(|stmt| match stmt {
        ast::Stmt::Assign(assign) => Some(assign),
        ast::Stmt::ClassDef(class) => first_assign(&class.body),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(code: &str) -> Field {
        FieldRewriter::from_source(code).unwrap()
    }

    #[test]
    fn rewrites_computed_stored_many2one() {
        let f = field(
            "user_id = fields.Many2one('res.users', \"Responsable\", compute=\"x\", store=True)",
        );
        assert_eq!(
            f.definition(),
            "fields.Many2one(comodel_name=\"res.users\", string=\"Responsable\", help=\"Field previously stored (retained value)\")"
        );
        assert!(f.positional_args.is_empty());
    }

    #[test]
    fn promotes_single_relational_argument() {
        for code in [
            "partner_id = fields.Many2one('res.partner')",
            "line_ids = fields.One2many('sale.order.line')",
        ] {
            let f = field(code);
            assert!(f.positional_args.is_empty());
            assert_eq!(
                f.keyword("comodel_name"),
                Some(&ArgValue::Str(code.split('\'').nth(1).unwrap().to_string()))
            );
        }
    }

    #[test]
    fn promotes_one2many_inverse_name() {
        let f = field("line_ids = fields.One2many('sale.order.line', 'order_id', string='Lines')");
        assert_eq!(
            f.definition(),
            "fields.One2many(string=\"Lines\", comodel_name=\"sale.order.line\", inverse_name=\"order_id\")"
        );
    }

    #[test]
    fn keeps_positionals_when_target_keyword_exists() {
        let f = field("line_ids = fields.One2many('a', 'b', comodel_name='c')");
        assert_eq!(f.positional_args.len(), 2);
    }

    #[test]
    fn promotes_selection_choices() {
        let f = field("state = fields.Selection([('draft', 'Draft'), ('done', _('Done'))], 'State')");
        match f.keyword("selection") {
            Some(ArgValue::Choices { items, source }) => {
                assert_eq!(items[0], vec!["draft", "Draft"]);
                assert_eq!(items[1], vec!["done", "_('Done')"]);
                assert_eq!(source, "[('draft', 'Draft'), ('done', _('Done'))]");
            }
            other => panic!("unexpected selection {other:?}"),
        }
        assert_eq!(f.keyword("string"), Some(&ArgValue::Str("State".into())));
    }

    #[test]
    fn literal_selection_is_requoted() {
        let f = field("state = fields.Selection([('a', 'A')])");
        assert_eq!(f.definition(), "fields.Selection(selection=[(\"a\", \"A\")])");
    }

    #[test]
    fn single_positional_becomes_string() {
        let f = field("name = fields.Char('Name', required=True, default='x', tracking=True)");
        assert_eq!(f.definition(), "fields.Char(required=True, string=\"Name\")");
    }

    #[test]
    fn unknown_types_are_not_promoted() {
        let f = field("x = fields.Custom('a')");
        assert_eq!(f.type_tag, "Custom");
        assert_eq!(f.positional_args, vec![ArgValue::Str("a".into())]);
    }

    #[test]
    fn computed_unstored_gets_lost_value_help() {
        let f = field("total = fields.Float(compute='_compute_total', help='Old help', readonly=True)");
        assert_eq!(
            f.definition(),
            "fields.Float(help=\"Field previously unstored (lost value)\")"
        );
    }

    #[test]
    fn store_keyword_presence_marks_stored() {
        let f = field("total = fields.Float(compute='_compute_total', store=False)");
        assert_eq!(
            f.definition(),
            "fields.Float(help=\"Field previously stored (retained value)\")"
        );
    }

    #[test]
    fn plain_help_is_dropped() {
        let f = field("name = fields.Char(string='Name', help='Shown in tooltip')");
        assert_eq!(f.definition(), "fields.Char(string=\"Name\")");
    }

    #[test]
    fn keyword_filter_is_idempotent() {
        for code in [
            "a = fields.Char(compute='_c', store=True, help='h')",
            "b = fields.Integer(compute='_c')",
            "c = fields.Char(help='h', default=lambda self: 1)",
        ] {
            let once = field(code);
            let twice = FieldRewriter::filter_keywords(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn opaque_expressions_keep_source_text() {
        let f = field("company_id = fields.Many2one('res.company', domain=[('id', 'in', company_ids)], ondelete=\"cascade\")");
        assert_eq!(
            f.keyword("domain").map(ArgValue::to_python).as_deref(),
            Some("[('id', 'in', company_ids)]")
        );
        assert_eq!(f.line, Some(1));
    }

    #[test]
    fn finds_declaration_inside_class() {
        let f = field("class A(models.Model):\n    x = fields.Boolean()\n");
        assert_eq!(f.name, "x");
        assert_eq!(f.line, Some(2));
    }

    #[test]
    fn rejects_non_field_calls() {
        assert!(matches!(
            FieldRewriter::from_source("x = api.depends('a')"),
            Err(ParseError::NotAFieldDeclaration(_))
        ));
    }
}
