use rustpython_parser::ast;
use serde::Serialize;
use std::fmt;

/// Base identifiers marking a class as a model; the first one is the module alias
pub const MODEL_BASES: [&str; 4] = ["models", "Model", "AbstractModel", "TransientModel"];

/// Kind of model, from the concrete base class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFlavor {
    #[default]
    Persistent,
    Transient,
    Abstract,
}

impl ModelFlavor {
    fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "Model" => Some(ModelFlavor::Persistent),
            "TransientModel" => Some(ModelFlavor::Transient),
            "AbstractModel" => Some(ModelFlavor::Abstract),
            _ => None,
        }
    }

    /// Base class written in generated sources
    pub fn base_class(&self) -> &'static str {
        match self {
            ModelFlavor::Persistent => "models.Model",
            ModelFlavor::Transient => "models.TransientModel",
            ModelFlavor::Abstract => "models.AbstractModel",
        }
    }
}

impl fmt::Display for ModelFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFlavor::Persistent => write!(f, "persistent"),
            ModelFlavor::Transient => write!(f, "transient"),
            ModelFlavor::Abstract => write!(f, "abstract"),
        }
    }
}

/// Syntactic shape of a base-class expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseShape<'a> {
    /// `Model`
    Name(&'a str),
    /// `models.Model`
    Attribute { root: &'a str, attr: &'a str },
    /// `a.b.C`
    Chain,
    Other,
}

impl<'a> BaseShape<'a> {
    fn of(expr: &'a ast::Expr) -> Self {
        match expr {
            ast::Expr::Name(name) => BaseShape::Name(name.id.as_str()),
            ast::Expr::Attribute(attr) => match attr.value.as_ref() {
                ast::Expr::Name(root) => BaseShape::Attribute {
                    root: root.id.as_str(),
                    attr: attr.attr.as_str(),
                },
                ast::Expr::Attribute(_) => BaseShape::Chain,
                _ => BaseShape::Other,
            },
            _ => BaseShape::Other,
        }
    }
}

/// Recognizes model classes from their first base class, without executing anything
pub struct ModelClassifier;

impl ModelClassifier {
    pub fn is_model(class_def: &ast::StmtClassDef) -> bool {
        let Some(base) = class_def.bases.first() else {
            return false;
        };
        match BaseShape::of(base) {
            BaseShape::Name(name) => MODEL_BASES.contains(&name),
            BaseShape::Attribute { root, attr } => {
                MODEL_BASES.contains(&root) || MODEL_BASES[1..].contains(&attr)
            }
            BaseShape::Chain | BaseShape::Other => false,
        }
    }

    /// Flavor named by the first base; plain `models` aliases are persistent
    pub fn flavor(class_def: &ast::StmtClassDef) -> ModelFlavor {
        let identifier = match class_def.bases.first().map(BaseShape::of) {
            Some(BaseShape::Name(name)) => Some(name),
            Some(BaseShape::Attribute { attr, .. }) => Some(attr),
            _ => None,
        };
        identifier
            .and_then(ModelFlavor::from_identifier)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn class_def(source: &str) -> ast::StmtClassDef {
        match parse(source, Mode::Module, "<test>").unwrap() {
            ast::Mod::Module(module) => match module.body.into_iter().next() {
                Some(ast::Stmt::ClassDef(class)) => class,
                other => panic!("not a class: {other:?}"),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn recognizes_model_bases() {
        for source in [
            "class A(models.Model): pass",
            "class A(models.TransientModel): pass",
            "class A(Model): pass",
            "class A(AbstractModel): pass",
            "class A(orm.Model): pass",
            "class A(models.Something): pass",
        ] {
            assert!(ModelClassifier::is_model(&class_def(source)), "{source}");
        }
    }

    #[test]
    fn rejects_plain_classes() {
        for source in [
            "class A: pass",
            "class A(object): pass",
            "class A(http.Controller): pass",
            "class A(tools.misc.UnquoteEvalContext): pass",
            "class A(odoo.models.Model): pass",
            "class A(get_base()): pass",
        ] {
            assert!(!ModelClassifier::is_model(&class_def(source)), "{source}");
        }
    }

    #[test]
    fn only_first_base_counts() {
        assert!(!ModelClassifier::is_model(&class_def(
            "class A(Mixin, models.Model): pass"
        )));
    }

    #[test]
    fn derives_flavor() {
        assert_eq!(
            ModelClassifier::flavor(&class_def("class A(models.TransientModel): pass")),
            ModelFlavor::Transient
        );
        assert_eq!(
            ModelClassifier::flavor(&class_def("class A(AbstractModel): pass")),
            ModelFlavor::Abstract
        );
        assert_eq!(
            ModelClassifier::flavor(&class_def("class A(models.Model): pass")),
            ModelFlavor::Persistent
        );
        assert_eq!(ModelFlavor::Transient.base_class(), "models.TransientModel");
    }
}
