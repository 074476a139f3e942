//! Safe evaluation of Python literal expressions (the `ast.literal_eval` subset
//! needed for manifests and model attributes) and black-compatible rendering.

use indexmap::IndexMap;
use rustpython_parser::ast;
use serde::Serialize;
use thiserror::Error;

/// Maximum line length used when deciding whether to explode a collection
pub const LINE_LENGTH: usize = 88;

/// A Python literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PyValue>),
    Tuple(Vec<PyValue>),
    Dict(IndexMap<String, PyValue>),
}

/// Expression is not made of literals only
#[derive(Debug, Error, PartialEq)]
#[error("Not a literal: {0}")]
pub struct NotALiteral(pub String);

impl PyValue {
    /// Evaluates `expr` without executing anything
    pub fn from_expr(expr: &ast::Expr) -> Result<Self, NotALiteral> {
        match expr {
            ast::Expr::Constant(constant) => Self::from_constant(&constant.value),
            ast::Expr::List(list) => Ok(PyValue::List(Self::from_exprs(&list.elts)?)),
            ast::Expr::Tuple(tuple) => Ok(PyValue::Tuple(Self::from_exprs(&tuple.elts)?)),
            ast::Expr::Dict(dict) => {
                let mut map = IndexMap::new();
                for (key, value) in dict.keys.iter().zip(dict.values.iter()) {
                    let Some(key) = key else {
                        return Err(NotALiteral("dict unpacking".to_string()));
                    };
                    match Self::from_expr(key)? {
                        PyValue::Str(key) => {
                            map.insert(key, Self::from_expr(value)?);
                        }
                        other => {
                            return Err(NotALiteral(format!(
                                "dict key {}",
                                other.to_python()
                            )))
                        }
                    }
                }
                Ok(PyValue::Dict(map))
            }
            ast::Expr::UnaryOp(unary) => {
                let operand = Self::from_expr(&unary.operand)?;
                match (unary.op, operand) {
                    (ast::UnaryOp::USub, PyValue::Int(i)) => Ok(PyValue::Int(-i)),
                    (ast::UnaryOp::USub, PyValue::Float(f)) => Ok(PyValue::Float(-f)),
                    (ast::UnaryOp::UAdd, value @ (PyValue::Int(_) | PyValue::Float(_))) => {
                        Ok(value)
                    }
                    _ => Err(NotALiteral("unary operation".to_string())),
                }
            }
            ast::Expr::Name(name) => Err(NotALiteral(format!("name '{}'", name.id.as_str()))),
            ast::Expr::Call(_) => Err(NotALiteral("call".to_string())),
            _ => Err(NotALiteral("expression".to_string())),
        }
    }

    fn from_exprs(exprs: &[ast::Expr]) -> Result<Vec<Self>, NotALiteral> {
        exprs.iter().map(Self::from_expr).collect()
    }

    fn from_constant(constant: &ast::Constant) -> Result<Self, NotALiteral> {
        match constant {
            ast::Constant::None => Ok(PyValue::None),
            ast::Constant::Bool(b) => Ok(PyValue::Bool(*b)),
            ast::Constant::Str(s) => Ok(PyValue::Str(s.clone())),
            ast::Constant::Int(i) => i
                .to_string()
                .parse::<i64>()
                .map(PyValue::Int)
                .map_err(|_| NotALiteral(format!("integer {} out of range", i))),
            ast::Constant::Float(f) => Ok(PyValue::Float(*f)),
            ast::Constant::Tuple(items) => Ok(PyValue::Tuple(
                items
                    .iter()
                    .map(Self::from_constant)
                    .collect::<Result<_, _>>()?,
            )),
            ast::Constant::Bytes(_) => Err(NotALiteral("bytes".to_string())),
            ast::Constant::Complex { .. } => Err(NotALiteral("complex".to_string())),
            ast::Constant::Ellipsis => Err(NotALiteral("ellipsis".to_string())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, PyValue>> {
        match self {
            PyValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// String elements of a list or tuple, ignoring anything else
    pub fn string_items(&self) -> Vec<String> {
        match self {
            PyValue::List(items) | PyValue::Tuple(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Python truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            PyValue::None => false,
            PyValue::Bool(b) => *b,
            PyValue::Int(i) => *i != 0,
            PyValue::Float(f) => *f != 0.0,
            PyValue::Str(s) => !s.is_empty(),
            PyValue::List(items) | PyValue::Tuple(items) => !items.is_empty(),
            PyValue::Dict(map) => !map.is_empty(),
        }
    }

    /// Single-line Python source for this value
    pub fn to_python(&self) -> String {
        match self {
            PyValue::None => "None".to_string(),
            PyValue::Bool(true) => "True".to_string(),
            PyValue::Bool(false) => "False".to_string(),
            PyValue::Int(i) => i.to_string(),
            PyValue::Float(f) => format_float(*f),
            PyValue::Str(s) => quote_str(s),
            PyValue::List(items) => format!("[{}]", join_inline(items)),
            PyValue::Tuple(items) if items.len() == 1 => format!("({},)", items[0].to_python()),
            PyValue::Tuple(items) => format!("({})", join_inline(items)),
            PyValue::Dict(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .map(|(key, value)| format!("{}: {}", quote_str(key), value.to_python()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }

    /// Renders `prefix` followed by this value at `indent`, exploding collections
    /// one element per line (with a trailing comma) when they do not fit.
    pub fn render_at(&self, prefix: &str, indent: usize, suffix: &str) -> String {
        let pad = " ".repeat(indent);
        let inline = format!("{}{}{}{}", pad, prefix, self.to_python(), suffix);
        if inline.chars().count() <= LINE_LENGTH {
            if let PyValue::Str(s) = self {
                if s.contains('\n') {
                    return format!("{}{}{}{}", pad, prefix, triple_quote(s), suffix);
                }
            }
            return inline;
        }

        let (open, close, lines) = match self {
            PyValue::List(items) => ("[", "]", Self::render_items(items, indent + 4)),
            PyValue::Tuple(items) => ("(", ")", Self::render_items(items, indent + 4)),
            PyValue::Dict(map) => ("{", "}", Self::render_entries(map, indent + 4)),
            PyValue::Str(s) if s.contains('\n') => {
                return format!("{}{}{}{}", pad, prefix, triple_quote(s), suffix)
            }
            _ => return inline,
        };
        if lines.is_empty() {
            return inline;
        }
        format!(
            "{pad}{prefix}{open}\n{body}\n{pad}{close}{suffix}",
            body = lines.join("\n")
        )
    }

    /// Renders a dict always exploded, one key per line (manifest layout)
    pub fn render_dict_block(map: &IndexMap<String, PyValue>) -> String {
        let lines = Self::render_entries(map, 4);
        if lines.is_empty() {
            return "{}".to_string();
        }
        format!("{{\n{}\n}}", lines.join("\n"))
    }

    fn render_items(items: &[PyValue], indent: usize) -> Vec<String> {
        items
            .iter()
            .map(|item| item.render_at("", indent, ","))
            .collect()
    }

    fn render_entries(map: &IndexMap<String, PyValue>, indent: usize) -> Vec<String> {
        map.iter()
            .map(|(key, value)| value.render_at(&format!("{}: ", quote_str(key)), indent, ","))
            .collect()
    }
}

fn join_inline(items: &[PyValue]) -> String {
    items
        .iter()
        .map(PyValue::to_python)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Quotes a string the way black normalizes it: double quotes unless that
/// would need more escapes than single quotes.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('"') && !s.contains('\'') {
        '\''
    } else {
        '"'
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn triple_quote(s: &str) -> String {
    if s.contains("\"\"\"") || s.contains('\\') || s.ends_with('"') {
        return quote_str(s);
    }
    format!("\"\"\"{}\"\"\"", s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn eval(source: &str) -> Result<PyValue, NotALiteral> {
        let parsed = parse(source, Mode::Expression, "<test>").unwrap();
        match parsed {
            ast::Mod::Expression(expr) => PyValue::from_expr(&expr.body),
            _ => unreachable!(),
        }
    }

    #[test]
    fn evaluates_nested_literals() {
        let value = eval(r#"{"name": "Sale", "depends": ["base", "sale"], "installable": True, "sequence": -3}"#)
            .unwrap();
        let map = value.as_dict().unwrap();
        assert_eq!(map["name"], PyValue::Str("Sale".into()));
        assert_eq!(map["depends"].string_items(), vec!["base", "sale"]);
        assert_eq!(map["installable"], PyValue::Bool(true));
        assert_eq!(map["sequence"], PyValue::Int(-3));
    }

    #[test]
    fn rejects_non_literals() {
        assert!(eval("_('Label')").is_err());
        assert!(eval("{'a': some_name}").is_err());
        assert!(eval("{**base}").is_err());
    }

    #[test]
    fn renders_python_source() {
        let value = eval(r#"[("draft", "Draft"), ('it"s', None), 1.0, (1,)]"#).unwrap();
        assert_eq!(
            value.to_python(),
            r#"[("draft", "Draft"), ('it"s', None), 1.0, (1,)]"#
        );
    }

    #[test]
    fn explodes_long_collections_one_item_per_line() {
        let value = PyValue::List(
            (0..8)
                .map(|i| PyValue::Str(format!("views/some_long_view_file_{}.xml", i)))
                .collect(),
        );
        let rendered = value.render_at("\"data\": ", 4, ",");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "    \"data\": [");
        assert_eq!(lines[1], "        \"views/some_long_view_file_0.xml\",");
        assert_eq!(lines.last().copied(), Some("    ],"));
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn multiline_strings_use_triple_quotes() {
        let value = PyValue::Str("\nLong description\n".into());
        assert_eq!(
            value.render_at("\"description\": ", 4, ","),
            "    \"description\": \"\"\"\nLong description\n\"\"\","
        );
    }
}
