//! Text repairs applied to sources the parser rejects.
//!
//! Odoo addons are old: mixed tab indentation and Python 2 syntax are common.
//! Each strategy is a pure text transformation; the loader applies them in
//! order, cumulatively, re-parsing after each one.

use regex::Regex;
use std::sync::OnceLock;

/// A pure `(text) -> text` fix for unparsable sources
pub trait RepairStrategy: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn repair(&self, source: &str) -> String;
}

/// Expands tabs to the next multiple of eight columns, as the Python 2
/// tokenizer did, and drops trailing blanks
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpandTabs;

const TAB_SIZE: usize = 8;

impl RepairStrategy for ExpandTabs {
    fn name(&self) -> &'static str {
        "expand-tabs"
    }

    fn repair(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        for line in source.lines() {
            let mut column = 0;
            let mut expanded = String::with_capacity(line.len());
            for c in line.chars() {
                if c == '\t' {
                    let width = TAB_SIZE - column % TAB_SIZE;
                    expanded.extend(std::iter::repeat(' ').take(width));
                    column += width;
                } else {
                    expanded.push(c);
                    column += 1;
                }
            }
            out.push_str(expanded.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Rewrites the Python 2 constructs still found in legacy addons
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyPort;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn legacy_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // except Exception, e:
            (
                r"(?m)^(\s*except\s+(?:\([^)]*\)|[\w.]+))\s*,\s*(\w+)\s*:",
                "${1} as ${2}:",
            ),
            // print "x" / bare print
            (r"(?m)^(\s*)print\s+([^\s(=>].*?)\s*$", "${1}print(${2})"),
            (r"(?m)^(\s*)print\s*$", "${1}print()"),
            // raise ValueError, "message"
            (r"(?m)^(\s*raise\s+[\w.]+)\s*,\s*(.+?)\s*$", "${1}(${2})"),
            (r#"\b[uU][rR](["'])"#, "r${1}"),
            (r"\b(\d+)[lL]\b", "${1}"),
            (r"(^|[\s(\[=,:])0([0-7]+)\b", "${1}0o${2}"),
            (r"\s*<>\s*", " != "),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern)
                .ok()
                .map(|pattern| Rule { pattern, replacement })
        })
        .collect()
    })
}

impl RepairStrategy for LegacyPort {
    fn name(&self) -> &'static str {
        "legacy-port"
    }

    fn repair(&self, source: &str) -> String {
        legacy_rules()
            .iter()
            .fold(source.to_string(), |text, rule| {
                rule.pattern.replace_all(&text, rule.replacement).into_owned()
            })
    }
}

/// Strategies tried by default, in order
pub fn default_strategies() -> Vec<Box<dyn RepairStrategy>> {
    vec![Box::new(ExpandTabs), Box::new(LegacyPort)]
}
