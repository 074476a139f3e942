use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::external::run_external_with_input;

/// Final text pass over every generated Python file
pub trait CodeFormatter {
    fn format(&self, code: &str) -> Result<String>;
}

/// Output of the generators is already laid out; only whitespace is normalized
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFormatter;

impl CodeFormatter for BuiltinFormatter {
    fn format(&self, code: &str) -> Result<String> {
        let mut out = String::with_capacity(code.len());
        let mut blank_run = 0;
        for line in code.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 2 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }
        let trimmed = out.trim_end_matches('\n');
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}\n", trimmed))
    }
}

/// Pipes code through a command reading stdin and writing stdout (`black -q -`)
#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    command: String,
    cwd: Option<PathBuf>,
}

impl ExternalFormatter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }
}

impl CodeFormatter for ExternalFormatter {
    fn format(&self, code: &str) -> Result<String> {
        debug!(command = %self.command, "Formatting with external command");
        run_external_with_input(&self.command, self.cwd.as_deref(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_normalizes_whitespace() {
        let formatted = BuiltinFormatter
            .format("x = 1   \n\n\n\n\ny = 2\n\n\n")
            .unwrap();
        assert_eq!(formatted, "x = 1\n\n\ny = 2\n");
        assert_eq!(BuiltinFormatter.format("\n\n").unwrap(), "");
    }

    #[test]
    fn external_formatter_uses_stdout() {
        let formatted = ExternalFormatter::new("cat").format("a = 1\n").unwrap();
        assert_eq!(formatted, "a = 1\n");
    }

    #[test]
    fn external_formatter_failure_is_an_error() {
        assert!(ExternalFormatter::new("omg-no-such-formatter -q -")
            .format("a = 1\n")
            .is_err());
    }
}
