//! Commands run outside the process: git, formatters, post-install hooks.

use anyhow::Result;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::{debug, warn};

use crate::error::ExternalError;

fn split(command: &str) -> Result<(String, Vec<String>), ExternalError> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next().ok_or_else(|| ExternalError::ExternalStepFailed {
        command: command.to_string(),
        reason: "empty command".to_string(),
    })?;
    Ok((program, parts.collect()))
}

fn check(command: &str, output: Output) -> Result<String, ExternalError> {
    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(command, bytes = stdout.len(), "External command succeeded");
        return Ok(stdout);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let reason = if stderr.is_empty() {
        output.status.to_string()
    } else {
        stderr
    };
    warn!(command, %reason, "External command failed");
    Err(ExternalError::ExternalStepFailed {
        command: command.to_string(),
        reason,
    })
}

/// Runs `command` (split on whitespace) in `cwd` and returns its stdout.
/// Spawn failures and non-zero exits are `ExternalStepFailed`.
pub fn run_external(command: &str, cwd: Option<&Path>) -> Result<String> {
    let (program, args) = split(command)?;
    run_external_args(&program, &args, cwd)
}

/// Runs `program` with arguments passed as-is (no splitting), e.g. a commit
/// message containing spaces
pub fn run_external_args<S: AsRef<str>>(program: &str, args: &[S], cwd: Option<&Path>) -> Result<String> {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    let mut cmd = Command::new(program);
    cmd.args(&args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    let output = cmd.output().map_err(|e| ExternalError::ExternalStepFailed {
        command: command.clone(),
        reason: e.to_string(),
    })?;
    Ok(check(&command, output)?)
}

/// Same as [`run_external`], feeding `input` on stdin
pub fn run_external_with_input(command: &str, cwd: Option<&Path>, input: &str) -> Result<String> {
    let failed = |reason: String| ExternalError::ExternalStepFailed {
        command: command.to_string(),
        reason,
    };
    let (program, args) = split(command)?;
    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn().map_err(|e| failed(e.to_string()))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| failed(e.to_string()))?;
    }
    let output = child.wait_with_output().map_err(|e| failed(e.to_string()))?;
    Ok(check(command, output)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_stdout() {
        assert_eq!(run_external("echo hello", None).unwrap(), "hello\n");
    }

    #[test]
    fn names_the_failing_command() {
        let err = run_external("false", None).unwrap_err();
        match err.downcast_ref::<ExternalError>() {
            Some(ExternalError::ExternalStepFailed { command, .. }) => assert_eq!(command, "false"),
            None => panic!("unexpected error {err}"),
        }
    }

    #[test]
    fn missing_program_fails() {
        assert!(run_external("omg-definitely-missing --version", None).is_err());
        assert!(run_external("   ", None).is_err());
    }

    #[test]
    fn arguments_are_not_split() {
        assert_eq!(
            run_external_args("echo", &["[IMP] a:  b"], None).unwrap(),
            "[IMP] a:  b\n"
        );
    }

    #[test]
    fn runs_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_external("pwd", Some(dir.path())).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(out.trim()).canonicalize().unwrap(), expected);
    }
}
