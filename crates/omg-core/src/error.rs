use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading module sources
#[derive(Debug, Error)]
pub enum ParseError {
    /// Every repair strategy was tried and the file still does not parse
    #[error("Source file {path:?} is not parsable: {message}")]
    SourceNotParsable { path: PathBuf, message: String },

    /// The manifest is not a single literal dict
    #[error("Manifest {path:?} is malformed: {reason}")]
    ManifestMalformed { path: PathBuf, reason: String },

    /// A single field declaration could not be read (used by `Field::from_source`)
    #[error("Not a field declaration: {0}")]
    NotAFieldDeclaration(String),
}

/// Invalid values supplied by the caller
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid version '{0}': expected MAJOR.MINOR.x.y.z (e.g. 17.0.1.0.0)")]
    VersionFormatInvalid(String),

    #[error("Module '{0}' has no version, call set_version first")]
    VersionMissing(String),

    #[error("Invalid model name '{0}'")]
    ModelNameInvalid(String),
}

/// Failures of commands run outside the process
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("External command `{command}` failed: {reason}")]
    ExternalStepFailed { command: String, reason: String },
}

/// Template rendering failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template '{template}' uses undefined variable '{variable}'")]
    MissingVariable { template: String, variable: String },
}
