use crate::logging::formatter::LogFormat;
use std::path::PathBuf;

/// Environment variable holding the default log file path
pub const LOG_FILE_ENV: &str = "OMG_LOG_FILE";

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level or filter directive (error, warn, info, debug, trace, `omg_core=debug`)
    pub level: String,
    /// Path to log file (None = no file logging)
    pub file: Option<PathBuf>,
    /// Log to stderr
    pub console: bool,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            file: std::env::var(LOG_FILE_ENV).ok().map(PathBuf::from),
            console: true,
            format: LogFormat::Text,
        }
    }
}
