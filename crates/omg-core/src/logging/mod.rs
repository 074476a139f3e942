pub mod config;
pub mod file_writer;
pub mod formatter;

use anyhow::Result;
use config::LoggingConfig;
use formatter::LogFormat;
use std::path::PathBuf;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_layer<S>(path: PathBuf, format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer()
        .with_writer(file_writer::FileWriter::new(path))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_timer(fmt::time::ChronoUtc::rfc_3339());
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Initialize logging system with the given configuration
pub fn init(config: LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = config.console.then(|| console_layer(config.format));
    let file = config
        .file
        .clone()
        .map(|path| file_layer(path, config.format));

    Registry::default()
        .with(console)
        .with(file)
        .with(env_filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("Failed to initialize logging: {}", err))
}

/// Initialize logging with default configuration
pub fn init_default() -> Result<()> {
    init(LoggingConfig::default())
}

/// Initialize logging from CLI arguments, falling back to environment variables
pub fn init_from_args(
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    format: LogFormat,
    verbose: bool,
) -> Result<()> {
    let defaults = LoggingConfig::default();
    let level = if verbose {
        "debug".to_string()
    } else {
        log_level.unwrap_or(defaults.level)
    };

    init(LoggingConfig {
        level,
        file: log_file.or(defaults.file),
        console: true,
        format,
    })
}
