use clap::{Parser, Subcommand};
use colored::Colorize;
use omg_cli::commands::codebase::{execute_codebase, CodebaseOptions};
use omg_cli::commands::init::execute_init;
use omg_cli::commands::inspect::execute_inspect;
use omg_cli::commands::manifest::execute_manifest;
use omg_cli::commands::scaffold::{execute_scaffold_module, execute_scaffold_repo};
use omg_cli::commands::skeleton::execute_skeleton;
use omg_cli::config::{Settings, DEFAULT_CONFIG_FILE};
use omg_cli::ReportFormat;
use omg_core::logging::formatter::LogFormat;
use omg_core::scaffold::ScaffoldOptions;
use omg_core::{ExternalError, ValidationError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "omg", version, about = "Odoo Module Generator")]
struct Cli {
    /// Settings file (default: ./omg.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level or filter directive (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to this file (overrides OMG_LOG_FILE)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default settings file
    Init {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: String,
    },
    /// Rewrite every module under PATH as a skeleton, in place
    Codebase {
        path: String,
        /// Five-part version, e.g. 17.0.1.0.0
        version: String,
        /// Preserve files that are not regenerated
        #[arg(short, long)]
        no_clean: bool,
        /// Commit each module on the codebase branch
        #[arg(short, long)]
        commit: bool,
        /// Write a field-rename migration worksheet
        #[arg(short, long)]
        rename: bool,
    },
    /// Export the skeleton of every module under PATH into another directory
    Skeleton {
        path: String,
        #[arg(short, long)]
        output: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Report modules, models and fields found under PATH
    Inspect {
        path: String,
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: ReportFormat,
        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Normalize the manifest of every module under PATH
    Manifest {
        path: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Scaffold a module or a repository
    #[command(subcommand)]
    Scaffold(ScaffoldCommands),
}

#[derive(Subcommand)]
enum ScaffoldCommands {
    /// New module directory
    Module {
        path: String,
        /// Display name (default: from the directory name)
        #[arg(long)]
        name: Option<String>,
        /// Custom model with views, action and menu
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        version: Option<String>,
        /// Comma-separated dependencies
        #[arg(long, value_delimiter = ',')]
        depends: Vec<String>,
    },
    /// New repository from the configured template
    Repo { path: String },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { path } = &cli.command {
        return execute_init(path);
    }
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Codebase {
            path,
            version,
            no_clean,
            commit,
            rename,
        } => {
            let options = CodebaseOptions {
                clean: !no_clean,
                commit,
                rename,
            };
            execute_codebase(&settings, &path, &version, options).map(|_| ())
        }
        Commands::Skeleton {
            path,
            output,
            version,
        } => execute_skeleton(&settings, &path, &output, version.as_deref()).map(|_| ()),
        Commands::Inspect {
            path,
            format,
            output,
        } => execute_inspect(&path, format, output.as_deref()).map(|_| ()),
        Commands::Manifest { path, version } => {
            execute_manifest(&settings, &path, version.as_deref()).map(|_| ())
        }
        Commands::Scaffold(ScaffoldCommands::Module {
            path,
            name,
            model,
            version,
            depends,
        }) => {
            let options = ScaffoldOptions {
                name,
                model,
                version,
                depends,
            };
            execute_scaffold_module(&settings, &path, &options).map(|_| ())
        }
        Commands::Scaffold(ScaffoldCommands::Repo { path }) => {
            execute_scaffold_repo(&settings, &path)
        }
    }
}

/// 2 for invalid input, 3 for a failed external command
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ValidationError>().is_some() {
        2
    } else if err.downcast_ref::<ExternalError>().is_some() {
        3
    } else {
        1
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = omg_core::init_from_args(
        cli.log_level.clone(),
        cli.log_file.clone(),
        cli.log_format,
        cli.verbose,
    ) {
        eprintln!("{} {:#}", "warning:".yellow(), err);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(exit_code(&err))
        }
    }
}
