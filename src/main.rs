mod commands;
mod completion;
mod config;
mod diagnostics;
mod document;
mod engine;
mod error;
mod hover;
mod links;
mod locator;
mod policy;
mod repository;
mod resolver;
mod scanner;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::Format;
use crate::config::{Config, Overrides};
use crate::engine::Engine;

/// Exit code for runtime errors (bad arguments, unreadable files, watcher failure).
const EXIT_ERROR: u8 = 3;

#[derive(Parser)]
#[command(name = "settingsref", about = "Check, preview and navigate Meteor-style settings references")]
struct Cli {
    /// Config file (default: `.settingsref.toml` in the root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root namespace token, e.g. `Meteor`
    #[arg(long, global = true)]
    namespace: Option<String>,
    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Settings JSON file, absolute or relative to the root
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint settings references in JS/TS files
    Check {
        /// Files or directories to lint (default: the root)
        paths: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },
    /// Completion items for the text before a position
    Complete {
        /// Document to complete in
        file: PathBuf,
        /// One-based `LINE:COL` of the cursor
        position: String,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },
    /// Preview the settings value under a position
    Hover {
        /// Document to inspect
        file: PathBuf,
        /// One-based `LINE:COL`
        position: String,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },
    /// List links from settings references into the settings file
    Links {
        /// Document to inspect
        file: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },
    /// Print the parsed settings, or the value at a dotted path
    Show {
        /// Dotted key path, e.g. `public.api`
        path: Option<String>,
    },
    /// Check, then re-check whenever settings or sources change
    Watch {
        /// Files or directories to lint (default: the root)
        paths: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: Format,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = build_engine(&cli).and_then(|engine| {
        return match &cli.command {
            Commands::Check { paths, format } => commands::check(&engine, paths, *format),
            Commands::Complete { file, position, format } => commands::complete(&engine, file, position, *format),
            Commands::Hover { file, position, format } => commands::hover(&engine, file, position, *format),
            Commands::Links { file, format } => commands::links(&engine, file, *format),
            Commands::Show { path } => commands::show(&engine, path.as_deref()),
            Commands::Watch { paths, format } => watch::run(&engine, paths, *format),
        };
    });

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_ERROR)
        },
    };
}

/// Structured logs to stderr; `RUST_LOG` wins unless `-v` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_err| return tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load config for the root and apply command-line overrides.
///
/// # Errors
///
/// Returns config loading errors or a namespace that does not compile.
fn build_engine(cli: &Cli) -> Result<Engine, error::Error> {
    let root = std::path::absolute(&cli.root)?;
    let overrides = Overrides {
        config: cli.config.clone(),
        namespace: cli.namespace.clone(),
        settings_file: cli.settings.clone(),
    };
    let config = Config::load(&root, &overrides)?;
    return Engine::new(config);
}
