//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod serve;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::build::progress::ConsoleProgress;
use crate::build::TaskKind;
use crate::config::{load_project, LoadedConfig};

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// sitepipe - Build, serve and relay a static marketing site
#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Asset pipeline, live-reload server and form relay for static sites")]
#[command(version)]
pub struct Cli {
    /// Path to sitepipe.toml (default: search upward from the current directory)
    #[arg(long, global = true, env = "SITEPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run; `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// One-shot development build (readable output, source maps)
    Dev(BuildArgs),
    /// One-shot production build (minified, content-hashed names)
    Build(BuildArgs),
    /// Development build, then watch sources and serve with live reload
    Serve(ServeArgs),
    /// Serve only the contact-form relay
    Relay {
        /// Port to listen on (default: [relay] port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (default: [server] host)
        #[arg(long)]
        host: Option<String>,
    },
}

/// Options shared by `dev` and `build`.
#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Output directory (default: `dev` or `build` under the project root)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Run only these tasks, without cleaning first (repeatable)
    #[arg(long = "only", value_name = "TASK")]
    pub only: Vec<String>,

    /// Report progress as JSON lines on stderr
    #[arg(long)]
    pub json: bool,
}

/// Options of `serve`.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Port to listen on (default: [server] port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (default: [server] host)
    #[arg(long)]
    pub host: Option<String>,

    /// Output directory to build into and serve
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli.command.unwrap_or_else(|| Commands::Serve(ServeArgs::default()));

    if let Commands::Dev(args) | Commands::Build(args) = &command {
        if let Some(unknown) = unknown_task(&args.only) {
            eprintln!(
                "Error: unknown task '{}'. Available tasks: {}",
                unknown,
                TaskKind::ALL.map(TaskKind::name).join(", ")
            );
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    }

    let loaded = match load(cli.config.as_deref()) {
        Some(loaded) => loaded,
        None => return ExitCode::from(EXIT_ERROR),
    };

    match command {
        Commands::Dev(args) => build::run_build(loaded, "development", &args, cli.verbose),
        Commands::Build(args) => build::run_build(loaded, "production", &args, cli.verbose),
        Commands::Serve(args) => serve::run_serve(loaded, &args, cli.verbose),
        Commands::Relay { port, host } => serve::run_relay(loaded, port, host),
    }
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "sitepipe=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed when run() is called twice in-process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn load(config: Option<&Path>) -> Option<LoadedConfig> {
    match load_project(config) {
        Ok(loaded) => {
            match &loaded.source {
                Some(path) => tracing::debug!(config = %path.display(), "using config"),
                None => tracing::debug!("no sitepipe.toml found, using defaults"),
            }
            Some(loaded)
        }
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

/// First `--only` value that names no task.
fn unknown_task(only: &[String]) -> Option<&str> {
    only.iter().map(String::as_str).find(|name| *name != "*" && TaskKind::from_name(name).is_none())
}

/// Console reporter, colored when stderr is a terminal.
fn console_progress(verbose: bool) -> ConsoleProgress {
    ConsoleProgress::new().with_colors(atty::is(atty::Stream::Stderr)).with_verbose(verbose)
}
