//! hookbridge - lifecycle hooks for agent runtimes
//!
//! Main entry point for the hookbridge CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{dispatch, list, validate, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// hookbridge - run lifecycle hooks for agent runtimes
#[derive(Parser)]
#[command(name = "hookbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory (default: current directory)
    #[arg(long, global = true, env = "HOOKBRIDGE_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// User config directory (default: platform config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch one lifecycle event and print the decision
    Dispatch(dispatch::DispatchArgs),

    /// List registered hooks
    List(list::ListArgs),

    /// Validate hook sources and settings
    Validate(validate::ValidateArgs),

    /// Watch the hooks directory and report reloads
    Watch(watch::WatchArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let loaded =
        hookbridge_config::load_config_with_options(&project_dir, cli.config_dir.as_deref());

    let log_dir = loaded
        .config
        .log_to_file()
        .then(|| cli.config_dir.clone().or_else(hookbridge_config::config_dir))
        .flatten()
        .map(|d| d.join("logs"));
    let _guard = init_tracing(cli.verbose, log_dir.as_deref());

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        config_sources: loaded
            .loaded_from()
            .into_iter()
            .map(Path::to_path_buf)
            .collect(),
        config_warnings: loaded.warnings,
        config: loaded.config,
        project_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Dispatch(args) => dispatch::run(args, &ctx).await,
        Commands::List(args) => list::run(args, &ctx).await,
        Commands::Validate(args) => validate::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
    }
}

/// Console layer on stderr (stdout carries decisions) plus an optional
/// daily-rolling JSON file.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let console_filter = if verbose {
        "hookbridge=debug,hookbridge_hooks=debug,hookbridge_config=debug,info"
    } else {
        "hookbridge=warn,hookbridge_hooks=warn,hookbridge_config=warn,error"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_filter));

    let appender = log_dir.and_then(|dir| {
        let built = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("hookbridge")
            .filename_suffix("log")
            .build(dir);
        match built {
            Ok(appender) => Some(appender),
            Err(e) => {
                // Subscriber is not installed yet.
                eprintln!("warning: file logging disabled: {}", e);
                None
            }
        }
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "hookbridge=trace,hookbridge_hooks=trace,hookbridge_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
