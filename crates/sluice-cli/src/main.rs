//! Sluice command-line tool
//!
//! Binds Sluice sources and reports what the binder found: diagnostics for
//! `check`, the instantiated graph for `symbols`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice stream language front end", long_about = None)]
#[command(version)]
struct Cli {
    /// Log binder activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that binds sources
#[derive(clap::Args, Debug, Clone)]
pub struct BindArgs {
    /// Files or directories to bind
    #[arg(default_value = ".")]
    pub files: Vec<String>,

    /// Binder configuration file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fully qualified main composite, e.g. `my.app::Main`
    #[arg(long)]
    pub main: Option<String>,

    /// Only apply syntax-level rules; duplicate clauses become warnings
    #[arg(long)]
    pub syntax_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind sources and report diagnostics
    Check {
        #[command(flatten)]
        bind: BindArgs,
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
        /// Treat warnings as errors
        #[arg(long)]
        deny_warnings: bool,
    },

    /// List namespaces, composite instances and streams
    Symbols {
        #[command(flatten)]
        bind: BindArgs,
        /// Also list every definition in each namespace
        #[arg(long)]
        all: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let color = output::resolve_color_choice(cli.color.as_deref());
    match cli.command {
        Commands::Check {
            bind,
            json,
            deny_warnings,
        } => commands::check::execute(&bind, json, deny_warnings, color),
        Commands::Symbols { bind, all } => commands::symbols::execute(&bind, all, color),
    }
}
