//! cvsync: mirror MetaContrata subcontractors and employees into CVSecurity.
//!
//! # Usage
//!
//! ```text
//! cvsync sync [--config <path>] [--only departments|employees] [--dry-run]
//! cvsync diff [--config <path>] [--json]
//! cvsync daemon [--config <path>]
//! cvsync config show|check [--config <path>]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, daemon::DaemonArgs, diff::DiffArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cvsync",
    version,
    about = "Reconcile CVSecurity departments and persons against MetaContrata",
    long_about = None,
)]
struct Cli {
    /// Path to config.toml (default: ./config.toml, then the user config dir).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation cycle.
    Sync(SyncArgs),

    /// Show the writes a cycle would issue, without writing.
    Diff(DiffArgs),

    /// Run the scheduler in the foreground until interrupted.
    Daemon(DaemonArgs),

    /// Inspect the configuration file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Sync(args) => args.run(config),
        Commands::Diff(args) => args.run(config),
        Commands::Daemon(args) => args.run(config),
        Commands::Config { command } => commands::config::run(command, config),
    }
}
