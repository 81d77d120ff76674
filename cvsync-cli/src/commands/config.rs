//! `cvsync config`: inspect the configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use cvsync_core::config::resolve_path;
use cvsync_core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the resolved configuration with secrets masked.
    Show,
    /// Load and validate the configuration.
    Check,
}

pub fn run(command: ConfigCommand, config_path: Option<&Path>) -> Result<()> {
    let path = resolve_path(config_path).context("failed to locate configuration")?;
    let config = Config::load_at(&path)
        .with_context(|| format!("invalid configuration at {}", path.display()))?;

    match command {
        ConfigCommand::Show => {
            let rendered = config
                .redacted()
                .to_toml()
                .context("failed to render configuration")?;
            println!("# {}", path.display());
            print!("{rendered}");
        }
        ConfigCommand::Check => {
            println!("{} {} is valid", "✓".green().bold(), path.display());
        }
    }
    Ok(())
}
