//! `cvsync daemon`: interval scheduler in the foreground.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use super::load_config;

/// Arguments for `cvsync daemon`.
#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Override `schedule.cron` with a five-field crontab expression.
    #[arg(long, value_name = "EXPR", conflicts_with = "interval")]
    pub cron: Option<String>,

    /// Run every SECS seconds instead of on the configured cron schedule.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Skip the cycle that normally runs at startup.
    #[arg(long)]
    pub no_initial_run: bool,
}

impl DaemonArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let mut config = load_config(config_path)?;
        if let Some(expression) = self.cron {
            config.schedule.cron = Some(expression);
        }
        if let Some(secs) = self.interval {
            config.schedule.cron = None;
            config.schedule.interval_secs = secs;
        }
        if self.no_initial_run {
            config.schedule.run_on_start = false;
        }
        config.validate().context("invalid schedule override")?;

        cvsync_daemon::start_blocking(config).context("daemon exited with error")
    }
}
