//! Subcommand implementations and the setup they share.

pub mod config;
pub mod daemon;
pub mod diff;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use cvsync_clients::{CvClient, MetaClient};
use cvsync_core::Config;

pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("failed to load configuration")
}

pub(crate) fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

/// Log in to MetaContrata and build the CVSecurity client.
pub(crate) async fn connect(config: &Config) -> Result<(MetaClient, CvClient)> {
    let meta = MetaClient::connect(&config.metacontrata)
        .await
        .context("MetaContrata login failed")?;
    let cv = CvClient::new(&config.cvsecurity).context("invalid CVSecurity settings")?;
    Ok((meta, cv))
}
