use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the scheduler, logging setup, and cycle execution.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] cvsync_core::ConfigError),

    #[error("client error: {0}")]
    Client(#[from] cvsync_clients::ClientError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("signal handler failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("task {task} failed: {reason}")]
    Task { task: &'static str, reason: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
