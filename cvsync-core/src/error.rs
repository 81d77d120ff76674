//! Error types for cvsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while locating, loading, or validating `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error on load, with file path and line context from `toml`.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// TOML serialization error (`cvsync config show`).
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No config file at the expected location.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// The file parsed but a value is unusable.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors from the field normalizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// A cleaning mode name other than `alphanumeric` / `alphabetic`.
    #[error("unknown cleaning mode '{0}'; expected: alphanumeric, alphabetic")]
    InvalidMode(String),
}
