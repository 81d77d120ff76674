//! TOML configuration.
//!
//! # Lookup order
//!
//! 1. An explicit `--config <path>`.
//! 2. `./config.toml` in the working directory.
//! 3. `<config_dir>/cvsync/config.toml` (e.g. `~/.config/cvsync/config.toml`).
//!
//! # API pattern
//!
//! [`Config::load_at`] reads one known path and is what tests use;
//! [`Config::load`] resolves the lookup order and delegates to it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use croner::Cron;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::normalize::NAME_MAX_LEN;
use crate::types::BusinessCode;

pub const CONFIG_FILE_NAME: &str = "config.toml";

const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Root of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub metacontrata: MetaConfig,
    pub cvsecurity: CvConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[metacontrata]`: the source system.
#[derive(Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Base URL of the API, e.g. `https://meta.example.com/api/`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Only list active employees (`SoloEmpleadosActivos`).
    #[serde(default = "default_true")]
    pub only_active: bool,
    /// Per-request timeout, login included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// `[cvsecurity]`: the target system.
#[derive(Clone, Serialize, Deserialize)]
pub struct CvConfig {
    /// Scheme and host, e.g. `https://cv.example.com`.
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub api_key: String,
    /// Accept self-signed TLS certificates.
    #[serde(default)]
    pub ignore_ssl: bool,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// `[sync]`: reconciliation engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Persons per bulk write call.
    pub batch_size: usize,
    /// CVSecurity's built-in default department, never created or deleted.
    pub reserved_department_code: BusinessCode,
    pub name_max_len: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            reserved_department_code: BusinessCode::from("1"),
            name_max_len: NAME_MAX_LEN,
        }
    }
}

/// `[schedule]`: daemon cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Five-field crontab expression in local time, e.g. `0 2 * * *`.
    /// When set, `interval_secs` is ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    pub interval_secs: u64,
    /// Run a cycle immediately on start instead of waiting one interval.
    pub run_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: None,
            interval_secs: 3600,
            run_on_start: true,
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The parsed `cron` expression, if one is configured.
    pub fn cron_schedule(&self) -> Result<Option<Cron>, ConfigError> {
        self.cron.as_deref().map(parse_cron).transpose()
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for dated `sync_YYYY-MM-DD.log` files; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

// Secrets never reach log output through `{:?}`.
impl fmt::Debug for MetaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("only_active", &self.only_active)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for CvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvConfig")
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .field("api_key", &REDACTED)
            .field("ignore_ssl", &self.ignore_ssl)
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Load / validate
// ---------------------------------------------------------------------------

impl Config {
    /// Load and validate the config at `path`.
    ///
    /// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
    /// path + line context) if malformed, `ConfigError::Invalid` if a value is
    /// out of range.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the lookup order and load the first existing file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_at(&resolve_path(explicit)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metacontrata.base_url.trim().is_empty() {
            return Err(invalid("metacontrata.base_url", "must not be empty"));
        }
        if self.cvsecurity.base_url.trim().is_empty() {
            return Err(invalid("cvsecurity.base_url", "must not be empty"));
        }
        if self.cvsecurity.page_size == 0 {
            return Err(invalid("cvsecurity.page_size", "must be at least 1"));
        }
        if self.sync.batch_size == 0 {
            return Err(invalid("sync.batch_size", "must be at least 1"));
        }
        if self.sync.name_max_len == 0 {
            return Err(invalid("sync.name_max_len", "must be at least 1"));
        }
        if self.metacontrata.timeout_secs == 0 {
            return Err(invalid("metacontrata.timeout_secs", "must be at least 1"));
        }
        if self.cvsecurity.timeout_secs == 0 {
            return Err(invalid("cvsecurity.timeout_secs", "must be at least 1"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(invalid("schedule.interval_secs", "must be at least 1"));
        }
        self.schedule.cron_schedule()?;
        Ok(())
    }

    /// A copy with every secret replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.metacontrata.password = REDACTED.to_string();
        copy.cvsecurity.api_key = REDACTED.to_string();
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Pick the config path per the lookup order without reading it.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }
    if let Some(user) = dirs::config_dir().map(|d| d.join("cvsync").join(CONFIG_FILE_NAME)) {
        if user.exists() {
            return Ok(user);
        }
    }
    Err(ConfigError::NotFound { path: local })
}

/// Parse a standard five-field crontab expression.
pub fn parse_cron(expression: &str) -> Result<Cron, ConfigError> {
    Cron::new(expression)
        .parse()
        .map_err(|e| invalid("schedule.cron", &format!("'{expression}': {e}")))
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
[metacontrata]
base_url = "https://meta.example.com/api/"
username = "sync"
password = "hunter2"

[cvsecurity]
base_url = "https://cv.example.com"
api_key = "token-123"
"#;

    const PASSWORD_LINE: &str = "password = \"hunter2\"";

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config::load_at(&write_config(&dir, MINIMAL)).expect("load");
        assert!(config.metacontrata.only_active);
        assert_eq!(config.cvsecurity.port, None);
        assert_eq!(config.cvsecurity.page_size, 1000);
        assert_eq!(config.sync, SyncSettings::default());
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.sync.reserved_department_code.as_str(), "1");
        assert_eq!(config.sync.name_max_len, 25);
        assert_eq!(config.schedule.interval(), Duration::from_secs(3600));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn numeric_reserved_code_is_accepted() {
        let dir = TempDir::new().expect("tempdir");
        let contents = format!("{MINIMAL}\n[sync]\nreserved_department_code = 1\n");
        let config = Config::load_at(&write_config(&dir, &contents)).expect("load");
        assert_eq!(config.sync.reserved_department_code, BusinessCode::from("1"));
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let contents = format!("{MINIMAL}\n[sync]\nbatch_size = 0\n");
        let err = Config::load_at(&write_config(&dir, &contents)).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "sync.batch_size", .. }),
            "got: {err}"
        );
    }

    #[test]
    fn metacontrata_timeout_defaults_and_overrides() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config::load_at(&write_config(&dir, MINIMAL)).expect("load");
        assert_eq!(config.metacontrata.timeout_secs, 30);

        let contents = MINIMAL.replace(PASSWORD_LINE, &format!("{PASSWORD_LINE}\ntimeout_secs = 5"));
        let config = Config::load_at(&write_config(&dir, &contents)).expect("load");
        assert_eq!(config.metacontrata.timeout_secs, 5);
    }

    #[test]
    fn zero_metacontrata_timeout_is_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let contents = MINIMAL.replace(PASSWORD_LINE, &format!("{PASSWORD_LINE}\ntimeout_secs = 0"));
        let err = Config::load_at(&write_config(&dir, &contents)).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "metacontrata.timeout_secs", .. }),
            "got: {err}"
        );
    }

    #[test]
    fn cron_expression_is_parsed() {
        let dir = TempDir::new().expect("tempdir");
        let contents = format!("{MINIMAL}\n[schedule]\ncron = \"0 2 * * *\"\n");
        let config = Config::load_at(&write_config(&dir, &contents)).expect("load");
        assert_eq!(config.schedule.cron.as_deref(), Some("0 2 * * *"));
        assert!(config.schedule.cron_schedule().expect("cron").is_some());
    }

    #[test]
    fn malformed_cron_expression_is_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let contents = format!("{MINIMAL}\n[schedule]\ncron = \"every night\"\n");
        let err = Config::load_at(&write_config(&dir, &contents)).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "schedule.cron", .. }),
            "got: {err}"
        );
        assert!(err.to_string().contains("every night"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config::load_at(&write_config(&dir, MINIMAL)).expect("load");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("token-123"));
        assert!(debug.contains("meta.example.com"));
    }

    #[test]
    fn redacted_toml_hides_secrets() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config::load_at(&write_config(&dir, MINIMAL)).expect("load");
        let rendered = config.redacted().to_toml().expect("toml");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(REDACTED));
        assert!(rendered.contains("batch_size = 100"));
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let explicit = Path::new("/etc/cvsync/custom.toml");
        assert_eq!(resolve_path(Some(explicit)).expect("resolve"), explicit);
    }
}
