//! cvsync core library: record types, configuration, field normalization, errors.
//!
//! Public API surface:
//! - [`types`]: business-code newtype and the four record shapes
//! - [`normalize`]: name cleaning rules enforced by CVSecurity
//! - [`config`]: TOML configuration (`config.toml`)
//! - [`error`]: [`ConfigError`], [`NormalizeError`]

pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use config::{Config, CvConfig, LoggingConfig, MetaConfig, ScheduleConfig, SyncSettings};
pub use error::{ConfigError, NormalizeError};
pub use normalize::{
    clean_string, normalize_full_name, normalize_full_name_with, CleanMode, NAME_MAX_LEN,
};
pub use types::{BusinessCode, SourceDepartment, SourceEmployee, TargetDepartment, TargetPerson};
