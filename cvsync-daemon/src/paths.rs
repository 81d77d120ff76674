use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

pub const LOG_FILE_PREFIX: &str = "sync_";
pub const LOG_FILE_EXTENSION: &str = "log";

/// `sync_YYYY-MM-DD.log`
pub fn log_file_name(date: NaiveDate) -> String {
    format!(
        "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXTENSION}",
        date.format("%Y-%m-%d")
    )
}

pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(log_file_name(date))
}

/// Today's log file under `dir`, in local time.
pub fn current_log_path(dir: &Path) -> PathBuf {
    log_file_path(dir, Local::now().date_naive())
}
