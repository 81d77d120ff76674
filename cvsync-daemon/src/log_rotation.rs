//! Size-based rotation for the dated sync log.
//!
//! The file writer reopens its path on every event, so renaming the live file
//! away is enough: the next event recreates it. Backups are numbered
//! `sync_2024-03-07.log.1` (newest) up to `.5` (oldest).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::paths::current_log_path;

/// When to rotate and how many backups to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for RotationPolicy {
    /// 10 MiB, five backups.
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_files: 5,
        }
    }
}

/// Rotate `log_path` once it reaches `policy.max_bytes`.
///
/// Returns `true` if the file was rotated. A missing file is not an error.
pub fn rotate_if_needed(log_path: &Path, policy: RotationPolicy) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < policy.max_bytes || policy.max_files == 0 {
        return Ok(false);
    }

    let oldest = backup_path(log_path, policy.max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..policy.max_files).rev() {
        let from = backup_path(log_path, n);
        if from.exists() {
            fs::rename(&from, backup_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, backup_path(log_path, 1))?;
    Ok(true)
}

/// Rotate today's log under `dir`; failures are logged, never returned.
pub fn rotate_current(dir: &Path, policy: RotationPolicy) {
    let path = current_log_path(dir);
    match rotate_if_needed(&path, policy) {
        Ok(true) => tracing::info!(path = %path.display(), "log file rotated"),
        Ok(false) => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "log rotation failed"),
    }
}

fn backup_path(base: &Path, n: usize) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
