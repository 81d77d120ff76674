//! Tracing subscriber setup shared by the daemon and one-shot CLI commands.
//!
//! Console output goes to stderr. With `logging.dir` set, events are also
//! appended to `{dir}/sync_YYYY-MM-DD.log`, the date being taken per event so
//! the file rolls over at local midnight.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use cvsync_core::LoggingConfig;

use crate::error::{io_err, DaemonError};
use crate::paths::current_log_path;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` overrides `logging.level`.
///
/// Fails if a subscriber is already installed or the level does not parse.
pub fn init(config: &LoggingConfig) -> Result<(), DaemonError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| DaemonError::Logging(format!("invalid level '{}': {e}", config.level)))?,
    };

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.json)];
    if let Some(dir) = &config.dir {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        layers.push(file_layer(DailyFile::new(dir), config.json));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| DaemonError::Logging(e.to_string()))
}

fn console_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer().json().with_writer(io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(io::stderr)
            .boxed()
    }
}

fn file_layer(writer: DailyFile, json: bool) -> BoxedLayer {
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
            .boxed()
    }
}

/// [`MakeWriter`] for the dated log file under a directory.
#[derive(Debug, Clone)]
pub struct DailyFile {
    dir: PathBuf,
}

impl DailyFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl<'a> MakeWriter<'a> for DailyFile {
    type Writer = DailyFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DailyFileWriter {
            path: current_log_path(&self.dir),
            file: None,
        }
    }
}

/// Writer for one event; opens the file in append mode on first write.
#[derive(Debug)]
pub struct DailyFileWriter {
    path: PathBuf,
    file: Option<File>,
}

impl Write for DailyFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        self.file.insert(file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
