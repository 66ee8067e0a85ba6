//! Logging setup
//!
//! Installs the global `tracing` subscriber from a [`LogConfig`]. Library
//! code only emits events; if no subscriber is installed they are dropped.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogConfig, LogFormat, LogOutput};
use crate::error::{KvError, Result};

/// Install the global subscriber
///
/// `RUST_LOG`, when set, overrides the configured level. Fails if a global
/// subscriber is already installed or the log file cannot be opened.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    // No escape codes in files
    let ansi = !matches!(config.output, LogOutput::File(_));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(make_writer(&config.output)?);

    let result = match config.format {
        LogFormat::Text => builder.with_ansi(ansi).try_init(),
        // Structured events carry their source location
        LogFormat::Json => builder
            .json()
            .with_file(true)
            .with_line_number(true)
            .try_init(),
    };

    result.map_err(|e| KvError::Config(format!("failed to initialize logging: {e}")))
}

/// Build the writer for a log destination
pub fn make_writer(output: &LogOutput) -> Result<BoxMakeWriter> {
    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
    };
    Ok(writer)
}

/// Open `path` for appending, creating missing parent directories
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                KvError::Config(format!(
                    "failed to create log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| KvError::Config(format!("failed to open log file {}: {e}", path.display())))
}
