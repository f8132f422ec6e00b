//! `tracing` subscriber setup.
//!
//! The TUI owns the terminal, so while it runs logs go to a file instead of
//! stderr. `RUST_LOG` takes precedence over the configured level.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LoggingSettings;

/// Where logs end up when the TUI is active and no file is configured.
pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("fmcast.log")
}

fn filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns the log file path, if logging to one.
pub fn init(settings: &LoggingSettings, tui: bool) -> anyhow::Result<Option<PathBuf>> {
    let file = match (&settings.file, tui) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_log_file()),
        (None, false) => None,
    };

    let writer = match &file {
        Some(path) => {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(handle))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter(settings))
        .with_writer(writer)
        .with_ansi(file.is_none())
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(file)
}
