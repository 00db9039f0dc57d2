use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Level for the stderr layer, e.g. `debug`
pub const LOG_LEVEL_ENV: &str = "JOTTER_LOG";
/// Path of an extra debug-level log file; wins over `logFile` in the config
pub const LOG_FILE_ENV: &str = "JOTTER_LOG_FILE";

fn stderr_level() -> LevelFilter {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber: stderr always, plus a plain-text file
/// layer when a log file is configured. Stdout is left to command output.
pub fn init_tracing(config_log_file: Option<&Path>) -> Result<()> {
    let log_file = std::env::var_os(LOG_FILE_ENV)
        .map(PathBuf::from)
        .or_else(|| config_log_file.map(Path::to_path_buf));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_level());

    let file_layer = match &log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(path) = log_file {
        tracing::debug!(path = %path.display(), "File logging enabled");
    }
    Ok(())
}
