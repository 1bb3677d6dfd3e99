use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::{self, LogConfig};

const LOG_FILE_NAME: &str = "fnreview.log";

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Headless commands: log to stderr.
    Stderr,
    /// Terminal UI: log to a file so the screen stays clean.
    File,
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Resolve the log file path: configured path, else the data directory.
pub fn log_file_path(config: &LogConfig) -> Result<PathBuf> {
    match &config.file {
        Some(path) => Ok(path.clone()),
        None => Ok(config::data_dir()?.join(LOG_FILE_NAME)),
    }
}

/// Install the global subscriber. Returns the log file path when logging to
/// a file.
pub fn init(config: &LogConfig, target: LogTarget) -> Result<Option<PathBuf>> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter(&config.level))
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to install logger: {}", err))?;
            Ok(None)
        }
        LogTarget::File => {
            let path = log_file_path(config)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter(&config.level))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|err| anyhow::anyhow!("failed to install logger: {}", err))?;
            Ok(Some(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_log_file_wins() {
        let config = LogConfig {
            level: "debug".to_string(),
            file: Some(PathBuf::from("/tmp/review.log")),
        };
        assert_eq!(log_file_path(&config).unwrap(), PathBuf::from("/tmp/review.log"));
    }
}
