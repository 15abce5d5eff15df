//! Debug logging support for linepatch
//!
//! When `logging.debug` is enabled in the config (or `--debug` is passed),
//! operations are logged to ~/.linepatch/linepatch.log. `LINEPATCH_LOG`
//! overrides the default `linepatch=info` filter.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

const LOG_FILE_NAME: &str = "linepatch.log";
const DEFAULT_FILTER: &str = "linepatch=info";

/// Initialize the debug logging system
///
/// Returns the path to the log file, or None if logging is not enabled.
pub fn init_debug_logging(debug_enabled: bool) -> Result<Option<PathBuf>> {
    if !debug_enabled {
        return Ok(None);
    }

    let log_dir = default_log_dir()?;
    match init_file_logging(&log_dir) {
        Ok(path) => Ok(Some(path)),
        Err(e) => {
            // Logging must never block a patch
            eprintln!("Warning: Could not set up debug log: {:#}", e);
            Ok(None)
        }
    }
}

fn init_file_logging(log_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let writer = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);

    let filter = EnvFilter::try_from_env("LINEPATCH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(log_dir.join(LOG_FILE_NAME))
}

fn default_log_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".linepatch"))
}

/// Get the log file path without initializing logging
pub fn get_current_log_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".linepatch").join(LOG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from("~/.linepatch/linepatch.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_current_log_path() {
        let path = get_current_log_path();
        assert!(
            path.ends_with(".linepatch/linepatch.log"),
            "Log path should be in .linepatch directory, got: {}",
            path.display()
        );
    }

    #[test]
    fn test_init_debug_logging_disabled() {
        let result = init_debug_logging(false);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), None, "Should return None when debug is disabled");
    }
}
