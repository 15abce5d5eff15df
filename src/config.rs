/// Configuration management for linepatch
///
/// linepatch stores configuration in ~/.linepatch/config.toml

use crate::patcher::BoundaryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// linepatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backup settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Processing settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Custom backup directory
    #[serde(default)]
    pub backup_dir: Option<String>,

    /// Number of backups to keep before the oldest are removed
    #[serde(default = "default_max_backups")]
    pub max_backups: Option<usize>,

    /// Warn when a backup exceeds this size in MB
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: Option<u64>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            max_backups: default_max_backups(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of context lines to show
    #[serde(default = "default_context_lines")]
    pub context_lines: Option<usize>,

    /// "strict" rejects out-of-range splice boundaries, "clamp" clamps them
    #[serde(default = "default_boundary_policy")]
    pub boundary_policy: Option<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            boundary_policy: default_boundary_policy(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write a debug log to ~/.linepatch/linepatch.log
    #[serde(default)]
    pub debug: Option<bool>,
}

fn default_max_backups() -> Option<usize> { Some(50) }
fn default_max_size_mb() -> Option<u64> { Some(100) }
fn default_context_lines() -> Option<usize> { Some(2) }
fn default_boundary_policy() -> Option<String> { Some("strict".to_string()) }

impl Config {
    pub fn context_lines(&self) -> usize {
        self.processing.context_lines.unwrap_or(2)
    }

    pub fn boundary_policy(&self) -> BoundaryPolicy {
        self.processing
            .boundary_policy
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    pub fn debug_enabled(&self) -> bool {
        self.logging.debug.unwrap_or(false)
    }
}

/// `~/.linepatch`, created on demand
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    let config_dir = home_dir.join(".linepatch");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# linepatch Configuration File
#
# Values set here can be overridden by command-line flags.
# Run 'linepatch config' to edit this file.

[backup]
# Custom backup directory (optional, default: ~/.linepatch/backups/)
#backup_dir = "/mnt/backups/linepatch"

# Number of backups to keep; older ones are removed automatically (default: 50)
max_backups = 50

# Warn before creating a backup larger than this many MB (default: 100)
max_size_mb = 100

[processing]
# Context lines shown around changes in previews (default: 2, max: 10)
context_lines = 2

# Out-of-range splice boundaries: "strict" (default) fails with an error,
# "clamp" clamps them to the end of the file and logs a warning
boundary_policy = "strict"

[logging]
# Write a debug log to ~/.linepatch/linepatch.log (default: false)
debug = false
"#
}

/// Save the default commented configuration file
pub fn save_default_config(path: &Path) -> Result<()> {
    fs::write(path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

    Ok(())
}

/// Parse configuration text
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config = toml::from_str(text).context("Failed to parse config file")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a file, creating the default one if missing
///
/// A malformed file is reported on stderr and defaults are used; the file
/// itself is left alone so the user can fix it.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        save_default_config(path)?;
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    match parse_config(&config_str) {
        Ok(config) => Ok(config),
        Err(e) => {
            eprintln!(
                "Warning: ignoring invalid config {}: {:#}",
                path.display(),
                e
            );
            Ok(Config::default())
        }
    }
}

/// Load configuration from ~/.linepatch/config.toml
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file_path()?)
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(max_backups) = config.backup.max_backups {
        if max_backups == 0 {
            anyhow::bail!("Invalid max_backups: 0 (must be at least 1)");
        }
    }

    if let Some(context) = config.processing.context_lines {
        if context > 10 {
            anyhow::bail!("Invalid context_lines: {} (max 10)", context);
        }
    }

    if let Some(policy) = &config.processing.boundary_policy {
        policy
            .parse::<BoundaryPolicy>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(())
}
