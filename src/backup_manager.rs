use crate::atomic_write::write_atomic;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_BACKUPS: usize = 50;
const METADATA_FILE: &str = "operation.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Human-readable summary of the patches that triggered the backup
    pub description: String,
    pub files: Vec<FileBackup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    #[serde(default)]
    pub size_bytes: u64,
}

impl BackupMetadata {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

pub struct BackupManager {
    backups_dir: PathBuf,
    max_backups: usize,
    /// Warn when a single backup exceeds this many bytes
    warn_size_bytes: Option<u64>,
}

impl BackupManager {
    /// Backups under `~/.linepatch/backups`
    pub fn new() -> Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        Self::with_directory(home_dir.join(".linepatch").join("backups"))
    }

    /// Create a BackupManager with a custom backup directory
    pub fn with_directory(dir: impl Into<PathBuf>) -> Result<Self> {
        let backups_dir = dir.into();

        fs::create_dir_all(&backups_dir).with_context(|| {
            format!(
                "Failed to create backups directory: {}",
                backups_dir.display()
            )
        })?;

        Ok(Self {
            backups_dir,
            max_backups: DEFAULT_MAX_BACKUPS,
            warn_size_bytes: None,
        })
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    pub fn with_size_warning(mut self, bytes: Option<u64>) -> Self {
        self.warn_size_bytes = bytes;
        self
    }

    /// Get the backup directory path
    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn create_backup(&mut self, description: &str, files: &[PathBuf]) -> Result<String> {
        let mut total_size = 0u64;
        for file_path in files {
            if file_path.exists() {
                total_size += file_path
                    .metadata()
                    .with_context(|| {
                        format!("Failed to get file metadata: {}", file_path.display())
                    })?
                    .len();
            }
        }

        if let Some(limit) = self.warn_size_bytes {
            if total_size > limit {
                eprintln!(
                    "⚠️  Warning: This operation will create a large backup ({} bytes)",
                    total_size
                );
                eprintln!("Consider using --no-backup --force for files under version control");
                warn!(total_size, limit, "large backup");
            }
        }

        // Millisecond precision keeps ids sortable
        let id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S%3f"),
            Uuid::new_v4().to_string().split_at(8).0
        );
        let backup_dir = self.backups_dir.join(&id);

        fs::create_dir_all(&backup_dir).with_context(|| {
            format!(
                "Failed to create backup directory: {}",
                backup_dir.display()
            )
        })?;

        let mut file_backups = Vec::new();

        for (index, file_path) in files.iter().enumerate() {
            if !file_path.exists() {
                continue;
            }

            // Restores must not depend on the working directory at rollback time
            let original_path = fs::canonicalize(file_path)
                .with_context(|| format!("Failed to resolve path: {}", file_path.display()))?;
            let file_name = original_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", file_path.display()))?;

            // Index prefix keeps same-named files from different directories apart
            let backup_path =
                backup_dir.join(format!("{}-{}", index, file_name.to_string_lossy()));

            let size_bytes = fs::copy(file_path, &backup_path)
                .with_context(|| format!("Failed to backup file: {}", file_path.display()))?;

            file_backups.push(FileBackup {
                original_path,
                backup_path,
                size_bytes,
            });
        }

        let metadata = BackupMetadata {
            id: id.clone(),
            timestamp: Utc::now(),
            description: description.to_string(),
            files: file_backups,
        };

        let metadata_path = backup_dir.join(METADATA_FILE);
        let metadata_json =
            serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;

        fs::write(&metadata_path, metadata_json)
            .with_context(|| format!("Failed to write metadata: {}", metadata_path.display()))?;

        info!(id = %id, files = metadata.files.len(), total_size, "created backup");

        self.cleanup_old_backups()?;

        Ok(id)
    }

    /// Load the metadata of one backup
    pub fn get_backup(&self, id: &str) -> Result<BackupMetadata> {
        let backup_dir = self.backups_dir.join(id);
        if !backup_dir.exists() {
            anyhow::bail!("Backup not found: {}", id);
        }

        let metadata_path = backup_dir.join(METADATA_FILE);
        let metadata_json = fs::read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read metadata: {}", metadata_path.display()))?;

        Self::parse_backup_metadata(&metadata_json)
    }

    /// Copy every file of a backup back into place, then delete the backup
    ///
    /// Returns the restored paths.
    pub fn restore_backup(&self, id: &str) -> Result<Vec<PathBuf>> {
        let metadata = self.get_backup(id)?;
        let mut restored = Vec::new();

        for file_backup in &metadata.files {
            if !file_backup.backup_path.exists() {
                eprintln!(
                    "Warning: Backup file missing: {}",
                    file_backup.backup_path.display()
                );
                continue;
            }

            let content = fs::read(&file_backup.backup_path).with_context(|| {
                format!(
                    "Failed to read backup file: {}",
                    file_backup.backup_path.display()
                )
            })?;
            if let Some(parent) = file_backup.original_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            write_atomic(&file_backup.original_path, &content).with_context(|| {
                format!(
                    "Failed to restore file: {}",
                    file_backup.original_path.display()
                )
            })?;

            restored.push(file_backup.original_path.clone());
        }

        self.remove_backup_by_id(id)?;
        info!(id = %id, files = restored.len(), "restored backup");

        Ok(restored)
    }

    pub fn get_last_backup_id(&self) -> Result<Option<String>> {
        let backups = self.list_backups()?;
        Ok(backups.last().map(|b| b.id.clone()))
    }

    /// All readable backups, oldest first
    pub fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backups_dir).with_context(|| {
            format!(
                "Failed to read backups directory: {}",
                self.backups_dir.display()
            )
        })? {
            let entry = entry?;
            let metadata_path = entry.path().join(METADATA_FILE);

            if !metadata_path.exists() {
                continue;
            }

            let metadata_json = fs::read_to_string(&metadata_path)?;
            if let Ok(metadata) = serde_json::from_str::<BackupMetadata>(&metadata_json) {
                backups.push(metadata);
            }
        }

        // Equal timestamps fall back to the id
        backups.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(backups)
    }

    fn cleanup_old_backups(&self) -> Result<()> {
        let removed = self.prune_backups(self.max_backups)?;
        if removed > 0 {
            info!(removed, "removed old backups");
        }
        Ok(())
    }

    pub fn remove_backup_by_id(&self, backup_id: &str) -> Result<()> {
        let backup_dir = self.backups_dir.join(backup_id);
        if !backup_dir.exists() {
            anyhow::bail!("Backup not found: {}", backup_id);
        }
        fs::remove_dir_all(&backup_dir)
            .with_context(|| format!("Failed to remove backup: {}", backup_dir.display()))?;
        Ok(())
    }

    /// Parse backup metadata from JSON string
    pub fn parse_backup_metadata(json: &str) -> Result<BackupMetadata> {
        let metadata: BackupMetadata =
            serde_json::from_str(json).context("Failed to parse backup metadata")?;
        Ok(metadata)
    }

    /// Prune backups keeping only the N most recent ones
    pub fn prune_backups(&self, keep_count: usize) -> Result<usize> {
        let backups = self.list_backups()?;

        if backups.len() <= keep_count {
            return Ok(0);
        }

        let to_remove = backups.len() - keep_count;
        for backup in backups.iter().take(to_remove) {
            self.remove_backup_by_id(&backup.id)?;
        }

        Ok(to_remove)
    }

    /// Prune backups older than the specified number of days
    pub fn prune_backups_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let mut removed = 0;

        for backup in self.list_backups()? {
            if backup.timestamp < cutoff {
                self.remove_backup_by_id(&backup.id)?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}
