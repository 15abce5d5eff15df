//! Atomic file replacement
//!
//! Content is written to a temp file next to the target and renamed over it,
//! so a crash or a failed write leaves either the old file or the new one.

use crate::error_helpers;
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub fn write_atomic(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    let content = content.as_ref();
    // Temp file must live on the same filesystem for the rename to be atomic
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let temp_file = NamedTempFile::new_in(parent_dir).map_err(|e| {
        let message = error_helpers::write_error(path, &e);
        anyhow::Error::new(e).context(message)
    })?;

    {
        let mut writer = BufWriter::new(temp_file.as_file());
        writer
            .write_all(content)
            .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
        writer.flush().context("Failed to flush temp file")?;
    }

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to sync temp file")?;

    if let Ok(metadata) = fs::metadata(path) {
        temp_file
            .as_file()
            .set_permissions(metadata.permissions())
            .with_context(|| format!("Failed to copy permissions from {}", path.display()))?;
    }

    temp_file.persist(path).map_err(|e| {
        let message = error_helpers::write_error(path, &e.error);
        anyhow::Error::new(e.error).context(message)
    })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "replaced file");
    Ok(())
}
