//! Running write commands
//!
//! Turns a parsed write command into patches, stages them, and either prints
//! a preview or backs up the touched files and commits. The binary prints
//! to stdout; tests pass a buffer.

use crate::backup_manager::BackupManager;
use crate::cli::{Args, PayloadArg, WriteOptions};
use crate::config::Config;
use crate::diff_formatter::DiffFormatter;
use crate::lines::read_payload;
use crate::patcher::BoundaryPolicy;
use crate::processor::{FileProcessor, Patch, PatchReport};
use crate::recipe::Recipe;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Patches from one command line, and how to write them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchCommand {
    pub description: String,
    pub patches: Vec<Patch>,
    pub options: WriteOptions,
}

impl PatchCommand {
    /// Build the patches for a write command (`remove`, `splice`, `between`,
    /// `replace`, `apply`). Payload and recipe files are read here.
    pub fn from_args(args: &Args, config: &Config) -> Result<Self> {
        let (patch, options) = match args {
            Args::Remove {
                file,
                guard,
                options,
            } => (Patch::remove(file, guard.clone()), options),
            Args::Splice {
                file,
                start,
                end,
                payload,
                clamp,
                options,
            } => {
                let policy = if *clamp {
                    BoundaryPolicy::Clamp
                } else {
                    config.boundary_policy()
                };
                (
                    Patch::splice(file, *start, *end, resolve_payload(payload)?, policy),
                    options,
                )
            }
            Args::Between {
                file,
                start_marker,
                end_marker,
                payload,
                inclusive,
                options,
            } => (
                Patch::replace_between(
                    file,
                    start_marker.clone(),
                    end_marker.clone(),
                    resolve_payload(payload)?,
                    *inclusive,
                ),
                options,
            ),
            Args::Replace {
                file,
                old,
                new,
                options,
            } => (
                Patch::replace_text(file, resolve_payload(old)?, resolve_payload(new)?),
                options,
            ),
            Args::Apply { recipe, options } => {
                let base = recipe
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                let patches = Recipe::load(recipe)?.into_patches(base, config.boundary_policy())?;
                return Ok(Self {
                    description: format!("apply recipe {}", recipe.display()),
                    patches,
                    options: options.clone(),
                });
            }
            other => anyhow::bail!("Not a command that writes files: {:?}", other),
        };

        Ok(Self {
            description: patch.to_string(),
            patches: vec![patch],
            options: options.clone(),
        })
    }
}

pub fn resolve_payload(payload: &PayloadArg) -> Result<String> {
    match payload {
        PayloadArg::Inline(text) => Ok(text.clone()),
        PayloadArg::File(path) => read_payload(path),
    }
}

/// Backup manager for `--backup-dir`, falling back to the config, then `~/.linepatch/backups`
pub fn backup_manager(flag_dir: Option<&str>, config: &Config) -> Result<BackupManager> {
    let manager = match flag_dir.or(config.backup.backup_dir.as_deref()) {
        Some(dir) => BackupManager::with_directory(dir)?,
        None => BackupManager::new()?,
    };

    let mut manager = manager.with_size_warning(config.backup.max_size_mb.map(|mb| mb * 1024 * 1024));
    if let Some(max) = config.backup.max_backups {
        manager = manager.with_max_backups(max);
    }
    Ok(manager)
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<PatchReport>,
    /// Canonical paths of the files written (empty on a dry run)
    pub written: Vec<PathBuf>,
    pub backup_id: Option<String>,
}

/// Stage every patch, then preview (dry run) or back up and commit
///
/// Nothing is written if any patch fails to stage, or if the backup fails.
pub fn run_patches<W: Write>(
    out: &mut W,
    command: &PatchCommand,
    config: &Config,
) -> Result<RunSummary> {
    let options = &command.options;
    let mut processor = FileProcessor::new();
    for patch in &command.patches {
        processor.stage(patch)?;
    }

    let context = options.context.unwrap_or_else(|| config.context_lines());
    let diffs: Vec<_> = processor
        .diffs()
        .into_iter()
        .filter(|d| d.has_changes())
        .collect();

    if options.dry_run {
        write!(out, "{}", DiffFormatter::format_dry_run_header(&command.description))?;
        for diff in &diffs {
            writeln!(out, "{}", DiffFormatter::format_diff_with_context(diff, context))?;
        }
        write_reports(out, &processor)?;
        return Ok(RunSummary {
            reports: processor.reports().to_vec(),
            written: Vec::new(),
            backup_id: None,
        });
    }

    let changed = processor.changed_files();
    if changed.is_empty() {
        write_reports(out, &processor)?;
        writeln!(out, "No changes made.")?;
        return Ok(RunSummary {
            reports: processor.reports().to_vec(),
            written: Vec::new(),
            backup_id: None,
        });
    }

    let backup_id = if options.no_backup {
        tracing::warn!(files = changed.len(), "writing without backup");
        None
    } else {
        let mut manager = backup_manager(options.backup_dir.as_deref(), config)?;
        Some(
            manager
                .create_backup(&command.description, &changed)
                .context("Failed to create backup; no files were changed")?,
        )
    };

    processor.commit()?;

    for diff in &diffs {
        writeln!(out, "{}", DiffFormatter::format_diff_with_context(diff, context))?;
    }
    write_reports(out, &processor)?;

    if let Some(id) = &backup_id {
        writeln!(out, "\nBackup ID: {}", id)?;
        writeln!(out, "Rollback with: linepatch rollback {}", id)?;
    }

    Ok(RunSummary {
        reports: processor.reports().to_vec(),
        written: changed,
        backup_id,
    })
}

fn write_reports<W: Write>(out: &mut W, processor: &FileProcessor) -> Result<()> {
    for report in processor.reports() {
        write!(out, "{}", DiffFormatter::format_report(report))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherSpec;
    use crate::processor::Outcome;
    use std::fs;
    use tempfile::TempDir;

    fn config_with_backups(dir: &Path) -> Config {
        let mut config = Config::default();
        config.backup.backup_dir = Some(dir.to_string_lossy().to_string());
        config
    }

    fn remove_command(file: &Path, options: WriteOptions) -> PatchCommand {
        let args = Args::Remove {
            file: file.to_path_buf(),
            guard: MatcherSpec::Contains(vec!["TARGET".into(), "X".into()]),
            options,
        };
        PatchCommand::from_args(&args, &Config::default()).unwrap()
    }

    #[test]
    fn test_run_backs_up_before_commit() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("table.tsx");
        fs::write(&file, "A\nTARGET X\nB\n").unwrap();
        let config = config_with_backups(&temp_dir.path().join("backups"));

        let mut out = Vec::new();
        let summary =
            run_patches(&mut out, &remove_command(&file, WriteOptions::default()), &config).unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "A\nB\n");
        assert_eq!(summary.written, vec![fs::canonicalize(&file).unwrap()]);
        let id = summary.backup_id.unwrap();
        assert!(String::from_utf8(out).unwrap().contains(&format!("linepatch rollback {}", id)));

        let manager = backup_manager(None, &config).unwrap();
        let backup = manager.get_backup(&id).unwrap();
        assert_eq!(backup.description, "remove lines that contains \"TARGET\" + \"X\"");
        assert_eq!(
            fs::read_to_string(&backup.files[0].backup_path).unwrap(),
            "A\nTARGET X\nB\n"
        );
    }

    #[test]
    fn test_run_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("table.tsx");
        fs::write(&file, "A\nTARGET X\nB\n").unwrap();
        let backups = temp_dir.path().join("backups");
        let options = WriteOptions {
            dry_run: true,
            ..WriteOptions::default()
        };

        let mut out = Vec::new();
        let summary =
            run_patches(&mut out, &remove_command(&file, options), &config_with_backups(&backups))
                .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "A\nTARGET X\nB\n");
        assert!(summary.written.is_empty());
        assert_eq!(summary.backup_id, None);
        assert_eq!(
            summary.reports[0].outcome,
            Outcome::Removed {
                line_numbers: vec![2]
            }
        );
        assert!(!backups.exists());
        assert!(String::from_utf8(out).unwrap().contains("Dry run"));
    }

    #[test]
    fn test_run_without_backup() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("table.tsx");
        fs::write(&file, "A\nTARGET X\nB\n").unwrap();
        let backups = temp_dir.path().join("backups");
        let options = WriteOptions {
            no_backup: true,
            force: true,
            ..WriteOptions::default()
        };

        let summary = run_patches(
            &mut Vec::new(),
            &remove_command(&file, options),
            &config_with_backups(&backups),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "A\nB\n");
        assert_eq!(summary.backup_id, None);
        assert!(!backups.exists());
    }

    #[test]
    fn test_run_not_found_makes_no_backup() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("table.tsx");
        fs::write(&file, "A\nB\n").unwrap();
        let backups = temp_dir.path().join("backups");

        let mut out = Vec::new();
        let summary = run_patches(
            &mut out,
            &remove_command(&file, WriteOptions::default()),
            &config_with_backups(&backups),
        )
        .unwrap();

        assert!(matches!(summary.reports[0].outcome, Outcome::NotFound { .. }));
        assert_eq!(summary.backup_id, None);
        assert!(!backups.exists());
        assert!(String::from_utf8(out).unwrap().contains("No changes made."));
    }

    #[test]
    fn test_run_failed_patch_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.tsx");
        let second = temp_dir.path().join("b.tsx");
        fs::write(&first, "TARGET X\n").unwrap();
        fs::write(&second, "one\n").unwrap();
        let command = PatchCommand {
            description: "two patches".to_string(),
            patches: vec![
                Patch::remove(&first, MatcherSpec::Contains(vec!["TARGET".into()])),
                Patch::splice(&second, 0, 9, "x", BoundaryPolicy::Strict),
            ],
            options: WriteOptions::default(),
        };

        let result = run_patches(
            &mut Vec::new(),
            &command,
            &config_with_backups(&temp_dir.path().join("backups")),
        );

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&first).unwrap(), "TARGET X\n");
    }

    #[test]
    fn test_from_args_splice_uses_config_policy() {
        let mut config = Config::default();
        config.processing.boundary_policy = Some("clamp".to_string());
        let args = Args::Splice {
            file: PathBuf::from("a.tsx"),
            start: 1,
            end: 2,
            payload: PayloadArg::Inline("x".to_string()),
            clamp: false,
            options: WriteOptions::default(),
        };

        let command = PatchCommand::from_args(&args, &config).unwrap();

        assert_eq!(
            command.patches,
            vec![Patch::splice("a.tsx", 1, 2, "x", BoundaryPolicy::Clamp)]
        );
        assert_eq!(command.description, "splice lines [1, 2)");
    }

    #[test]
    fn test_from_args_rejects_read_only_commands() {
        let args = Args::History { backup_dir: None };
        assert!(PatchCommand::from_args(&args, &Config::default()).is_err());
    }
}
