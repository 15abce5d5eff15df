use anyhow::{Context, Result};
use linepatch::atomic_write::write_atomic;
use linepatch::cli::{Args, parse_args};
use linepatch::config::{self, Config};
use linepatch::diff_formatter::DiffFormatter;
use linepatch::logger;
use linepatch::runner::{PatchCommand, backup_manager, run_patches};
use linepatch::BackupManager;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

fn main() -> Result<()> {
    let (args, debug) = parse_args()?;

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: using default configuration: {:#}", e);
            Config::default()
        }
    };

    if let Some(log_path) = logger::init_debug_logging(debug || config.debug_enabled())? {
        tracing::info!(log = %log_path.display(), "debug logging enabled");
    }

    match args {
        write @ (Args::Remove { .. }
        | Args::Splice { .. }
        | Args::Between { .. }
        | Args::Replace { .. }
        | Args::Apply { .. }) => {
            let command = PatchCommand::from_args(&write, &config)?;
            if command.patches.is_empty() {
                println!("{}: nothing to do.", command.description);
                return Ok(());
            }
            run_patches(&mut io::stdout().lock(), &command, &config)?;
        }
        Args::Rollback { id, backup_dir } => {
            rollback(id, &backup_manager(backup_dir.as_deref(), &config)?)?;
        }
        Args::History { backup_dir } => {
            let manager = backup_manager(backup_dir.as_deref(), &config)?;
            print!("{}", DiffFormatter::format_history(&manager.list_backups()?));
        }
        Args::BackupList {
            verbose,
            backup_dir,
        } => {
            let manager = backup_manager(backup_dir.as_deref(), &config)?;
            let backups = manager.list_backups()?;
            if backups.is_empty() {
                println!("No backups found in {}", manager.backups_dir().display());
            }
            for backup in backups.iter().rev() {
                println!("{}", DiffFormatter::format_backup_details(backup, verbose));
            }
        }
        Args::BackupShow { id, backup_dir } => {
            let manager = backup_manager(backup_dir.as_deref(), &config)?;
            print!("{}", DiffFormatter::format_backup_details(&manager.get_backup(&id)?, true));
        }
        Args::BackupRestore { id, backup_dir } => {
            rollback(Some(id), &backup_manager(backup_dir.as_deref(), &config)?)?;
        }
        Args::BackupRemove {
            id,
            force,
            backup_dir,
        } => {
            let manager = backup_manager(backup_dir.as_deref(), &config)?;
            if force || confirm(&format!("Remove backup {}?", id))? {
                manager.remove_backup_by_id(&id)?;
                println!("Removed backup {}", id);
            }
        }
        Args::BackupPrune {
            keep,
            keep_days,
            force,
            backup_dir,
        } => {
            let manager = backup_manager(backup_dir.as_deref(), &config)?;
            prune(&manager, keep, keep_days, force)?;
        }
        Args::Config { show } => {
            if show {
                show_config()?;
            } else {
                edit_config()?;
            }
        }
    }

    Ok(())
}

fn rollback(id: Option<String>, manager: &BackupManager) -> Result<()> {
    let backup_id = match id {
        Some(id) => id,
        None => match manager.get_last_backup_id()? {
            Some(id) => {
                println!("Rolling back last operation: {}\n", id);
                id
            }
            None => {
                anyhow::bail!("No backups found to rollback");
            }
        },
    };

    for path in manager.restore_backup(&backup_id)? {
        println!("Restored: {}", path.display());
    }
    println!("\n✅ Rollback complete (backup {} removed)", backup_id);

    Ok(())
}

fn prune(
    manager: &BackupManager,
    keep: Option<usize>,
    keep_days: Option<usize>,
    force: bool,
) -> Result<()> {
    let summary = match (keep, keep_days) {
        (_, Some(days)) => format!("Remove backups older than {} days?", days),
        (keep, None) => format!("Keep only the {} most recent backups?", keep.unwrap_or(10)),
    };
    if !force && !confirm(&summary)? {
        println!("Nothing removed.");
        return Ok(());
    }

    let mut removed = 0;
    if let Some(days) = keep_days {
        removed += manager.prune_backups_older_than(days as i64)?;
    }
    if keep.is_some() || keep_days.is_none() {
        removed += manager.prune_backups(keep.unwrap_or(10))?;
    }

    println!("Removed {} backup{}", removed, if removed == 1 { "" } else { "s" });
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn show_config() -> Result<()> {
    let path = config::config_file_path()?;
    let config = config::load_config_from(&path)?;
    println!("# {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );
    println!("\n# Debug log: {}", logger::get_current_log_path().display());
    Ok(())
}

/// Edit a scratch copy of the config and only install it if it validates
fn edit_config() -> Result<()> {
    let path = config::config_file_path()?;
    if !path.exists() {
        config::save_default_config(&path)?;
    }
    let current = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let scratch = tempfile::Builder::new()
        .prefix("linepatch-config-")
        .suffix(".toml")
        .tempfile()
        .context("Failed to create temp file for editing")?;
    std::fs::write(scratch.path(), &current)?;

    let (program, extra_args) = find_editor()?;
    let status = process::Command::new(&program)
        .args(&extra_args)
        .arg(scratch.path())
        .status()
        .with_context(|| format!("Failed to launch editor: {}", program.display()))?;
    if !status.success() {
        anyhow::bail!("Editor exited with {}; configuration not changed", status);
    }

    let edited = std::fs::read_to_string(scratch.path())?;
    if edited == current {
        println!("Configuration unchanged.");
        return Ok(());
    }

    if let Err(e) = config::parse_config(&edited) {
        eprintln!("Configuration not saved: {:#}", e);
        process::exit(1);
    }

    write_atomic(&path, &edited)?;
    println!("Configuration saved: {}", path.display());
    Ok(())
}

fn find_editor() -> Result<(PathBuf, Vec<String>)> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(value) = std::env::var(var) {
            let mut parts = value.split_whitespace();
            if let Some(program) = parts.next() {
                if let Ok(resolved) = which::which(program) {
                    return Ok((resolved, parts.map(str::to_string).collect()));
                }
            }
        }
    }

    for fallback in ["nano", "vim", "vi"] {
        if let Ok(resolved) = which::which(fallback) {
            return Ok((resolved, Vec::new()));
        }
    }

    anyhow::bail!("No editor found. Set $EDITOR or run 'linepatch config --show'")
}
