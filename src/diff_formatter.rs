use crate::backup_manager::BackupMetadata;
use crate::lines::content_of;
use crate::processor::{FileDiff, Outcome, PatchReport};
use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;

pub struct DiffFormatter;

impl DiffFormatter {
    /// Auto-detect if we should use colors
    fn should_use_color() -> bool {
        // https://no-color.org/
        if std::env::var("NO_COLOR").is_ok() {
            return false;
        }

        std::io::stdout().is_terminal()
    }

    /// Format file diff with `context_size` unchanged lines around each hunk
    pub fn format_diff_with_context(diff: &FileDiff, context_size: usize) -> String {
        Self::render_diff(diff, context_size, Self::should_use_color())
    }

    fn render_diff(diff: &FileDiff, context_size: usize, use_color: bool) -> String {
        let mut output = String::new();
        let path = diff.file_path.display().to_string();

        if use_color {
            output.push_str(&format!("{}\n", path.bold().cyan()));
        } else {
            output.push_str(&format!("{}\n", path));
        }

        let text_diff = TextDiff::from_lines(&diff.original, &diff.patched);
        let mut added = 0;
        let mut deleted = 0;

        for (group_idx, group) in text_diff.grouped_ops(context_size).iter().enumerate() {
            if group_idx > 0 {
                if use_color {
                    output.push_str(&format!("{}\n", "...".dimmed()));
                } else {
                    output.push_str("...\n");
                }
            }

            for op in group {
                for change in text_diff.iter_changes(op) {
                    let (indicator, line_num) = match change.tag() {
                        ChangeTag::Equal => ("=", change.old_index()),
                        ChangeTag::Delete => {
                            deleted += 1;
                            ("-", change.old_index())
                        }
                        ChangeTag::Insert => {
                            added += 1;
                            ("+", change.new_index())
                        }
                    };
                    let line_num = line_num.map(|n| n + 1).unwrap_or(0);
                    let content = content_of(change.value());

                    if use_color {
                        let line = match change.tag() {
                            ChangeTag::Equal => format!("L{}: {} {}\n", line_num, indicator.dimmed(), content.dimmed()),
                            ChangeTag::Delete => format!("L{}: {} {}\n", line_num, indicator.red().bold(), content.red()),
                            ChangeTag::Insert => format!("L{}: {} {}\n", line_num, indicator.green().bold(), content.green().bold()),
                        };
                        output.push_str(&line);
                    } else {
                        output.push_str(&format!("L{}: {} {}\n", line_num, indicator, content));
                    }
                }
            }
        }

        let total = added + deleted;
        if use_color {
            output.push_str(&format!("\nTotal: {} change", total.to_string().bold().white()));
            if total != 1 {
                output.push('s');
            }
            let mut parts = Vec::new();
            if added > 0 {
                parts.push(format!("{} {}", added, "added".green()));
            }
            if deleted > 0 {
                parts.push(format!("{} {}", deleted, "deleted".red()));
            }
            if !parts.is_empty() {
                output.push_str(&format!(" ({})", parts.join(", ")));
            }
            output.push('\n');
        } else {
            output.push_str(&format!(
                "\nTotal: {} changes ({} added, {} deleted)\n",
                total, added, deleted
            ));
        }

        output
    }

    /// One status line per staged patch
    pub fn format_report(report: &PatchReport) -> String {
        Self::render_report(report, Self::should_use_color())
    }

    fn render_report(report: &PatchReport, use_color: bool) -> String {
        let path = report.file.display().to_string();
        let (status, message) = match &report.outcome {
            Outcome::Removed { line_numbers } => {
                let lines: Vec<String> = line_numbers.iter().map(|n| format!("L{}", n)).collect();
                (
                    "Removed",
                    format!(
                        "{} line{} from {} ({})",
                        line_numbers.len(),
                        if line_numbers.len() == 1 { "" } else { "s" },
                        path,
                        lines.join(", ")
                    ),
                )
            }
            Outcome::NotFound { detail } => ("Not found", format!("{}: {}", path, detail)),
            Outcome::Spliced {
                first_line,
                discarded,
                clamped,
            } => (
                "Spliced",
                format!(
                    "{}: replaced {} line{} starting at L{}{}",
                    path,
                    discarded,
                    if *discarded == 1 { "" } else { "s" },
                    first_line,
                    if *clamped { " (boundaries clamped to end of file)" } else { "" }
                ),
            ),
            Outcome::Replaced {
                first_line,
                replaced,
            } => (
                "Replaced",
                format!(
                    "{}: block of {} line{} at L{}",
                    path,
                    replaced,
                    if *replaced == 1 { "" } else { "s" },
                    first_line
                ),
            ),
            Outcome::Unchanged => ("Unchanged", format!("{}: already applied", path)),
        };

        if use_color {
            let status = match &report.outcome {
                Outcome::NotFound { .. } => status.yellow().bold(),
                Outcome::Unchanged => status.dimmed(),
                _ => status.green().bold(),
            };
            format!("{} {}\n", status, message)
        } else {
            format!("{} {}\n", status, message)
        }
    }

    /// Format operation history
    pub fn format_history(backups: &[BackupMetadata]) -> String {
        let use_color = Self::should_use_color();
        let mut output = String::new();

        if backups.is_empty() {
            output.push_str("No backup history found.\n");
            return output;
        }

        if use_color {
            output.push_str(&"Operation History:\n\n".bold().white().to_string());
        } else {
            output.push_str("Operation History:\n\n");
        }

        // Most recent first
        for backup in backups.iter().rev() {
            if use_color {
                output.push_str(&format!("ID: {}\n", backup.id.yellow()));
                output.push_str(&format!("  Time: {}\n", backup.timestamp.format("%Y-%m-%d %H:%M:%S")));
                output.push_str(&format!("  Operation: {}\n", backup.description.cyan()));
            } else {
                output.push_str(&format!("ID: {}\n", backup.id));
                output.push_str(&format!("  Time: {}\n", backup.timestamp.format("%Y-%m-%d %H:%M:%S")));
                output.push_str(&format!("  Operation: {}\n", backup.description));
            }
            output.push_str(&format!("  Files: {}\n", backup.files.len()));
            output.push('\n');
        }

        output
    }

    /// Full details of one backup
    pub fn format_backup_details(backup: &BackupMetadata, verbose: bool) -> String {
        let mut output = String::new();
        output.push_str(&format!("ID: {}\n", backup.id));
        output.push_str(&format!("  Time: {}\n", backup.timestamp.format("%Y-%m-%d %H:%M:%S")));
        output.push_str(&format!("  Operation: {}\n", backup.description));
        output.push_str(&format!("  Files: {} ({} bytes)\n", backup.files.len(), backup.total_size()));
        if verbose {
            for file in &backup.files {
                output.push_str(&format!(
                    "    {} -> {} ({} bytes)\n",
                    file.original_path.display(),
                    file.backup_path.display(),
                    file.size_bytes
                ));
            }
        }
        output
    }

    /// Format dry run header
    pub fn format_dry_run_header(description: &str) -> String {
        if Self::should_use_color() {
            format!("{} {}\n\n", "🔍 Dry run:".bold().cyan(), description.white().bold())
        } else {
            format!("Dry run: {}\n\n", description)
        }
    }
}
