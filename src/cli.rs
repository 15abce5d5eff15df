use crate::matcher::MatcherSpec;
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

Copyright (c) 2025 InkyQuill
License: MIT
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "linepatch")]
#[command(about = "Guarded line-oriented file patching with preview, backups, and rollback")]
#[command(long_about = "linepatch performs small, repeatable edits on source files:
removing lines identified by guard substrings, splicing a payload block over a
line range, or replacing the block between two marker lines.

Every write goes through a temp file and an atomic rename, and a backup is
taken first so any change can be rolled back.

EXAMPLES:
  linepatch remove Dashboard.tsx -c '<th' -c 'KDV %'
      Remove every line containing both '<th' and 'KDV %'
  linepatch remove Dashboard.tsx --regex '^\\s*<th>KDV %</th>$'
      Remove lines matching an anchored regex
  linepatch splice Dashboard.tsx --start 516 --end 781 --payload-file grid.tsx
      Keep lines [0, 516), insert grid.tsx, keep lines [781, end)
  linepatch between Customer.tsx --start-contains '<tbody>' --end-contains '</tbody>' --payload-file rows.tsx
      Replace the lines between the markers
  linepatch apply fixes.toml --dry-run
      Preview a recipe of patches
  linepatch rollback
      Undo the last operation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    /// Write a debug log to ~/.linepatch/linepatch.log
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command that writes files
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Preview changes without modifying files
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,

    /// Number of context lines to show around changes
    #[arg(short = 'n', long, value_name = "NUM")]
    pub context: Option<usize>,

    /// Skip backup creation (requires --force)
    #[arg(long = "no-backup", requires = "force")]
    #[arg(help = "Skip creating a backup (requires --force)\n⚠️  USE WITH CAUTION: Changes cannot be undone!")]
    pub no_backup: bool,

    /// Force dangerous operations (use with --no-backup)
    #[arg(long = "force", requires = "no_backup")]
    pub force: bool,

    /// Custom backup directory
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct PayloadArgs {
    /// Payload text to insert
    #[arg(long, value_name = "TEXT")]
    payload: Option<String>,

    /// Read the payload block from a file
    #[arg(long, value_name = "FILE")]
    payload_file: Option<PathBuf>,
}

/// Where the payload block comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadArg {
    Inline(String),
    File(PathBuf),
}

impl From<PayloadArgs> for PayloadArg {
    fn from(args: PayloadArgs) -> Self {
        match (args.payload, args.payload_file) {
            (_, Some(path)) => PayloadArg::File(path),
            (Some(text), None) => PayloadArg::Inline(text),
            // clap's group guarantees one of the two
            (None, None) => PayloadArg::Inline(String::new()),
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct OldTextArgs {
    /// Text block to search for
    #[arg(long, value_name = "TEXT")]
    old: Option<String>,

    /// Read the block to search for from a file
    #[arg(long, value_name = "FILE")]
    old_file: Option<PathBuf>,
}

impl From<OldTextArgs> for PayloadArg {
    fn from(args: OldTextArgs) -> Self {
        PayloadArgs {
            payload: args.old,
            payload_file: args.old_file,
        }
        .into()
    }
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct NewTextArgs {
    /// Replacement text block (may be empty)
    #[arg(long, value_name = "TEXT")]
    new: Option<String>,

    /// Read the replacement block from a file
    #[arg(long, value_name = "FILE")]
    new_file: Option<PathBuf>,
}

impl From<NewTextArgs> for PayloadArg {
    fn from(args: NewTextArgs) -> Self {
        PayloadArgs {
            payload: args.new,
            payload_file: args.new_file,
        }
        .into()
    }
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct GuardArgs {
    /// Substring the line must contain (repeat for more; all must appear)
    #[arg(short = 'c', long = "contains", value_name = "TEXT")]
    contains: Vec<String>,

    /// Regex the line (without its terminator) must match
    #[arg(long, value_name = "REGEX")]
    regex: Option<String>,
}

impl From<GuardArgs> for MatcherSpec {
    fn from(args: GuardArgs) -> Self {
        match args.regex {
            Some(pattern) => MatcherSpec::Regex(pattern),
            None => MatcherSpec::Contains(args.contains),
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct StartMarkerArgs {
    /// Substring of the start marker line (repeatable)
    #[arg(long = "start-contains", value_name = "TEXT")]
    start_contains: Vec<String>,

    /// Regex matching the start marker line
    #[arg(long = "start-regex", value_name = "REGEX")]
    start_regex: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
struct EndMarkerArgs {
    /// Substring of the end marker line (repeatable)
    #[arg(long = "end-contains", value_name = "TEXT")]
    end_contains: Vec<String>,

    /// Regex matching the end marker line
    #[arg(long = "end-regex", value_name = "REGEX")]
    end_regex: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove lines matching a guard
    #[command(long_about = "Remove every line that contains all --contains substrings
(or matches --regex). If no line matches, the file is left untouched and
'Not found' is reported; this is not an error.

Running the same removal twice is a no-op the second time.

EXAMPLES:
  linepatch remove Dashboard.tsx -c '<th' -c 'KDV %'
  linepatch remove Dashboard.tsx --regex '^\\s*<th>KDV %</th>$' --dry-run")]
    Remove {
        /// File to patch
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        guard: GuardArgs,

        #[command(flatten)]
        options: WriteOptions,
    },

    /// Replace a line range with a payload block
    #[command(long_about = "Keep lines [0, START), insert the payload, then keep lines [END, end of file).
Boundaries are zero-based line indices.

Boundaries past the end of the file are rejected unless --clamp is given
(or processing.boundary_policy = \"clamp\" in the config).

EXAMPLES:
  linepatch splice Dashboard.tsx --start 516 --end 781 --payload-file grid.tsx
  linepatch splice notes.txt --start 3 --end 7 --payload PATCH")]
    Splice {
        /// File to patch
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// First line index to discard
        #[arg(long, value_name = "N")]
        start: usize,

        /// First line index to keep after the payload
        #[arg(long, value_name = "M")]
        end: usize,

        #[command(flatten)]
        payload: PayloadArgs,

        /// Clamp out-of-range boundaries to the end of the file
        #[arg(long)]
        clamp: bool,

        #[command(flatten)]
        options: WriteOptions,
    },

    /// Replace the block between two marker lines
    #[command(long_about = "Find the first start marker line, then the first end marker line after it,
and replace the lines between them with the payload. With --inclusive the
marker lines are replaced as well.

If the block already holds the payload nothing is written.

EXAMPLES:
  linepatch between Customer.tsx --start-contains '<tbody>' --end-contains '</tbody>' --payload-file rows.tsx")]
    Between {
        /// File to patch
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        start: StartMarkerArgs,

        #[command(flatten)]
        end: EndMarkerArgs,

        #[command(flatten)]
        payload: PayloadArgs,

        /// Replace the marker lines too
        #[arg(long)]
        inclusive: bool,

        #[command(flatten)]
        options: WriteOptions,
    },

    /// Replace a literal block of text
    #[command(long_about = "Replace the first occurrence of a literal text block. The block may span
several lines; blocks written with LF endings also match CRLF files.

If the old block is absent but the new one is present, the file is reported
as unchanged. If neither is present, 'Not found' is reported.

EXAMPLES:
  linepatch replace Customer.tsx --old-file old_header.tsx --new-file new_header.tsx
  linepatch replace notes.txt --old 'TODO' --new 'DONE'")]
    Replace {
        /// File to patch
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        old: OldTextArgs,

        #[command(flatten)]
        new: NewTextArgs,

        #[command(flatten)]
        options: WriteOptions,
    },

    /// Apply a TOML recipe of patches
    #[command(long_about = "Apply every patch listed in a TOML recipe, in order, with a single backup.

RECIPE FORMAT:
  [[patch]]
  kind = \"remove\"            # remove | splice | replace-between | replace-text
  file = \"src/Dashboard.tsx\" # relative to the recipe file
  contains = [\"<th\", \"KDV %\"]

  [[patch]]
  kind = \"splice\"
  file = \"src/Dashboard.tsx\"
  start = 516
  end = 781
  payload_file = \"grid.tsx\"

EXAMPLES:
  linepatch apply fixes.toml --dry-run")]
    Apply {
        /// Recipe file
        #[arg(value_name = "RECIPE")]
        recipe: PathBuf,

        #[command(flatten)]
        options: WriteOptions,
    },

    /// Rollback a previous operation
    #[command(long_about = "Restore files from a backup.

If no backup ID is specified, rolls back the most recent operation.
Use 'linepatch history' to see all available backups.")]
    Rollback {
        /// Backup ID to rollback (optional, defaults to last operation)
        #[arg(value_name = "ID")]
        id: Option<String>,

        /// Custom backup directory
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<String>,
    },

    /// Show operation history
    History {
        /// Custom backup directory
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<String>,
    },

    /// Manage backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,

        /// Custom backup directory
        #[arg(long, value_name = "DIR", global = true)]
        backup_dir: Option<String>,
    },

    /// Edit configuration file
    #[command(long_about = "Open ~/.linepatch/config.toml in $EDITOR.

The file is created with commented defaults if it does not exist, and
validated after the editor exits.

EXAMPLES:
  linepatch config                 Edit configuration
  linepatch config --show          Show current configuration")]
    Config {
        /// Show current configuration without editing
        #[arg(long = "show")]
        show: bool,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// List all backups
    List {
        /// Show file paths and sizes
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show backup details
    Show {
        /// Backup ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Restore from a backup
    Restore {
        /// Backup ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Remove a backup
    Remove {
        /// Backup ID
        #[arg(value_name = "ID")]
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Prune old backups
    Prune {
        /// Number of recent backups to keep
        #[arg(long, value_name = "N")]
        keep: Option<usize>,

        /// Keep backups from last N days
        #[arg(long, value_name = "N")]
        keep_days: Option<usize>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub fn parse_args() -> Result<(Args, bool)> {
    let cli = Cli::parse();
    Ok((convert(cli.command), cli.debug))
}

/// Parse an explicit argument list (first item is the binary name)
pub fn try_parse_args_from<I, T>(iter: I) -> Result<(Args, bool)>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(iter)?;
    Ok((convert(cli.command), cli.debug))
}

fn convert(command: Commands) -> Args {
    match command {
        Commands::Remove {
            file,
            guard,
            options,
        } => Args::Remove {
            file,
            guard: guard.into(),
            options,
        },
        Commands::Splice {
            file,
            start,
            end,
            payload,
            clamp,
            options,
        } => Args::Splice {
            file,
            start,
            end,
            payload: payload.into(),
            clamp,
            options,
        },
        Commands::Between {
            file,
            start,
            end,
            payload,
            inclusive,
            options,
        } => Args::Between {
            file,
            start_marker: match start.start_regex {
                Some(pattern) => MatcherSpec::Regex(pattern),
                None => MatcherSpec::Contains(start.start_contains),
            },
            end_marker: match end.end_regex {
                Some(pattern) => MatcherSpec::Regex(pattern),
                None => MatcherSpec::Contains(end.end_contains),
            },
            payload: payload.into(),
            inclusive,
            options,
        },
        Commands::Replace {
            file,
            old,
            new,
            options,
        } => Args::Replace {
            file,
            old: old.into(),
            new: new.into(),
            options,
        },
        Commands::Apply { recipe, options } => Args::Apply { recipe, options },
        Commands::Rollback { id, backup_dir } => Args::Rollback { id, backup_dir },
        Commands::History { backup_dir } => Args::History { backup_dir },
        Commands::Config { show } => Args::Config { show },
        Commands::Backup { action, backup_dir } => match action {
            BackupAction::List { verbose } => Args::BackupList {
                verbose,
                backup_dir,
            },
            BackupAction::Show { id } => Args::BackupShow { id, backup_dir },
            BackupAction::Restore { id } => Args::BackupRestore { id, backup_dir },
            BackupAction::Remove { id, force } => Args::BackupRemove {
                id,
                force,
                backup_dir,
            },
            BackupAction::Prune {
                keep,
                keep_days,
                force,
            } => Args::BackupPrune {
                keep,
                keep_days,
                force,
                backup_dir,
            },
        },
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Args {
    Remove {
        file: PathBuf,
        guard: MatcherSpec,
        options: WriteOptions,
    },
    Splice {
        file: PathBuf,
        start: usize,
        end: usize,
        payload: PayloadArg,
        clamp: bool,
        options: WriteOptions,
    },
    Between {
        file: PathBuf,
        start_marker: MatcherSpec,
        end_marker: MatcherSpec,
        payload: PayloadArg,
        inclusive: bool,
        options: WriteOptions,
    },
    Replace {
        file: PathBuf,
        old: PayloadArg,
        new: PayloadArg,
        options: WriteOptions,
    },
    Apply {
        recipe: PathBuf,
        options: WriteOptions,
    },
    Rollback {
        id: Option<String>,
        backup_dir: Option<String>,
    },
    History {
        backup_dir: Option<String>,
    },
    BackupList {
        verbose: bool,
        backup_dir: Option<String>,
    },
    BackupShow {
        id: String,
        backup_dir: Option<String>,
    },
    BackupRestore {
        id: String,
        backup_dir: Option<String>,
    },
    BackupRemove {
        id: String,
        force: bool,
        backup_dir: Option<String>,
    },
    BackupPrune {
        keep: Option<usize>,
        keep_days: Option<usize>,
        force: bool,
        backup_dir: Option<String>,
    },
    Config {
        show: bool,
    },
}
