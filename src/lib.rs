//! linepatch: guarded, line-oriented file patching
//!
//! The library holds the patch engine and its supporting pieces; the
//! binary at src/main.rs wires them to the command line.

pub mod atomic_write;
pub mod backup_manager;
pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod error;
pub mod error_helpers;
pub mod lines;
pub mod logger;
pub mod matcher;
pub mod patcher;
pub mod processor;
pub mod recipe;
pub mod runner;

// Re-export commonly used types for convenience
pub use backup_manager::{BackupManager, BackupMetadata, FileBackup};
pub use error::PatchError;
pub use lines::LineSequence;
pub use matcher::{LineMatcher, MatcherSpec};
pub use patcher::{BoundaryPolicy, filter_remove, replace_between, replace_text, splice};
pub use processor::{FileProcessor, Outcome, Patch, PatchKind, PatchReport, apply_patch};
pub use recipe::Recipe;
pub use runner::{PatchCommand, RunSummary, run_patches};
