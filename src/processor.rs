//! Staging and applying patches to files
//!
//! `FileProcessor` reads each target once, runs patches against the
//! in-memory copy in order (so several patches can target one file), and
//! writes every changed file atomically on `commit`.

use crate::atomic_write::write_atomic;
use crate::lines::{LineSequence, content_of, read_error};
use crate::matcher::{LineMatcher, MatcherSpec};
use crate::patcher::{self, BetweenOutcome, BoundaryPolicy, Marker, TextOutcome};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchKind {
    /// Remove every line accepted by the guard
    Remove { guard: MatcherSpec },
    /// Replace lines `[start, end)` with the payload
    Splice {
        start: usize,
        end: usize,
        payload: String,
        policy: BoundaryPolicy,
    },
    /// Replace the block between two marker lines with the payload
    ReplaceBetween {
        start_marker: MatcherSpec,
        end_marker: MatcherSpec,
        payload: String,
        inclusive: bool,
    },
    /// Replace the first occurrence of a literal block of text
    ReplaceText { old: String, new: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub file: PathBuf,
    pub kind: PatchKind,
}

impl Patch {
    pub fn remove(file: impl Into<PathBuf>, guard: MatcherSpec) -> Self {
        Self {
            file: file.into(),
            kind: PatchKind::Remove { guard },
        }
    }

    pub fn splice(
        file: impl Into<PathBuf>,
        start: usize,
        end: usize,
        payload: impl Into<String>,
        policy: BoundaryPolicy,
    ) -> Self {
        Self {
            file: file.into(),
            kind: PatchKind::Splice {
                start,
                end,
                payload: payload.into(),
                policy,
            },
        }
    }

    pub fn replace_between(
        file: impl Into<PathBuf>,
        start_marker: MatcherSpec,
        end_marker: MatcherSpec,
        payload: impl Into<String>,
        inclusive: bool,
    ) -> Self {
        Self {
            file: file.into(),
            kind: PatchKind::ReplaceBetween {
                start_marker,
                end_marker,
                payload: payload.into(),
                inclusive,
            },
        }
    }

    pub fn replace_text(
        file: impl Into<PathBuf>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            kind: PatchKind::ReplaceText {
                old: old.into(),
                new: new.into(),
            },
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PatchKind::Remove { guard } => write!(f, "remove lines that {}", guard),
            PatchKind::Splice { start, end, .. } => write!(f, "splice lines [{}, {})", start, end),
            PatchKind::ReplaceBetween {
                start_marker,
                end_marker,
                ..
            } => write!(
                f,
                "replace block between line that {} and line that {}",
                start_marker, end_marker
            ),
            PatchKind::ReplaceText { old, .. } => {
                write!(f, "replace text block starting {:?}", first_line_of(old))
            }
        }
    }
}

fn first_line_of(block: &str) -> &str {
    content_of(block.split_inclusive('\n').next().unwrap_or_default()).trim()
}

/// Result of one staged patch. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Removed { line_numbers: Vec<usize> },
    NotFound { detail: String },
    Spliced {
        first_line: usize,
        discarded: usize,
        clamped: bool,
    },
    Replaced { first_line: usize, replaced: usize },
    Unchanged,
}

impl Outcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Outcome::NotFound { .. } | Outcome::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub file: PathBuf,
    pub description: String,
    pub outcome: Outcome,
}

/// Original and patched text of one file
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub file_path: PathBuf,
    pub original: String,
    pub patched: String,
}

impl FileDiff {
    pub fn has_changes(&self) -> bool {
        self.original != self.patched
    }
}

#[derive(Debug)]
struct StagedFile {
    original: String,
    current: LineSequence,
}

#[derive(Debug, Default)]
pub struct FileProcessor {
    files: BTreeMap<PathBuf, StagedFile>,
    reports: Vec<PatchReport>,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a patch against the staged copy of its file
    ///
    /// Files are keyed by their canonical path, so two spellings of one file
    /// share a single staged copy.
    pub fn stage(&mut self, patch: &Patch) -> Result<&PatchReport> {
        let key = fs::canonicalize(&patch.file).map_err(|e| read_error(&patch.file, e))?;
        if !self.files.contains_key(&key) {
            let sequence = LineSequence::read(&key)?;
            debug!(path = %key.display(), lines = sequence.len(), "loaded file");
            self.files.insert(
                key.clone(),
                StagedFile {
                    original: sequence.to_text(),
                    current: sequence,
                },
            );
        }

        let staged = self
            .files
            .get_mut(&key)
            .context("staged file disappeared")?;

        let (outcome, next) = run_patch(&staged.current, &patch.kind)
            .with_context(|| format!("Failed to patch {}", patch.file.display()))?;
        if let Some(next) = next {
            staged.current = next;
        }

        info!(
            path = %patch.file.display(),
            patch = %patch,
            outcome = ?outcome,
            "staged patch"
        );

        self.reports.push(PatchReport {
            file: patch.file.clone(),
            description: patch.to_string(),
            outcome,
        });
        self.reports.last().context("report list empty")
    }

    pub fn reports(&self) -> &[PatchReport] {
        &self.reports
    }

    /// Before/after text of every staged file, in path order
    pub fn diffs(&self) -> Vec<FileDiff> {
        self.files
            .iter()
            .map(|(path, staged)| FileDiff {
                file_path: path.clone(),
                original: staged.original.clone(),
                patched: staged.current.to_text(),
            })
            .collect()
    }

    /// Canonical paths of the files whose content differs from what was read
    pub fn changed_files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|(_, staged)| staged.current.to_text() != staged.original)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Write every changed file; returns the number of files written
    pub fn commit(&self) -> Result<usize> {
        let mut written = 0;
        for (path, staged) in &self.files {
            let patched = staged.current.to_text();
            if patched == staged.original {
                debug!(path = %path.display(), "unchanged, skipping write");
                continue;
            }
            write_atomic(path, &patched)?;
            info!(path = %path.display(), "wrote patched file");
            written += 1;
        }
        Ok(written)
    }
}

fn run_patch(current: &LineSequence, kind: &PatchKind) -> Result<(Outcome, Option<LineSequence>)> {
    let lines = current.lines();
    let line_ending = current.line_ending();

    match kind {
        PatchKind::Remove { guard } => {
            let matcher = LineMatcher::compile(guard)?;
            let removal = patcher::filter_remove(lines, &matcher);
            if !removal.found() {
                return Ok((
                    Outcome::NotFound {
                        detail: format!("no line {}", guard),
                    },
                    None,
                ));
            }
            let line_numbers = removal.removed.iter().map(|i| i + 1).collect();
            Ok((
                Outcome::Removed { line_numbers },
                Some(LineSequence::from_lines(removal.lines)),
            ))
        }
        PatchKind::Splice {
            start,
            end,
            payload,
            policy,
        } => {
            let spliced = patcher::splice(lines, *start, *end, payload, line_ending, *policy)?;
            let outcome = Outcome::Spliced {
                first_line: spliced.range.start + 1,
                discarded: spliced.discarded(),
                clamped: spliced.range.clamped,
            };
            if spliced.lines[..] == lines[..] {
                return Ok((Outcome::Unchanged, None));
            }
            Ok((outcome, Some(LineSequence::from_lines(spliced.lines))))
        }
        PatchKind::ReplaceBetween {
            start_marker,
            end_marker,
            payload,
            inclusive,
        } => {
            let start_matcher = LineMatcher::compile(start_marker)?;
            let end_matcher = LineMatcher::compile(end_marker)?;
            match patcher::replace_between(
                lines,
                &start_matcher,
                &end_matcher,
                payload,
                *inclusive,
                line_ending,
            ) {
                BetweenOutcome::MarkerNotFound(marker) => {
                    let detail = match marker {
                        Marker::Start => format!("no start marker line that {}", start_marker),
                        Marker::End => format!("no end marker line that {}", end_marker),
                    };
                    Ok((Outcome::NotFound { detail }, None))
                }
                BetweenOutcome::Unchanged { .. } => Ok((Outcome::Unchanged, None)),
                BetweenOutcome::Replaced { lines, start, end } => Ok((
                    Outcome::Replaced {
                        first_line: start + 1,
                        replaced: end - start,
                    },
                    Some(LineSequence::from_lines(lines)),
                )),
            }
        }
        PatchKind::ReplaceText { old, new } => {
            match patcher::replace_text(&current.to_text(), old, new, line_ending)? {
                TextOutcome::NotFound => Ok((
                    Outcome::NotFound {
                        detail: format!("no text block starting {:?}", first_line_of(old)),
                    },
                    None,
                )),
                TextOutcome::Unchanged => Ok((Outcome::Unchanged, None)),
                TextOutcome::Replaced {
                    text,
                    line,
                    line_count,
                } => Ok((
                    Outcome::Replaced {
                        first_line: line + 1,
                        replaced: line_count,
                    },
                    Some(LineSequence::parse(&text)),
                )),
            }
        }
    }
}

/// Convenience wrapper: stage a single patch and write the result
pub fn apply_patch(patch: &Patch) -> Result<PatchReport> {
    let mut processor = FileProcessor::new();
    let report = processor.stage(patch)?.clone();
    processor.commit()?;
    Ok(report)
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
