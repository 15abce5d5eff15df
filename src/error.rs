//! Typed patch errors
//!
//! Validation failures that callers may want to match on. Everything else
//! travels as `anyhow::Error` with context attached.

use std::fmt;
use std::path::PathBuf;

/// Which slice boundary a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Start => write!(f, "start"),
            Boundary::End => write!(f, "end"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Start boundary lies after the end boundary
    InvertedBoundaries { start: usize, end: usize },
    /// A boundary points past the last line of the file
    BoundaryOutOfRange {
        boundary: Boundary,
        value: usize,
        line_count: usize,
    },
    /// The target file is not valid UTF-8
    InvalidUtf8 { path: PathBuf },
    /// A regex predicate failed to compile
    InvalidPattern { pattern: String, message: String },
    /// A substring guard was given no substrings, or only empty ones
    EmptyGuard,
    /// A text replacement was given an empty block to search for
    EmptySearchText,
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::InvertedBoundaries { start, end } => write!(
                f,
                "Invalid slice boundaries: start ({}) is greater than end ({})",
                start, end
            ),
            PatchError::BoundaryOutOfRange {
                boundary,
                value,
                line_count,
            } => write!(
                f,
                "Slice {} boundary {} is out of range: file has {} line{}\n\
                 Use --clamp to clamp boundaries to the end of the file",
                boundary,
                value,
                line_count,
                if *line_count == 1 { "" } else { "s" }
            ),
            PatchError::InvalidUtf8 { path } => {
                write!(f, "File is not valid UTF-8: {}", path.display())
            }
            PatchError::InvalidPattern { pattern, message } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, message)
            }
            PatchError::EmptyGuard => {
                write!(f, "A substring guard needs at least one non-empty substring")
            }
            PatchError::EmptySearchText => write!(f, "The text block to replace must not be empty"),
        }
    }
}

impl std::error::Error for PatchError {}
