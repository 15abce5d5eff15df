//! Line sequences
//!
//! A file is held as an ordered list of lines where every line keeps its own
//! terminator. Joining the lines back together reproduces the original bytes,
//! so untouched regions survive a patch exactly as they were on disk.

use crate::error::PatchError;
use crate::error_helpers;
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineSequence {
    lines: Vec<String>,
}

impl LineSequence {
    /// Split text into lines, keeping `\n` / `\r\n` on each line
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Read a whole file as UTF-8
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| PatchError::InvalidUtf8 {
            path: path.to_path_buf(),
        })?;
        Ok(Self::parse(&text))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Terminator used by the file: `\r\n` if the first terminated line uses it
    pub fn line_ending(&self) -> &'static str {
        match self.lines.iter().find(|l| l.ends_with('\n')) {
            Some(line) if line.ends_with("\r\n") => "\r\n",
            _ => "\n",
        }
    }

    pub fn to_text(&self) -> String {
        self.lines.concat()
    }
}

/// Strip the terminator for matching and display
pub fn content_of(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

pub(crate) fn read_error(path: &Path, err: io::Error) -> anyhow::Error {
    let message = if error_helpers::is_not_found(&err) {
        error_helpers::not_found_error(path, "reading file to patch")
    } else if error_helpers::is_permission_denied(&err) {
        error_helpers::permission_error(path, "reading")
    } else {
        format!("Failed to read file: {}", path.display())
    };
    anyhow::Error::new(err).context(message)
}

/// Read a payload block from disk, verbatim
pub fn read_payload(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read payload file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_keeps_terminators() {
        let seq = LineSequence::parse("A\nB\r\nC");
        assert_eq!(seq.lines(), &["A\n", "B\r\n", "C"]);
        assert_eq!(seq.to_text(), "A\nB\r\nC");
    }

    #[test]
    fn test_parse_empty() {
        let seq = LineSequence::parse("");
        assert!(seq.is_empty());
        assert_eq!(seq.to_text(), "");
    }

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(LineSequence::parse("a\r\nb\r\n").line_ending(), "\r\n");
        assert_eq!(LineSequence::parse("a\nb\n").line_ending(), "\n");
        assert_eq!(LineSequence::parse("no terminator").line_ending(), "\n");
    }

    #[test]
    fn test_content_of() {
        assert_eq!(content_of("abc\r\n"), "abc");
        assert_eq!(content_of("abc\n"), "abc");
        assert_eq!(content_of("abc"), "abc");
    }

    #[test]
    fn test_read_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.txt");
        fs::write(&path, [0x66, 0x6f, 0xff, 0x0a]).unwrap();

        let err = LineSequence::read(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatchError>(),
            Some(PatchError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_read_missing_file_is_actionable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.tsx");

        let err = LineSequence::read(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("File not found"));
    }
}
