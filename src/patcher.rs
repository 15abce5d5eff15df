//! Line-range patch operations
//!
//! Pure transformations over line lists. Nothing here touches the
//! filesystem; `processor` reads, stages, and writes.

use crate::error::{Boundary, PatchError};
use crate::matcher::LineMatcher;
use serde::{Deserialize, Serialize};

/// What to do when slice boundaries point past the end of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Reject out-of-range boundaries with `PatchError::BoundaryOutOfRange`
    #[default]
    Strict,
    /// Clamp boundaries to the line count (logged as a warning)
    Clamp,
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(BoundaryPolicy::Strict),
            "clamp" => Ok(BoundaryPolicy::Clamp),
            other => Err(format!(
                "Invalid boundary policy: {} (must be 'strict' or 'clamp')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub lines: Vec<String>,
    /// Zero-based indices (in the input) of the removed lines
    pub removed: Vec<usize>,
}

impl RemovalOutcome {
    pub fn found(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Drop every line the matcher accepts, keeping the rest in order
pub fn filter_remove(lines: &[String], matcher: &LineMatcher) -> RemovalOutcome {
    let mut kept = Vec::with_capacity(lines.len());
    let mut removed = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if matcher.is_match(line) {
            removed.push(i);
        } else {
            kept.push(line.clone());
        }
    }

    RemovalOutcome {
        lines: kept,
        removed,
    }
}

/// Boundaries after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub start: usize,
    pub end: usize,
    pub clamped: bool,
}

pub fn resolve_boundaries(
    start: usize,
    end: usize,
    line_count: usize,
    policy: BoundaryPolicy,
) -> Result<SliceRange, PatchError> {
    let (start, end, clamped) = match policy {
        BoundaryPolicy::Strict => {
            if start > line_count {
                return Err(PatchError::BoundaryOutOfRange {
                    boundary: Boundary::Start,
                    value: start,
                    line_count,
                });
            }
            if end > line_count {
                return Err(PatchError::BoundaryOutOfRange {
                    boundary: Boundary::End,
                    value: end,
                    line_count,
                });
            }
            (start, end, false)
        }
        BoundaryPolicy::Clamp => {
            let clamped_start = start.min(line_count);
            let clamped_end = end.min(line_count);
            let clamped = clamped_start != start || clamped_end != end;
            if clamped {
                tracing::warn!(
                    start,
                    end,
                    line_count,
                    clamped_start,
                    clamped_end,
                    "clamped slice boundaries to file length"
                );
            }
            (clamped_start, clamped_end, clamped)
        }
    };

    if start > end {
        return Err(PatchError::InvertedBoundaries { start, end });
    }

    Ok(SliceRange {
        start,
        end,
        clamped,
    })
}

/// Split a payload block into terminated lines
///
/// The last payload line gets `line_ending` unless it already ends in a
/// newline. An empty payload yields no lines.
pub fn payload_lines(payload: &str, line_ending: &str) -> Vec<String> {
    let mut lines: Vec<String> = payload.split_inclusive('\n').map(str::to_string).collect();
    if let Some(last) = lines.last_mut() {
        if !last.ends_with('\n') {
            last.push_str(line_ending);
        }
    }
    lines
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOutcome {
    pub lines: Vec<String>,
    pub range: SliceRange,
}

impl SpliceOutcome {
    pub fn discarded(&self) -> usize {
        self.range.end - self.range.start
    }
}

/// head `[0, start)` + payload + tail `[end, len)`
pub fn splice(
    lines: &[String],
    start: usize,
    end: usize,
    payload: &str,
    line_ending: &str,
    policy: BoundaryPolicy,
) -> Result<SpliceOutcome, PatchError> {
    let range = resolve_boundaries(start, end, lines.len(), policy)?;
    let insert = payload_lines(payload, line_ending);

    let mut out = Vec::with_capacity(range.start + insert.len() + (lines.len() - range.end));
    out.extend_from_slice(&lines[..range.start]);
    // Only the final line of a file can lack a terminator
    if !insert.is_empty() {
        if let Some(last) = out.last_mut().filter(|l| !l.ends_with('\n')) {
            last.push_str(line_ending);
        }
    }
    out.extend(insert);
    out.extend_from_slice(&lines[range.end..]);

    Ok(SpliceOutcome { lines: out, range })
}

/// Which marker a block replacement could not find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetweenOutcome {
    MarkerNotFound(Marker),
    /// The block already holds the payload
    Unchanged { start: usize, end: usize },
    Replaced {
        lines: Vec<String>,
        start: usize,
        end: usize,
    },
}

/// Replace the block delimited by two marker lines
///
/// The end marker is searched for strictly after the start marker. With
/// `inclusive`, the marker lines are replaced too; `start`/`end` in the
/// outcome describe the replaced range `[start, end)`.
pub fn replace_between(
    lines: &[String],
    start_marker: &LineMatcher,
    end_marker: &LineMatcher,
    payload: &str,
    inclusive: bool,
    line_ending: &str,
) -> BetweenOutcome {
    let Some(start_idx) = lines.iter().position(|l| start_marker.is_match(l)) else {
        return BetweenOutcome::MarkerNotFound(Marker::Start);
    };
    let Some(end_idx) = lines[start_idx + 1..]
        .iter()
        .position(|l| end_marker.is_match(l))
        .map(|offset| start_idx + 1 + offset)
    else {
        return BetweenOutcome::MarkerNotFound(Marker::End);
    };

    let (start, end) = if inclusive {
        (start_idx, end_idx + 1)
    } else {
        (start_idx + 1, end_idx)
    };

    let insert = payload_lines(payload, line_ending);
    if lines[start..end] == insert[..] {
        return BetweenOutcome::Unchanged { start, end };
    }

    let mut out = Vec::with_capacity(lines.len() - (end - start) + insert.len());
    out.extend_from_slice(&lines[..start]);
    out.extend(insert);
    out.extend_from_slice(&lines[end..]);

    BetweenOutcome::Replaced {
        lines: out,
        start,
        end,
    }
}

/// Result of a literal block replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// Neither the old block nor the new one occurs in the text
    NotFound,
    /// The old block is gone and the new block is present
    Unchanged,
    /// First occurrence replaced; `line` is the zero-based line it started on
    Replaced {
        text: String,
        line: usize,
        line_count: usize,
    },
}

/// Replace the first occurrence of the literal block `old` with `new`
///
/// Blocks written with `\n` are matched against `\r\n` files by converting
/// their terminators to `line_ending` first.
pub fn replace_text(
    text: &str,
    old: &str,
    new: &str,
    line_ending: &str,
) -> Result<TextOutcome, PatchError> {
    if old.is_empty() {
        return Err(PatchError::EmptySearchText);
    }
    let old = with_line_ending(old, line_ending);
    let new = with_line_ending(new, line_ending);

    if old == new {
        return Ok(if text.contains(&old) {
            TextOutcome::Unchanged
        } else {
            TextOutcome::NotFound
        });
    }

    let Some(offset) = text.find(&old) else {
        if !new.is_empty() && text.contains(&new) {
            return Ok(TextOutcome::Unchanged);
        }
        return Ok(TextOutcome::NotFound);
    };

    let mut replaced = String::with_capacity(text.len() - old.len() + new.len());
    replaced.push_str(&text[..offset]);
    replaced.push_str(&new);
    replaced.push_str(&text[offset + old.len()..]);

    Ok(TextOutcome::Replaced {
        text: replaced,
        line: text[..offset].matches('\n').count(),
        line_count: old.split_inclusive('\n').count(),
    })
}

fn with_line_ending(block: &str, line_ending: &str) -> String {
    if line_ending == "\r\n" && !block.contains("\r\n") {
        block.replace('\n', "\r\n")
    } else {
        block.to_string()
    }
}
