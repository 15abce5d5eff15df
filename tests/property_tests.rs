//! Property-based tests for linepatch
//!
//! These use proptest to check the core invariants of the patch operations
//! and of the file-level apply path against generated inputs.

use std::fs;
use tempfile::TempDir;

use linepatch::{
    BackupManager, BoundaryPolicy, FileProcessor, LineMatcher, LineSequence, MatcherSpec,
    Outcome, Patch, PatchError, apply_patch, filter_remove, splice,
};

use linepatch::lines::content_of;
use proptest::prelude::*;

/// Lowercase lines, so the uppercase guards "TARGET" and "X" never match by accident
fn plain_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-w ]{0,20}", 0..40)
        .prop_map(|lines| lines.into_iter().map(|l| l + "\n").collect())
}

fn guard() -> LineMatcher {
    LineMatcher::contains_all(["TARGET", "X"]).unwrap()
}

fn target_guard_spec() -> MatcherSpec {
    MatcherSpec::Contains(vec!["TARGET".to_string(), "X".to_string()])
}

// ============================================================================
// Property 1: Filtered removal
// ============================================================================

proptest! {
    /// No line carries both guards: output equals input, nothing found
    #[test]
    fn prop_removal_without_match_is_identity(lines in plain_lines()) {
        let outcome = filter_remove(&lines, &guard());

        prop_assert!(!outcome.found());
        prop_assert_eq!(outcome.lines, lines);
    }

    /// K inserted targets are removed exactly, everything else keeps its order
    #[test]
    fn prop_removal_drops_exactly_the_targets(
        lines in plain_lines(),
        positions in prop::collection::vec(any::<prop::sample::Index>(), 1..5)
    ) {
        let mut input = lines.clone();
        for pos in &positions {
            let at = pos.index(input.len() + 1);
            input.insert(at, "  <th>TARGET X</th>\n".to_string());
        }

        let outcome = filter_remove(&input, &guard());

        prop_assert!(outcome.found());
        prop_assert_eq!(outcome.removed.len(), positions.len());
        prop_assert_eq!(outcome.lines, lines);
    }

    /// Running the removal on its own output is a no-op
    #[test]
    fn prop_removal_is_idempotent(
        lines in plain_lines(),
        at in any::<prop::sample::Index>()
    ) {
        let mut input = lines;
        let idx = at.index(input.len() + 1);
        input.insert(idx, "X marks the TARGET\n".to_string());

        let first = filter_remove(&input, &guard());
        let second = filter_remove(&first.lines, &guard());

        prop_assert!(!second.found());
        prop_assert_eq!(second.lines, first.lines);
    }

    /// Not found on disk means the bytes on disk are untouched
    #[test]
    fn prop_removal_not_found_keeps_file_bytes(
        text in "[a-w \r\n]{0,400}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page.tsx");
        fs::write(&path, &text).unwrap();

        let report = apply_patch(&Patch::remove(&path, target_guard_spec())).unwrap();

        prop_assert!(matches!(report.outcome, Outcome::NotFound { .. }), "expected NotFound outcome");
        prop_assert_eq!(fs::read(&path).unwrap(), text.into_bytes());
    }
}

// ============================================================================
// Property 2: Slice-and-splice
// ============================================================================

proptest! {
    /// Valid boundaries: output = head + payload + tail, head and tail verbatim
    #[test]
    fn prop_splice_keeps_head_and_tail(
        lines in plain_lines(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
        payload in "[A-Z]{1,10}"
    ) {
        let len = lines.len();
        let (x, y) = (a.index(len + 1), b.index(len + 1));
        let (start, end) = (x.min(y), x.max(y));

        let outcome = splice(&lines, start, end, &payload, "\n", BoundaryPolicy::Strict).unwrap();

        prop_assert_eq!(outcome.lines.len(), start + 1 + (len - end));
        prop_assert_eq!(&outcome.lines[..start], &lines[..start]);
        prop_assert_eq!(&outcome.lines[start], &format!("{}\n", payload));
        prop_assert_eq!(&outcome.lines[start + 1..], &lines[end..]);
    }

    /// A file whose last line has no terminator still splices into whole lines
    #[test]
    fn prop_splice_without_trailing_newline(
        lines in plain_lines().prop_filter("non-empty", |l| !l.is_empty()),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
        payload in "[A-Z]{1,10}"
    ) {
        let mut lines = lines;
        if let Some(last) = lines.last_mut() {
            *last = "last line".to_string();
        }
        let len = lines.len();
        let (x, y) = (a.index(len + 1), b.index(len + 1));
        let (start, end) = (x.min(y), x.max(y));

        let outcome = splice(&lines, start, end, &payload, "\n", BoundaryPolicy::Strict).unwrap();
        let reparsed = LineSequence::parse(&outcome.lines.concat());

        prop_assert_eq!(outcome.lines.len(), start + 1 + (len - end));
        prop_assert_eq!(reparsed.lines(), &outcome.lines[..]);
        prop_assert_eq!(content_of(&outcome.lines[start]), payload.as_str());
    }

    /// Boundaries past the end never panic: strict errors, clamp clamps
    #[test]
    fn prop_splice_out_of_range_is_explicit(
        lines in plain_lines(),
        extra in 1usize..50
    ) {
        let len = lines.len();
        let end = len + extra;

        let err = splice(&lines, 0, end, "P", "\n", BoundaryPolicy::Strict).unwrap_err();
        let is_out_of_range = matches!(err, PatchError::BoundaryOutOfRange { .. });
        prop_assert!(is_out_of_range);

        let clamped = splice(&lines, 0, end, "P", "\n", BoundaryPolicy::Clamp).unwrap();
        prop_assert!(clamped.range.clamped);
        prop_assert_eq!(clamped.lines, vec!["P\n".to_string()]);
    }
}

// ============================================================================
// Property 3: Line sequences and previews
// ============================================================================

proptest! {
    /// Parsing then joining reproduces the text byte for byte
    #[test]
    fn prop_line_sequence_preserves_bytes(text in "[a-z \r\n]{0,300}") {
        prop_assert_eq!(LineSequence::parse(&text).to_text(), text);
    }

    /// A staged (preview) result equals what commit writes
    #[test]
    fn prop_preview_matches_commit(
        lines in plain_lines(),
        at in any::<prop::sample::Index>()
    ) {
        let mut input = lines;
        let idx = at.index(input.len() + 1);
        input.insert(idx, "TARGET X\n".to_string());

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page.tsx");
        fs::write(&path, input.concat()).unwrap();

        let mut processor = FileProcessor::new();
        processor.stage(&Patch::remove(&path, target_guard_spec())).unwrap();
        let preview = processor.diffs()[0].patched.clone();
        processor.commit().unwrap();

        prop_assert_eq!(fs::read_to_string(&path).unwrap(), preview);
    }
}

// ============================================================================
// Property 4: Backup & rollback
// ============================================================================

proptest! {
    /// Restoring a backup reproduces the original file exactly
    #[test]
    fn prop_backup_restore_is_identity(
        content in "[a-zA-Z0-9 \n]{0,1000}"
    ) {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.tsx");
        fs::write(&test_file, &content).unwrap();

        let mut backup_mgr = BackupManager::with_directory(temp_dir.path().join("backups")).unwrap();
        let backup_id = backup_mgr
            .create_backup("splice lines [3, 7)", std::slice::from_ref(&test_file))
            .unwrap();

        fs::write(&test_file, "modified content").unwrap();
        backup_mgr.restore_backup(&backup_id).unwrap();

        prop_assert_eq!(fs::read_to_string(&test_file).unwrap(), content);
    }

    /// Backup metadata preserves the operation description
    #[test]
    fn prop_backup_preserves_description(description in "[a-z \\[\\],0-9]{1,40}") {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.tsx");
        fs::write(&test_file, "test content").unwrap();

        let mut backup_mgr = BackupManager::with_directory(temp_dir.path().join("backups")).unwrap();
        let backup_id = backup_mgr
            .create_backup(&description, std::slice::from_ref(&test_file))
            .unwrap();

        let backup = backup_mgr.get_backup(&backup_id).unwrap();
        prop_assert_eq!(&backup.description, &description);
    }
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_scenario_remove_target_line() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("table.tsx");
    fs::write(&path, "A\nTARGET X\nB\n").unwrap();

    let report = apply_patch(&Patch::remove(&path, target_guard_spec())).unwrap();

    assert_eq!(report.outcome, Outcome::Removed { line_numbers: vec![2] });
    assert_eq!(fs::read_to_string(&path).unwrap(), "A\nB\n");
}

#[test]
fn test_scenario_splice_ten_lines() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dashboard.tsx");
    let original: Vec<String> = (0..10).map(|i| format!("line {}\n", i)).collect();
    fs::write(&path, original.concat()).unwrap();

    apply_patch(&Patch::splice(&path, 3, 7, "PATCH", BoundaryPolicy::Strict)).unwrap();

    let patched = LineSequence::read(&path).unwrap();
    let mut expected = original[..3].to_vec();
    expected.push("PATCH\n".to_string());
    expected.extend_from_slice(&original[7..]);
    assert_eq!(patched.lines(), &expected[..]);
    assert_eq!(patched.len(), 6);
}

#[test]
fn test_scenario_boundary_out_of_range_is_recoverable() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dashboard.tsx");
    fs::write(&path, "a\nb\nc\n").unwrap();

    let err = apply_patch(&Patch::splice(&path, 1, 99, "x", BoundaryPolicy::Strict)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PatchError>(),
        Some(PatchError::BoundaryOutOfRange { value: 99, line_count: 3, .. })
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc\n");

    let report = apply_patch(&Patch::splice(&path, 1, 99, "x", BoundaryPolicy::Clamp)).unwrap();
    assert!(matches!(report.outcome, Outcome::Spliced { clamped: true, .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nx\n");
}
