//! Error helper functions for creating actionable error messages

use std::io;
use std::path::Path;

/// Check if an IO error is a permission denied error
pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

/// Check if an IO error is a "not found" error
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

fn parent_of(path: &Path) -> String {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Create an enhanced error message for file permission issues
pub fn permission_error(path: &Path, operation: &str) -> String {
    format!(
        "Permission denied when {} '{}'\n\n\
         Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. Patched files are replaced via a temp file, so the directory needs write access: chmod u+w '{}'\n\
         3. For backup operations: use --backup-dir to pick a writable location",
        operation,
        path.display(),
        path.display(),
        parent_of(path)
    )
}

/// Create an enhanced error message for file not found issues
pub fn not_found_error(path: &Path, context: &str) -> String {
    format!(
        "File not found: '{}'\n\n\
         Context: {}\n\n\
         Possible fixes:\n\
         1. Check the file path is correct\n\
         2. Paths in recipes are resolved relative to the recipe file\n\
         3. Use an absolute path if the relative path is ambiguous",
        path.display(),
        context
    )
}

/// Create an enhanced error message for failures while replacing a file
pub fn write_error(path: &Path, underlying_err: &io::Error) -> String {
    let base = format!("Failed to write file: '{}'", path.display());

    if is_permission_denied(underlying_err) {
        format!(
            "{}\n\n\
             Cause: Permission denied\n\n\
             Possible fixes:\n\
             1. Check write permissions on '{}'\n\
             2. Check the file is not read-only: ls -l '{}'",
            base,
            parent_of(path),
            path.display()
        )
    } else {
        format!(
            "{}\n\n\
             Underlying error: {}\n\
             The original file was left untouched.",
            base, underlying_err
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_is_permission_denied() {
        let perm_err = io::Error::new(ErrorKind::PermissionDenied, "access denied");
        assert!(is_permission_denied(&perm_err));

        let not_found_err = io::Error::new(ErrorKind::NotFound, "not found");
        assert!(!is_permission_denied(&not_found_err));
    }

    #[test]
    fn test_is_not_found() {
        let not_found_err = io::Error::new(ErrorKind::NotFound, "not found");
        assert!(is_not_found(&not_found_err));

        let perm_err = io::Error::new(ErrorKind::PermissionDenied, "access denied");
        assert!(!is_not_found(&perm_err));
    }

    #[test]
    fn test_permission_error_formatting() {
        let path = Path::new("/tmp/Dashboard.tsx");
        let msg = permission_error(path, "reading");
        assert!(msg.contains("Permission denied"));
        assert!(msg.contains("reading"));
        assert!(msg.contains("/tmp/Dashboard.tsx"));
        assert!(msg.contains("chmod u+w '/tmp'"));
    }

    #[test]
    fn test_not_found_error_formatting() {
        let path = Path::new("/home/user/Dashboard.tsx");
        let msg = not_found_error(path, "reading file to patch");
        assert!(msg.contains("File not found"));
        assert!(msg.contains("/home/user/Dashboard.tsx"));
        assert!(msg.contains("reading file to patch"));
    }

    #[test]
    fn test_write_error_other_cause() {
        let err = io::Error::other("disk full");
        let msg = write_error(Path::new("a.tsx"), &err);
        assert!(msg.contains("disk full"));
        assert!(msg.contains("left untouched"));
    }
}
