//! Incremental copy support.
//!
//! A source is skipped when its output already exists and was modified no
//! earlier than the source. There is no manifest; file modification times
//! are the only state.

use std::fs;
use std::io;
use std::path::Path;

/// Whether `output` exists and is at least as new as `source`.
///
/// Any error reading either timestamp counts as out of date.
pub fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified());
    match (modified(source), modified(output)) {
        (Ok(src), Ok(out)) => out >= src,
        _ => false,
    }
}

/// Copy `source` to `output` unless the output is up to date.
///
/// Creates parent directories as needed. Returns `true` when the file was
/// copied and `false` when it was skipped.
pub fn copy_if_newer(source: &Path, output: &Path) -> io::Result<bool> {
    if is_up_to_date(source, output) {
        return Ok(false);
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, output)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn set_age(path: &Path, unix_seconds: i64) {
        set_file_mtime(path, FileTime::from_unix_time(unix_seconds, 0)).expect("should set mtime");
    }

    #[test]
    fn test_missing_output_is_stale() {
        let temp = TempDir::new().expect("should create temp dir");
        let source = temp.path().join("a.png");
        fs::write(&source, b"png").expect("should write");
        assert!(!is_up_to_date(&source, &temp.path().join("out/a.png")));
    }

    #[test]
    fn test_newer_output_is_up_to_date() {
        let temp = TempDir::new().expect("should create temp dir");
        let source = temp.path().join("a.png");
        let output = temp.path().join("b.png");
        fs::write(&source, b"png").expect("should write");
        fs::write(&output, b"png").expect("should write");
        set_age(&source, 1_000_000);
        set_age(&output, 2_000_000);

        assert!(is_up_to_date(&source, &output));
    }

    #[test]
    fn test_older_output_is_stale() {
        let temp = TempDir::new().expect("should create temp dir");
        let source = temp.path().join("a.png");
        let output = temp.path().join("b.png");
        fs::write(&source, b"png").expect("should write");
        fs::write(&output, b"png").expect("should write");
        set_age(&source, 2_000_000);
        set_age(&output, 1_000_000);

        assert!(!is_up_to_date(&source, &output));
    }

    #[test]
    fn test_copy_if_newer_creates_and_skips() {
        let temp = TempDir::new().expect("should create temp dir");
        let source = temp.path().join("a.png");
        let output = temp.path().join("out/nested/a.png");
        fs::write(&source, b"first").expect("should write");
        set_age(&source, 1_000_000);

        assert!(copy_if_newer(&source, &output).expect("should copy"));
        assert_eq!(fs::read(&output).expect("should read"), b"first");

        set_age(&output, 2_000_000);
        fs::write(&source, b"second").expect("should write");
        set_age(&source, 1_500_000);
        assert!(!copy_if_newer(&source, &output).expect("should skip"));
        assert_eq!(fs::read(&output).expect("should read"), b"first");
    }
}
