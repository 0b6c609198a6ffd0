//! Report persistence.
//!
//! Reports are written to a temporary file in the target directory and then
//! renamed into place, so a reader never observes a half-written PDF and two
//! concurrent sessions for the same patient never interleave bytes.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Output directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid report file name: {0:?}")]
    InvalidFileName(String),

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Atomically write `bytes` to `dir/file_name`, replacing any previous file.
///
/// Returns the final path.
pub fn write_report(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, OutputError> {
    if !dir.is_dir() {
        return Err(OutputError::DirectoryNotFound(dir.to_path_buf()));
    }
    // Only bare names; callers build these with `report_file_name`.
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\'])
    {
        return Err(OutputError::InvalidFileName(file_name.to_string()));
    }

    let target = dir.join(file_name);
    let write_err = |source: std::io::Error| OutputError::Write {
        path: target.clone(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(&target).map_err(|e| write_err(e.error))?;

    tracing::debug!("Persisted report ({} bytes) to {:?}", bytes.len(), target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_report(dir.path(), "Jane Doe_heart_report.pdf", b"%PDF-1.3 test")
            .expect("Should write");

        assert_eq!(path, dir.path().join("Jane Doe_heart_report.pdf"));
        assert_eq!(std::fs::read(&path).expect("read"), b"%PDF-1.3 test");
    }

    #[test]
    fn test_write_report_replaces_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_report(dir.path(), "a_heart_report.pdf", b"first").expect("first write");
        let path = write_report(dir.path(), "a_heart_report.pdf", b"second").expect("second write");

        assert_eq!(std::fs::read(&path).expect("read"), b"second");
        // No temp files left behind
        let entries = std::fs::read_dir(dir.path()).expect("read_dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_report_rejects_path_components() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = write_report(dir.path(), "../escape.pdf", b"x").unwrap_err();
        assert!(matches!(err, OutputError::InvalidFileName(_)));
    }

    #[test]
    fn test_write_report_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = write_report(&missing, "x_heart_report.pdf", b"x").unwrap_err();
        assert!(matches!(err, OutputError::DirectoryNotFound(_)));
    }
}
