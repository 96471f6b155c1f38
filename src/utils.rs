//! Utility functions for destination checks and file inspection

use crate::error::{Error, Result};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

/// Check that `path` exists and is a directory.
///
/// Every run calls this before dispatching any job; a failure aborts the run.
pub async fn validate_destination(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::InvalidDestination {
            path: path.to_path_buf(),
            reason: "not a directory".into(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::InvalidDestination {
            path: path.to_path_buf(),
            reason: "does not exist".into(),
        }),
        Err(e) => Err(Error::InvalidDestination {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Size of the file at `path`, or 0 if it cannot be read
pub async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.len())
        .unwrap_or(0)
}

/// Whether `path` has a `.txt` extension (case-insensitive)
pub fn is_txt(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

/// Remove a file or directory tree, treating an already-missing path as success
pub async fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Reserve a uniquely named empty file next to `path`.
///
/// The name is `{prefix}<random>{suffix}`, so concurrent writers aiming at the same `path`
/// never share a scratch file. The file is deleted when the returned [`TempPath`] drops
/// unless it is persisted first.
pub fn sibling_temp(path: &Path, prefix: &str, suffix: &str) -> std::io::Result<TempPath> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map(NamedTempFile::into_temp_path)
}

/// Delete a scratch file, logging instead of failing
pub fn discard_temp(temp: TempPath) {
    let shown = temp.display().to_string();
    if let Err(e) = temp.close() {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %shown, error = %e, "failed to remove temporary file");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn existing_directory_is_valid() {
        let dir = tempdir().unwrap();
        assert!(validate_destination(dir.path()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_directory_is_invalid() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        match validate_destination(&missing).await {
            Err(Error::InvalidDestination { path, reason }) => {
                assert_eq!(path, missing);
                assert_eq!(reason, "does not exist");
            }
            other => panic!("expected InvalidDestination, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn regular_file_is_invalid() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            validate_destination(&file).await,
            Err(Error::InvalidDestination { .. })
        ));
    }

    #[tokio::test]
    async fn file_size_of_missing_file_is_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(file_size(&dir.path().join("missing")).await, 0);

        let file = dir.path().join("some");
        std::fs::write(&file, b"12345").unwrap();
        assert_eq!(file_size(&file).await, 5);
    }

    #[test]
    fn txt_extension_is_case_insensitive() {
        assert!(is_txt(Path::new("urls.txt")));
        assert!(is_txt(Path::new("URLS.TXT")));
        assert!(!is_txt(Path::new("urls.csv")));
        assert!(!is_txt(Path::new("txt")));
    }

    #[tokio::test]
    async fn remove_path_handles_files_dirs_and_missing() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(sub.join("nested")).unwrap();
        std::fs::write(sub.join("nested").join("a.m4a"), b"x").unwrap();
        let file = dir.path().join("archive.zip");
        std::fs::write(&file, b"x").unwrap();

        remove_path(&sub).await.unwrap();
        remove_path(&file).await.unwrap();
        remove_path(&file).await.unwrap();

        assert!(!sub.exists());
        assert!(!file.exists());
    }

    #[test]
    fn sibling_temps_for_one_path_are_distinct() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Song - Artist.m4a");

        let first = sibling_temp(&target, ".Song - Artist.m4a.", ".part").unwrap();
        let second = sibling_temp(&target, ".Song - Artist.m4a.", ".part").unwrap();

        assert_ne!(first.to_path_buf(), second.to_path_buf());
        assert_eq!(first.parent(), Some(dir.path()));
        assert!(first.to_string_lossy().ends_with(".part"));

        let kept = first.to_path_buf();
        drop(first);
        assert!(!kept.exists(), "unpersisted temp is removed on drop");

        second.persist(&target).unwrap();
        assert!(target.exists());
    }
}
