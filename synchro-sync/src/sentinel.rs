//! Zero-length marker files in the source directory.
//!
//! Creation of the in-progress marker is create-if-absent, which is the only
//! mutual exclusion between concurrent invocations.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{io_err, SyncError};

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Create `path`, failing with [`SyncError::SentinelCollision`] if it is
/// already there.
pub fn touch_exclusive(path: &Path) -> Result<(), SyncError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(SyncError::SentinelCollision {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Create `path` or leave an existing file untouched.
pub fn touch(path: &Path) -> Result<(), SyncError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map(drop)
        .map_err(|e| io_err(path, e))
}

/// Remove `path`; a file that is already gone is not an error.
pub fn remove(path: &Path) -> Result<(), SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn exclusive_touch_collides_with_existing_file() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("transfer.ongoing");
        touch_exclusive(&marker).unwrap();
        assert!(exists(&marker));

        let err = touch_exclusive(&marker).unwrap_err();
        assert!(
            matches!(err, SyncError::SentinelCollision { ref path } if path == &marker),
            "got: {err}"
        );
    }

    #[test]
    fn touch_is_idempotent_and_remove_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("transfer.done");
        touch(&marker).unwrap();
        touch(&marker).unwrap();
        assert!(exists(&marker));

        remove(&marker).unwrap();
        assert!(!exists(&marker));
        remove(&marker).unwrap();
    }
}
