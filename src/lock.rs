use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{ConvertError, Result};

/// Single-instance guard backed by a pid file.
///
/// The file exists exactly while a run holds the lock. It is removed when the
/// guard is dropped, which covers normal exit, error returns, and
/// cancellation of the owning future.
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    /// Take the lock or fail with `AlreadyRunning` naming the current owner
    pub fn acquire<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let owner = Self::owner(&path).unwrap_or_else(|| "unknown owner".to_string());
                return Err(ConvertError::AlreadyRunning {
                    owner,
                    lock_file: path,
                });
            }
            Err(e) => return Err(e.into()),
        };

        // from here on the guard owns the file, so a failed write still cleans up
        let lock = Self { path };
        writeln!(file, "{}", std::process::id())?;
        info!("Acquired lock {} (pid {})", lock.path.display(), std::process::id());
        Ok(lock)
    }

    /// Pid recorded in an existing lock file
    pub fn owner(path: &Path) -> Option<String> {
        let content = fs::read_to_string(path).ok()?;
        let owner = content.trim();
        (!owner.is_empty()).then(|| owner.to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Released lock {}", self.path.display()),
            Err(e) => error!("Failed to release lock {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind as ConvertErrorKind;
    use assert_fs::prelude::*;

    #[test]
    fn test_acquire_writes_pid_and_release_removes_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let pid_file = temp.child("convert.pid");

        let lock = PidLock::acquire(pid_file.path()).unwrap();
        assert_eq!(PidLock::owner(pid_file.path()), Some(std::process::id().to_string()));
        assert_eq!(lock.path(), pid_file.path());

        drop(lock);
        assert!(!pid_file.path().exists());
    }

    #[test]
    fn test_second_acquire_reports_owner() {
        let temp = assert_fs::TempDir::new().unwrap();
        let pid_file = temp.child("convert.pid");
        pid_file.write_str("4242\n").unwrap();

        let err = PidLock::acquire(pid_file.path()).unwrap_err();
        assert_eq!(err.kind(), ConvertErrorKind::AlreadyRunning);
        assert!(err.to_string().contains("4242"));
        // a refused lock must not touch the existing file
        assert_eq!(PidLock::owner(pid_file.path()).as_deref(), Some("4242"));
    }

    #[test]
    fn test_empty_lock_file_still_locks() {
        let temp = assert_fs::TempDir::new().unwrap();
        let pid_file = temp.child("convert.pid");
        pid_file.touch().unwrap();

        let err = PidLock::acquire(pid_file.path()).unwrap_err();
        assert!(matches!(err, ConvertError::AlreadyRunning { ref owner, .. } if owner == "unknown owner"));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = PidLock::acquire(temp.path().join("missing/convert.pid")).unwrap_err();
        assert_eq!(err.kind(), ConvertErrorKind::Io);
    }
}
