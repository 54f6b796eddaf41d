//! Advisory locking for the deploy critical section.
//!
//! The build configuration is a single-writer resource: two concurrent runs
//! would race on the patch/restore cycle and could strip each other's
//! marker. The lock covers the whole patched span and fails fast on
//! contention, reporting the holder's identity from metadata stored in the
//! lock file. Released when the guard drops.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOCK_FILENAME: &str = ".webdeploy.lock";

/// Metadata identifying the process holding the lock.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockHolder {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub project: PathBuf,
}

/// Errors acquiring the deploy lock.
#[derive(Debug, Error)]
pub enum LockError {
  #[error(
    "another deploy is already running: PID {pid}, started at unix {started_at_unix}\n\
     If you're sure no deploy is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    pid: u32,
    started_at_unix: u64,
    lock_path: PathBuf,
  },

  #[error(
    "the project is locked (could not read holder metadata)\n\
     If you're sure no deploy is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to open lock file {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  Acquire(#[source] io::Error),
}

/// Exclusive lock over a project's deploy critical section.
pub struct DeployLock {
  _file: File,
  lock_path: PathBuf,
}

impl DeployLock {
  /// Acquire the lock for `project_dir`, non-blocking.
  pub fn acquire(project_dir: &Path) -> Result<Self, LockError> {
    let lock_path = project_dir.join(LOCK_FILENAME);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(|source| LockError::Open {
        path: lock_path.clone(),
        source,
      })?;

    if let Err(err) = try_lock_exclusive(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path));
      }
      return Err(LockError::Acquire(err));
    }

    Self::write_holder(&file, project_dir)?;

    Ok(DeployLock { _file: file, lock_path })
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  fn write_holder(file: &File, project_dir: &Path) -> Result<(), LockError> {
    let holder = LockHolder {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      project: project_dir.to_path_buf(),
    };

    file.set_len(0).map_err(LockError::WriteMetadata)?;
    let content =
      serde_json::to_string_pretty(&holder).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
    let mut file = file;
    io::Write::write_all(&mut file, content.as_bytes()).map_err(LockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path) -> LockError {
    if let Ok(contents) = std::fs::read_to_string(lock_path)
      && let Ok(holder) = serde_json::from_str::<LockHolder>(&contents)
    {
      return LockError::Contention {
        pid: holder.pid,
        started_at_unix: holder.started_at_unix,
        lock_path: lock_path.to_path_buf(),
      };
    }

    LockError::ContentionUnknown {
      lock_path: lock_path.to_path_buf(),
    }
  }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn acquire_creates_lock_file() {
    let temp = TempDir::new().unwrap();

    let lock = DeployLock::acquire(temp.path()).unwrap();

    assert!(lock.lock_path().exists());
  }

  #[test]
  fn holder_metadata_written() {
    let temp = TempDir::new().unwrap();

    let lock = DeployLock::acquire(temp.path()).unwrap();

    let contents = std::fs::read_to_string(lock.lock_path()).unwrap();
    let holder: LockHolder = serde_json::from_str(&contents).unwrap();
    assert_eq!(holder.version, 1);
    assert_eq!(holder.pid, std::process::id());
    assert_eq!(holder.project, temp.path());
  }

  #[test]
  fn lock_released_on_drop() {
    let temp = TempDir::new().unwrap();

    {
      let _lock = DeployLock::acquire(temp.path()).unwrap();
    }

    DeployLock::acquire(temp.path()).unwrap();
  }
}
