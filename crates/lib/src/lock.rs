//! Directory-scoped advisory locks.
//!
//! Every stage transition and every source acquisition holds the lock of the
//! directory it mutates, so concurrent invocations targeting the same build
//! identity serialize instead of racing on markers and extraction.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::LOCK_FILENAME;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub purpose: String,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error("failed to create lock directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open lock file {}: {source}", .path.display())]
  OpenFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock {}: {source}", .path.display())]
  LockFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// An exclusive advisory lock on a directory, released on drop.
#[derive(Debug)]
pub struct DirLock {
  _file: File,
  lock_path: PathBuf,
}

impl DirLock {
  /// Acquire the lock on `dir`, waiting for any other holder to release it.
  pub fn acquire(dir: &Path, purpose: &str) -> Result<Self, LockError> {
    let (file, lock_path) = open_lock_file(dir)?;

    debug!(path = %lock_path.display(), purpose, "acquiring lock");
    lock(&file).map_err(|source| LockError::LockFailed {
      path: lock_path.clone(),
      source,
    })?;

    write_metadata(&file, purpose)?;
    Ok(DirLock { _file: file, lock_path })
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

fn open_lock_file(dir: &Path) -> Result<(File, PathBuf), LockError> {
  if !dir.exists() {
    std::fs::create_dir_all(dir).map_err(|source| LockError::CreateDir {
      path: dir.to_path_buf(),
      source,
    })?;
  }

  let lock_path = dir.join(LOCK_FILENAME);
  let file = OpenOptions::new()
    .read(true)
    .write(true)
    .create(true)
    .truncate(false)
    .open(&lock_path)
    .map_err(|source| LockError::OpenFile {
      path: lock_path.clone(),
      source,
    })?;

  Ok((file, lock_path))
}

fn write_metadata(file: &File, purpose: &str) -> Result<(), LockError> {
  let started_at_unix = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix,
    purpose: purpose.to_string(),
  };
  let json = serde_json::to_vec_pretty(&metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;

  let mut file = file;
  file.set_len(0).map_err(LockError::WriteMetadata)?;
  file.write_all(&json).map_err(LockError::WriteMetadata)?;
  file.flush().map_err(LockError::WriteMetadata)
}

#[cfg(unix)]
fn lock(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};

  flock(file, FlockOperation::LockExclusive).map_err(io::Error::from)
}

#[cfg(windows)]
fn lock(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LockFileEx};
  use windows_sys::Win32::System::IO::OVERLAPPED;

  // SAFETY: the handle is owned by `file` for the duration of the call and a
  // zeroed OVERLAPPED locks from offset 0.
  let locked = unsafe {
    let mut overlapped: OVERLAPPED = std::mem::zeroed();
    LockFileEx(file.as_raw_handle() as _, LOCKFILE_EXCLUSIVE_LOCK, 0, 1, 0, &mut overlapped)
  };
  if locked == 0 {
    return Err(io::Error::last_os_error());
  }
  Ok(())
}
