//! Filesystem helpers for persisted records.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `contents` to `path` through a temporary file in the same directory
/// followed by a rename, so readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
  let parent = path
    .parent()
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"))?;

  let mut tmp = NamedTempFile::new_in(parent)?;
  tmp.write_all(contents)?;
  tmp.as_file().sync_all()?;
  tmp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Create an empty presence marker.
pub fn touch_marker(path: &Path) -> io::Result<()> {
  write_atomic(path, b"")
}
