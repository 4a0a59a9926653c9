//! Source acquisition.
//!
//! A `Source` turns a package into a verified, unpacked source tree under
//! `<root>/sources`. Both variants record their result in a sidecar file so
//! that later runs return the recorded directory without network access,
//! verification or extraction.
//!
//! # Submodules
//!
//! - [`http`] - archives downloaded over HTTP and verified by digest
//! - [`git`] - revisions exported from a mirrored git repository
//! - [`archive`] - archive format detection and extraction

pub mod archive;
pub mod git;
pub mod http;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::lock::LockError;
use crate::package::PackageId;

pub use git::{GitError, GitSource};
pub use http::HttpSource;

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("fetch failed for {url}: {message}")]
  Fetch { url: String, message: String },

  #[error(
    "hash for {} did not match: expected \"{expected}\", got \"{actual}\"",
    .path.display()
  )]
  ChecksumMismatch {
    path: PathBuf,
    expected: String,
    actual: String,
  },

  #[error("unsupported archive format: {}", .0.display())]
  UnsupportedArchive(PathBuf),

  #[error("failed to extract {}: {message}", .archive.display())]
  Extract { archive: PathBuf, message: String },

  #[error(
    "expected {} to unpack into exactly one new top-level directory, found {}; \
     remove stale directories from the sources folder or configure the unpack directory explicitly",
    .archive.display(),
    describe_dirs(.new_dirs)
  )]
  UnpackLayout { archive: PathBuf, new_dirs: Vec<PathBuf> },

  #[error("{} did not contain the expected top-level directory {}", .archive.display(), .dir.display())]
  MissingUnpackDir { archive: PathBuf, dir: PathBuf },

  #[error("{context}: {source}")]
  Io {
    context: String,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Git(#[from] GitError),
}

impl SourceError {
  pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
    Self::Io {
      context: context.into(),
      source,
    }
  }
}

fn describe_dirs(dirs: &[PathBuf]) -> String {
  if dirs.is_empty() {
    return "none".to_string();
  }
  dirs
    .iter()
    .map(|d| d.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

/// How to obtain a package's source tree.
#[derive(Debug)]
pub enum Source {
  Http(HttpSource),
  Git(GitSource),
}

impl Source {
  pub fn package(&self) -> &PackageId {
    match self {
      Source::Http(source) => source.package(),
      Source::Git(source) => source.package(),
    }
  }

  /// The unpacked source directory, acquiring it if needed.
  pub fn get_source(&self) -> Result<PathBuf, SourceError> {
    match self {
      Source::Http(source) => source.get_source(),
      Source::Git(source) => source.get_source(),
    }
  }
}

impl From<HttpSource> for Source {
  fn from(source: HttpSource) -> Self {
    Source::Http(source)
  }
}

impl From<GitSource> for Source {
  fn from(source: GitSource) -> Self {
    Source::Git(source)
  }
}

/// Read a sidecar record, if present.
fn read_sidecar(path: &Path) -> Result<Option<PathBuf>, SourceError> {
  match std::fs::read_to_string(path) {
    Ok(content) => Ok(Some(PathBuf::from(content))),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(SourceError::io(format!("reading {}", path.display()), e)),
  }
}

/// Keep only characters that are safe in a file name.
fn sanitize_file_name(name: &str) -> String {
  name
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect()
}
