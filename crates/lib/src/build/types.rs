//! Build errors and stage definitions.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{BUILD_DONE_MARKER, CONFIGURE_DONE_MARKER, INSTALL_DONE_MARKER};
use crate::export::ExportError;
use crate::lock::LockError;
use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Source(#[from] SourceError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Export(#[from] ExportError),

  #[error("failed to create directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write stage marker {}: {source}", .path.display())]
  WriteMarker {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("empty command")]
  EmptyCommand,

  #[error("failed to start command `{command}`: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command `{command}` failed with {}", describe_exit(.code))]
  CommandFailed { command: String, code: Option<i32> },

  #[error("{context}: {source}")]
  Io {
    context: String,
    #[source]
    source: std::io::Error,
  },
}

impl BuildError {
  pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
    Self::Io {
      context: context.into(),
      source,
    }
  }
}

fn describe_exit(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {}", code),
    None => "no exit code (terminated by signal)".to_string(),
  }
}

/// One of the three memoized pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Configure,
  Build,
  Install,
}

impl Stage {
  /// Name of the file whose presence records the stage as complete.
  pub fn marker(&self) -> &'static str {
    match self {
      Stage::Configure => CONFIGURE_DONE_MARKER,
      Stage::Build => BUILD_DONE_MARKER,
      Stage::Install => INSTALL_DONE_MARKER,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Configure => "configure",
      Stage::Build => "build",
      Stage::Install => "install",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
