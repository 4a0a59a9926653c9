//! CMake import declarations for installed libraries.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("unsupported link language '{0}', expected C or CXX")]
  InvalidLinkLanguage(String),

  #[error("failed to resolve {}: {source}", .path.display())]
  Resolve {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write import declarations: {0}")]
  Write(#[source] io::Error),
}

/// Language used to link against an imported library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLanguage {
  C,
  Cxx,
}

impl LinkLanguage {
  pub fn as_str(&self) -> &'static str {
    match self {
      LinkLanguage::C => "C",
      LinkLanguage::Cxx => "CXX",
    }
  }
}

impl fmt::Display for LinkLanguage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LinkLanguage {
  type Err = ExportError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "C" => Ok(LinkLanguage::C),
      "CXX" => Ok(LinkLanguage::Cxx),
      other => Err(ExportError::InvalidLinkLanguage(other.to_string())),
    }
  }
}

/// Declare `target` as an imported static library.
///
/// Include directories and the library path are made absolute; they are not
/// required to exist.
pub fn add_static_library<P: AsRef<Path>>(
  out: &mut dyn Write,
  target: &str,
  include_dirs: &[P],
  library_path: &Path,
  link_language: LinkLanguage,
) -> Result<(), ExportError> {
  let includes = include_dirs
    .iter()
    .map(|dir| absolute(dir.as_ref()).map(|p| p.to_string_lossy().into_owned()))
    .collect::<Result<Vec<_>, _>>()?
    .join(";");
  let library = absolute(library_path)?;

  write!(
    out,
    "add_library({target} STATIC IMPORTED)\n\
     set_target_properties({target} PROPERTIES\n  \
     INTERFACE_INCLUDE_DIRECTORIES {includes}\n  \
     IMPORTED_LINK_INTERFACE_LANGUAGES \"{language}\"\n  \
     IMPORTED_LOCATION \"{library}\")\n",
    target = target,
    includes = includes,
    language = link_language,
    library = library.display(),
  )
  .map_err(ExportError::Write)
}

fn absolute(path: &Path) -> Result<PathBuf, ExportError> {
  std::path::absolute(path).map_err(|source| ExportError::Resolve {
    path: path.to_path_buf(),
    source,
  })
}
