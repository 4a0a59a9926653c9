//! Configuration: working root, toolchain identity and integrity policy.
//!
//! The toolchain is normally handed over by the CMake dependency provider,
//! either as environment variables or as a JSON file written at configure
//! time. The working root defaults to `./cpackman` and can be overridden with
//! `CPACKMAN_ROOT`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_ROOT_DIR;

pub const ROOT_ENV: &str = "CPACKMAN_ROOT";
pub const C_COMPILER_ENV: &str = "CPACKMAN_C_COMPILER";
pub const C_COMPILER_ID_ENV: &str = "CPACKMAN_C_COMPILER_ID";
pub const C_COMPILER_VERSION_ENV: &str = "CPACKMAN_C_COMPILER_VERSION";
pub const CXX_COMPILER_ENV: &str = "CPACKMAN_CXX_COMPILER";
pub const CXX_COMPILER_ID_ENV: &str = "CPACKMAN_CXX_COMPILER_ID";
pub const CXX_COMPILER_VERSION_ENV: &str = "CPACKMAN_CXX_COMPILER_VERSION";
pub const CXX_STDLIB_ENV: &str = "CPACKMAN_CXX_STDLIB";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("environment variable {0} is not set")]
  MissingVar(&'static str),

  #[error("failed to read toolchain file {}: {source}", .path.display())]
  ReadToolchain {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid toolchain file {}: {source}", .path.display())]
  ParseToolchain {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Identity of the compilers a dependency is built with.
///
/// The ids and versions participate in the build identity; the compiler paths
/// and standard library only affect how recipes invoke the toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
  #[serde(default)]
  pub c_compiler: Option<PathBuf>,
  pub c_compiler_id: String,
  pub c_compiler_version: String,
  #[serde(default)]
  pub cxx_compiler: Option<PathBuf>,
  pub cxx_compiler_id: String,
  pub cxx_compiler_version: String,
  #[serde(default)]
  pub cxx_stdlib: Option<String>,
}

impl Toolchain {
  /// Toolchain with the given ids and versions and no explicit compiler paths.
  pub fn new(
    c_compiler_id: impl Into<String>,
    c_compiler_version: impl Into<String>,
    cxx_compiler_id: impl Into<String>,
    cxx_compiler_version: impl Into<String>,
  ) -> Self {
    Self {
      c_compiler: None,
      c_compiler_id: c_compiler_id.into(),
      c_compiler_version: c_compiler_version.into(),
      cxx_compiler: None,
      cxx_compiler_id: cxx_compiler_id.into(),
      cxx_compiler_version: cxx_compiler_version.into(),
      cxx_stdlib: None,
    }
  }

  pub fn from_env() -> Result<Self, ConfigError> {
    Ok(Self {
      c_compiler: optional_var(C_COMPILER_ENV).map(PathBuf::from),
      c_compiler_id: required_var(C_COMPILER_ID_ENV)?,
      c_compiler_version: required_var(C_COMPILER_VERSION_ENV)?,
      cxx_compiler: optional_var(CXX_COMPILER_ENV).map(PathBuf::from),
      cxx_compiler_id: required_var(CXX_COMPILER_ID_ENV)?,
      cxx_compiler_version: required_var(CXX_COMPILER_VERSION_ENV)?,
      cxx_stdlib: optional_var(CXX_STDLIB_ENV),
    })
  }

  /// Load a toolchain description from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadToolchain {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::ParseToolchain {
      path: path.to_path_buf(),
      source,
    })
  }

  /// C compiler executable, falling back to `cc`.
  pub fn c_compiler_path(&self) -> PathBuf {
    self.c_compiler.clone().unwrap_or_else(|| PathBuf::from("cc"))
  }

  /// C++ compiler executable, falling back to `c++`.
  pub fn cxx_compiler_path(&self) -> PathBuf {
    self.cxx_compiler.clone().unwrap_or_else(|| PathBuf::from("c++"))
  }
}

/// What to do when a downloaded archive fails checksum verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegrityPolicy {
  /// Print the mismatch and terminate the process with a failure status.
  #[default]
  Abort,
  /// Return `SourceError::ChecksumMismatch` to the caller.
  Error,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub root: PathBuf,
  pub toolchain: Toolchain,
  pub integrity: IntegrityPolicy,
}

impl Config {
  pub fn new(root: impl Into<PathBuf>, toolchain: Toolchain) -> Self {
    Self {
      root: root.into(),
      toolchain,
      integrity: IntegrityPolicy::default(),
    }
  }

  pub fn with_integrity(mut self, integrity: IntegrityPolicy) -> Self {
    self.integrity = integrity;
    self
  }
}

/// Working root from `CPACKMAN_ROOT`, or `./cpackman`.
pub fn root_from_env() -> PathBuf {
  optional_var(ROOT_ENV)
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR))
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
  optional_var(name).ok_or(ConfigError::MissingVar(name))
}

fn optional_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}
