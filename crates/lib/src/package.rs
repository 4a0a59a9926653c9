//! Package identity.
//!
//! A `PackageId` names a dependency by `(name, version)`. Both parts end up as
//! path components under the workspace root and as hash input for the build
//! identity, so they are validated on construction.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackageError {
  #[error("package {field} must not be empty")]
  Empty { field: &'static str },

  #[error("package {field} '{value}' is not a valid path component")]
  InvalidComponent { field: &'static str, value: String },
}

/// The `(name, version)` pair identifying a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
  name: String,
  version: String,
}

impl PackageId {
  pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self, PackageError> {
    let name = name.into();
    let version = version.into();
    validate_component("name", &name)?;
    validate_component("version", &version)?;
    Ok(Self { name, version })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }
}

impl fmt::Display for PackageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.name, self.version)
  }
}

fn validate_component(field: &'static str, value: &str) -> Result<(), PackageError> {
  if value.is_empty() {
    return Err(PackageError::Empty { field });
  }

  let allowed = value
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'));

  if !allowed || value == "." || value == ".." {
    return Err(PackageError::InvalidComponent {
      field,
      value: value.to_string(),
    });
  }

  Ok(())
}
