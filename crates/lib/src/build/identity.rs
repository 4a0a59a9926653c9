//! Build identity: the cache key for build and install directories.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Toolchain;
use crate::package::PackageId;
use crate::util::hash::DigestAlgorithm;

/// Lowercase hex SHA-1 identifying one toolchain + package combination.
///
/// The component order is part of the on-disk cache format: changing it
/// relocates every existing build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(String);

impl BuildId {
  /// Digest over C compiler id, C compiler version, C++ compiler id, C++
  /// compiler version, package name and package version, in that order.
  pub fn compute(toolchain: &Toolchain, package: &PackageId) -> Self {
    Self::from_parts(&[
      &toolchain.c_compiler_id,
      &toolchain.c_compiler_version,
      &toolchain.cxx_compiler_id,
      &toolchain.cxx_compiler_version,
      package.name(),
      package.version(),
    ])
  }

  /// Derive a new identity from this one and additional recipe inputs.
  pub fn extend<S: AsRef<str>>(&self, parts: &[S]) -> Self {
    let mut all: Vec<&str> = Vec::with_capacity(parts.len() + 1);
    all.push(&self.0);
    all.extend(parts.iter().map(AsRef::as_ref));
    Self::from_parts(&all)
  }

  fn from_parts(parts: &[&str]) -> Self {
    let concatenated = parts.concat();
    Self(DigestAlgorithm::Sha1.hex_digest(concatenated.as_bytes()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for BuildId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
