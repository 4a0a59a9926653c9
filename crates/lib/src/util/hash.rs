//! Digest helpers for archive verification and cache keys.
//!
//! Archives are verified with whichever algorithm the source declares; the
//! default is SHA-1 for compatibility with existing pellet checksums.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown digest algorithm '{0}' (expected sha1, sha256 or sha512)")]
pub struct UnknownAlgorithm(pub String);

/// Digest algorithm used to verify a downloaded archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
  #[default]
  Sha1,
  Sha256,
  Sha512,
}

impl DigestAlgorithm {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Sha1 => "sha1",
      Self::Sha256 => "sha256",
      Self::Sha512 => "sha512",
    }
  }

  /// Lowercase hex digest of `data`.
  pub fn hex_digest(&self, data: &[u8]) -> String {
    match self {
      Self::Sha1 => hex::encode(Sha1::digest(data)),
      Self::Sha256 => hex::encode(Sha256::digest(data)),
      Self::Sha512 => hex::encode(Sha512::digest(data)),
    }
  }
}

impl fmt::Display for DigestAlgorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DigestAlgorithm {
  type Err = UnknownAlgorithm;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().replace('-', "").as_str() {
      "sha1" => Ok(Self::Sha1),
      "sha256" => Ok(Self::Sha256),
      "sha512" => Ok(Self::Sha512),
      _ => Err(UnknownAlgorithm(s.to_string())),
    }
  }
}

/// Hash a file's full contents.
///
/// The file is read into memory in one go.
pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> io::Result<String> {
  let data = fs::read(path)?;
  Ok(algorithm.hex_digest(&data))
}
