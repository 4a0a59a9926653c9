//! Test utilities for cpackman-lib.
//!
//! Archive builders and workspace fixtures shared by unit tests.

use std::io::{Cursor, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::config::{Config, IntegrityPolicy, Toolchain};
use crate::workspace::Workspace;

/// A `.tar.gz` whose entries all live under `top/`.
pub fn tar_gz_archive(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for (name, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
      .append_data(&mut header, format!("{}/{}", top, name), content.as_bytes())
      .unwrap();
  }

  builder.into_inner().unwrap().finish().unwrap()
}

/// A `.tar.gz` with entries at the archive root, no common top-level directory.
pub fn flat_tar_gz_archive(files: &[(&str, &str)]) -> Vec<u8> {
  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for (name, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, content.as_bytes()).unwrap();
  }

  builder.into_inner().unwrap().finish().unwrap()
}

/// A `.zip` whose entries all live under `top/`.
pub fn zip_archive(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  let options = zip::write::SimpleFileOptions::default();

  for (name, content) in files {
    writer.start_file(format!("{}/{}", top, name), options).unwrap();
    writer.write_all(content.as_bytes()).unwrap();
  }

  writer.finish().unwrap().into_inner()
}

pub fn gnu_toolchain() -> Toolchain {
  Toolchain::new("GNU", "12.2.0", "GNU", "12.2.0")
}

/// Workspace rooted at `root` that reports checksum mismatches as errors.
pub fn test_workspace(root: &Path) -> Workspace {
  let config = Config::new(root, gnu_toolchain()).with_integrity(IntegrityPolicy::Error);
  Workspace::new(config).unwrap()
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> Vec<String> {
  vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> Vec<String> {
  vec!["cmd.exe".to_string(), "/C".to_string(), script.to_string()]
}
