//! Archives downloaded over HTTP.
//!
//! The archive lands in `<root>/sources/<filename>`, where the filename is the
//! one advertised by the server or the last segment of the URL. After
//! verification and extraction the unpacked directory is recorded in
//! `<archive>.dn`; from then on that record is authoritative.

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_DISPOSITION;
use tracing::{debug, error, info};

use crate::config::IntegrityPolicy;
use crate::consts::{PARTIAL_DOWNLOAD_EXTENSION, SIDECAR_EXTENSION};
use crate::lock::DirLock;
use crate::package::PackageId;
use crate::source::{SourceError, archive, read_sidecar, sanitize_file_name};
use crate::util::fs::write_atomic;
use crate::util::hash::{DigestAlgorithm, hash_file};
use crate::workspace::Workspace;

#[derive(Debug)]
pub struct HttpSource {
  package: PackageId,
  url: String,
  checksum: String,
  algorithm: DigestAlgorithm,
  unpack_dir: Option<String>,
  sources_dir: PathBuf,
  integrity: IntegrityPolicy,
  http: reqwest::blocking::Client,
  file_path: OnceCell<PathBuf>,
}

impl HttpSource {
  /// Describe an archive at `url` whose digest is `checksum` (SHA-1 unless
  /// changed with [`HttpSource::with_algorithm`]).
  pub fn new(ws: &Workspace, package: PackageId, url: impl Into<String>, checksum: impl Into<String>) -> Self {
    Self {
      package,
      url: url.into(),
      checksum: checksum.into(),
      algorithm: DigestAlgorithm::default(),
      unpack_dir: None,
      sources_dir: ws.sources_dir(),
      integrity: ws.integrity(),
      http: ws.http().clone(),
      file_path: OnceCell::new(),
    }
  }

  pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
    self.algorithm = algorithm;
    self
  }

  /// Name the top-level directory the archive unpacks into instead of
  /// detecting it.
  pub fn with_unpack_dir(mut self, name: impl Into<String>) -> Self {
    self.unpack_dir = Some(name.into());
    self
  }

  pub fn package(&self) -> &PackageId {
    &self.package
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn checksum(&self) -> &str {
    &self.checksum
  }

  pub fn algorithm(&self) -> DigestAlgorithm {
    self.algorithm
  }

  /// Destination path of the archive.
  ///
  /// Prefers the filename the server advertises for the URL and falls back to
  /// the last URL path segment. Computed once per instance.
  pub fn resolve_local_path(&self) -> &Path {
    self.file_path.get_or_init(|| {
      let name = self
        .advertised_filename()
        .unwrap_or_else(|| url_to_filename(&self.url));
      self.sources_dir.join(name)
    })
  }

  /// `<archive>.dn`
  pub fn sidecar_path(&self) -> PathBuf {
    append_extension(self.resolve_local_path(), SIDECAR_EXTENSION)
  }

  fn advertised_filename(&self) -> Option<String> {
    let response = match self.http.head(&self.url).send() {
      Ok(response) => response,
      Err(e) => {
        debug!(url = %self.url, error = %e, "HEAD request failed, using URL filename");
        return None;
      }
    };

    if !response.status().is_success() {
      debug!(url = %self.url, status = %response.status(), "HEAD request unsuccessful, using URL filename");
      return None;
    }

    let header = response.headers().get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let name = content_disposition_filename(header)?;
    debug!(url = %self.url, filename = %name, "server advertised filename");
    Some(name)
  }

  /// Download the archive to its resolved path.
  ///
  /// The body is written to `<archive>.part` and renamed once complete, so an
  /// interrupted download never looks like a finished archive.
  pub fn fetch(&self) -> Result<(), SourceError> {
    let dest = self.resolve_local_path();
    let partial = append_extension(dest, PARTIAL_DOWNLOAD_EXTENSION);
    info!(url = %self.url, dest = %dest.display(), "fetching archive");

    let fetch_err = |message: String| SourceError::Fetch {
      url: self.url.clone(),
      message,
    };

    let mut response = self.http.get(&self.url).send().map_err(|e| fetch_err(e.to_string()))?;
    if !response.status().is_success() {
      return Err(fetch_err(format!("HTTP {}", response.status())));
    }

    let mut file = File::create(&partial).map_err(|e| SourceError::io(format!("creating {}", partial.display()), e))?;
    let size = match response.copy_to(&mut file) {
      Ok(size) => size,
      Err(e) => {
        drop(file);
        let _ = fs::remove_file(&partial);
        return Err(fetch_err(e.to_string()));
      }
    };
    file
      .sync_all()
      .map_err(|e| SourceError::io(format!("writing {}", partial.display()), e))?;
    drop(file);

    fs::rename(&partial, dest).map_err(|e| SourceError::io(format!("moving download to {}", dest.display()), e))?;

    info!(path = %dest.display(), size, "download complete");
    Ok(())
  }

  /// Compare the archive's digest with the expected checksum.
  pub fn check_checksum(&self) -> Result<(), SourceError> {
    let path = self.resolve_local_path();
    let actual =
      hash_file(path, self.algorithm).map_err(|e| SourceError::io(format!("reading {}", path.display()), e))?;

    if !actual.eq_ignore_ascii_case(&self.checksum) {
      return Err(SourceError::ChecksumMismatch {
        path: path.to_path_buf(),
        expected: self.checksum.clone(),
        actual,
      });
    }

    debug!(path = %path.display(), algorithm = %self.algorithm, "checksum verified");
    Ok(())
  }

  /// Verify the archive's digest.
  ///
  /// Under [`IntegrityPolicy::Abort`] a mismatch prints the expected and actual
  /// digests and terminates the process with status 1.
  pub fn verify_checksum(&self) -> Result<(), SourceError> {
    match self.check_checksum() {
      Err(SourceError::ChecksumMismatch { path, expected, actual }) if self.integrity == IntegrityPolicy::Abort => {
        error!(path = %path.display(), %expected, %actual, "checksum mismatch");
        eprintln!(
          "Hash for {} did not match. Expected \"{}\", got \"{}\"",
          path.display(),
          expected,
          actual
        );
        std::process::exit(1);
      }
      result => result,
    }
  }

  /// Extract the archive into the sources directory and return the unpacked
  /// directory.
  ///
  /// If the sidecar record exists its content is returned as is: the archive
  /// is neither verified nor read.
  pub fn unpack(&self) -> Result<PathBuf, SourceError> {
    let sidecar = self.sidecar_path();
    if let Some(recorded) = read_sidecar(&sidecar)? {
      debug!(path = %recorded.display(), "using recorded unpack directory");
      return Ok(recorded);
    }

    let archive_path = self.resolve_local_path();
    self.verify_checksum()?;

    let before = top_level_dirs(&self.sources_dir)?;
    archive::extract(archive_path, &self.sources_dir)?;

    let unpacked = match &self.unpack_dir {
      Some(name) => {
        let dir = self.sources_dir.join(name);
        if !dir.is_dir() {
          return Err(SourceError::MissingUnpackDir {
            archive: archive_path.to_path_buf(),
            dir,
          });
        }
        dir
      }
      None => {
        let after = top_level_dirs(&self.sources_dir)?;
        let new_dirs: Vec<PathBuf> = after.difference(&before).cloned().collect();
        match <[PathBuf; 1]>::try_from(new_dirs) {
          Ok([dir]) => dir,
          Err(new_dirs) => {
            return Err(SourceError::UnpackLayout {
              archive: archive_path.to_path_buf(),
              new_dirs,
            });
          }
        }
      }
    };

    write_atomic(&sidecar, unpacked.to_string_lossy().as_bytes())
      .map_err(|e| SourceError::io(format!("writing {}", sidecar.display()), e))?;

    info!(package = %self.package, dir = %unpacked.display(), "source unpacked");
    Ok(unpacked)
  }

  /// Fetch (if needed) and unpack, returning the source directory.
  ///
  /// The archive is only downloaded when neither it nor a sidecar record
  /// exists. An existing but corrupt archive is not downloaded again; delete it
  /// to force a new download.
  pub fn get_source(&self) -> Result<PathBuf, SourceError> {
    let _lock = DirLock::acquire(&self.sources_dir, &format!("fetch {}", self.package))?;

    if !self.sidecar_path().exists() && !self.resolve_local_path().exists() {
      self.fetch()?;
    }
    self.unpack()
  }
}

fn top_level_dirs(dir: &Path) -> Result<BTreeSet<PathBuf>, SourceError> {
  let read_err = |e| SourceError::io(format!("listing {}", dir.display()), e);

  let mut dirs = BTreeSet::new();
  for entry in fs::read_dir(dir).map_err(read_err)? {
    let entry = entry.map_err(read_err)?;
    if entry.file_type().map_err(read_err)?.is_dir() {
      dirs.insert(entry.path());
    }
  }
  Ok(dirs)
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
  let mut name = OsString::from(path.as_os_str());
  name.push(".");
  name.push(extension);
  PathBuf::from(name)
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987) takes precedence over `filename`. Only the final
/// path component is kept.
fn content_disposition_filename(header: &str) -> Option<String> {
  let mut plain = None;
  let mut extended = None;

  for param in header.split(';').map(str::trim) {
    let Some((key, value)) = param.split_once('=') else {
      continue;
    };
    let value = value.trim();
    match key.trim().to_ascii_lowercase().as_str() {
      "filename*" => {
        let encoded = value.split_once("''").map(|(_, v)| v).unwrap_or(value);
        extended = Some(percent_decode(encoded));
      }
      "filename" => plain = Some(value.trim_matches('"').to_string()),
      _ => {}
    }
  }

  let name = extended.or(plain)?;
  let name = name.rsplit(['/', '\\']).next().unwrap_or(&name);
  let sanitized = sanitize_file_name(name);
  if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
    return None;
  }
  Some(sanitized)
}

fn percent_decode(value: &str) -> String {
  let bytes = value.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' && i + 2 < bytes.len() {
      let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
        .ok()
        .and_then(|hex| u8::from_str_radix(hex, 16).ok());
      if let Some(byte) = decoded {
        out.push(byte);
        i += 3;
        continue;
      }
    }
    out.push(bytes[i]);
    i += 1;
  }
  String::from_utf8_lossy(&out).into_owned()
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to a hash of
/// the URL if no suitable filename can be extracted.
fn url_to_filename(url: &str) -> String {
  let without_query = url.split(['?', '#']).next().unwrap_or(url);
  if let Some(filename) = without_query.rsplit('/').next() {
    let sanitized = sanitize_file_name(filename);
    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  format!("download_{}", &DigestAlgorithm::Sha256.hex_digest(url.as_bytes())[..16])
}
