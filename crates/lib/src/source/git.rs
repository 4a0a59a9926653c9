//! Sources exported from a git repository at a fixed revision.
//!
//! Each repository URL is mirrored once, bare, under
//! `sources/.git/<name>-<url digest>.git`. The requested revision is resolved
//! to a commit and its tree is written to `sources/<name>-<commit prefix>`. The
//! mirror is only fetched again when the revision cannot be resolved locally.

use std::fs;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{GIT_MIRRORS_DIR, GIT_REV_PREFIX_LEN, SIDECAR_EXTENSION};
use crate::lock::DirLock;
use crate::package::PackageId;
use crate::source::{SourceError, read_sidecar, sanitize_file_name};
use crate::util::fs::write_atomic;
use crate::util::hash::DigestAlgorithm;
use crate::workspace::Workspace;

/// Hex digits of a digest used to tell URLs and revisions apart in file names.
const KEY_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum GitError {
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to open repository at '{}': {source}", .path.display())]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  #[error("failed to fetch from '{url}': {source}")]
  Fetch {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("no remote configured for repository")]
  NoRemote,

  #[error("revision '{rev}' not found in repository")]
  RevisionNotFound { rev: String },

  #[error("failed to read {what} for revision '{rev}': {source}")]
  Object {
    rev: String,
    what: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

/// Source tree at `rev` of the repository at `url`.
///
/// `rev` should name a commit or a tag. A branch name works but is pinned to
/// whatever commit it pointed at the first time it was exported.
#[derive(Debug, Clone)]
pub struct GitSource {
  package: PackageId,
  url: String,
  rev: String,
  sources_dir: PathBuf,
}

impl GitSource {
  pub fn new(ws: &Workspace, package: PackageId, url: impl Into<String>, rev: impl Into<String>) -> Self {
    Self {
      package,
      url: url.into(),
      rev: rev.into(),
      sources_dir: ws.sources_dir(),
    }
  }

  pub fn package(&self) -> &PackageId {
    &self.package
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn rev(&self) -> &str {
    &self.rev
  }

  /// `sources/.git/<name>-<url digest>.git`
  ///
  /// Two URLs for the same package (say upstream and a fork) get separate
  /// mirrors.
  pub fn mirror_path(&self) -> PathBuf {
    let url_key = short_digest(&[self.url.as_str()]);
    self
      .sources_dir
      .join(GIT_MIRRORS_DIR)
      .join(format!("{}-{}.git", self.package.name(), url_key))
  }

  /// `sources/<name>@<rev>-<digest of url and rev>.dn`
  ///
  /// The revision is sanitized for readability only; the digest covers the raw
  /// revision and the URL.
  pub fn sidecar_path(&self) -> PathBuf {
    self.sources_dir.join(format!("{}.{}", self.export_key(), SIDECAR_EXTENSION))
  }

  fn export_key(&self) -> String {
    format!(
      "{}@{}-{}",
      self.package.name(),
      sanitize_file_name(&self.rev),
      short_digest(&[self.url.as_str(), self.rev.as_str()])
    )
  }

  /// Export the revision (mirroring the repository if needed) and return the
  /// exported directory.
  pub fn get_source(&self) -> Result<PathBuf, SourceError> {
    let _lock = DirLock::acquire(&self.sources_dir, &format!("fetch {}", self.package))?;

    let sidecar = self.sidecar_path();
    if let Some(recorded) = read_sidecar(&sidecar)? {
      debug!(path = %recorded.display(), "using recorded export directory");
      return Ok(recorded);
    }

    let repo = self.open_or_clone()?;
    let commit = match resolve_commit(&repo, &self.rev) {
      Ok(commit) => commit,
      Err(GitError::RevisionNotFound { .. }) => {
        fetch_updates(&repo, &self.url)?;
        resolve_commit(&repo, &self.rev)?
      }
      Err(e) => return Err(e.into()),
    };
    debug!(rev = %self.rev, commit = %commit, "resolved revision");

    let hex = commit.to_string();
    let dest = self
      .sources_dir
      .join(format!("{}-{}", self.package.name(), &hex[..GIT_REV_PREFIX_LEN]));

    if dest.is_dir() {
      debug!(path = %dest.display(), "commit already exported");
    } else {
      self.export(&repo, commit, &dest)?;
    }

    write_atomic(&sidecar, dest.to_string_lossy().as_bytes())
      .map_err(|e| SourceError::io(format!("writing {}", sidecar.display()), e))?;

    info!(package = %self.package, rev = %self.rev, dir = %dest.display(), "source exported");
    Ok(dest)
  }

  fn open_or_clone(&self) -> Result<gix::Repository, SourceError> {
    let mirror = self.mirror_path();

    if mirror.is_dir() {
      debug!(path = %mirror.display(), "opening existing mirror");
      let repo = gix::open(&mirror).map_err(|e| GitError::Open {
        path: mirror.clone(),
        source: Box::new(e),
      })?;
      return Ok(repo);
    }

    let parent = mirror.parent().unwrap_or(&self.sources_dir);
    fs::create_dir_all(parent).map_err(|e| SourceError::io(format!("creating {}", parent.display()), e))?;

    info!(url = %self.url, path = %mirror.display(), "mirroring repository");
    Ok(clone_bare(&self.url, &mirror)?)
  }

  /// Write the commit's tree to a temporary sibling of `dest`, then move it
  /// into place.
  fn export(&self, repo: &gix::Repository, commit: gix::ObjectId, dest: &Path) -> Result<(), SourceError> {
    let staging = self.sources_dir.join(format!(".{}.tmp", self.export_key()));
    if staging.exists() {
      fs::remove_dir_all(&staging).map_err(|e| SourceError::io(format!("removing {}", staging.display()), e))?;
    }

    let object_err = |what: &'static str, e: Box<dyn std::error::Error + Send + Sync>| GitError::Object {
      rev: self.rev.clone(),
      what,
      source: e,
    };

    let tree = repo
      .find_object(commit)
      .map_err(|e| object_err("commit", Box::new(e)))?
      .peel_to_commit()
      .map_err(|e| object_err("commit", Box::new(e)))?
      .tree()
      .map_err(|e| object_err("tree", Box::new(e)))?;

    fs::create_dir_all(&staging).map_err(|e| SourceError::io(format!("creating {}", staging.display()), e))?;
    write_tree(&tree, &staging, &self.rev)?;

    fs::rename(&staging, dest).map_err(|e| SourceError::io(format!("moving export to {}", dest.display()), e))?;
    Ok(())
  }
}

/// First hex digits of the SHA-1 over `parts`, each terminated by a NUL byte.
fn short_digest(parts: &[&str]) -> String {
  let mut data = Vec::new();
  for part in parts {
    data.extend_from_slice(part.as_bytes());
    data.push(0);
  }
  let mut hex = DigestAlgorithm::Sha1.hex_digest(&data);
  hex.truncate(KEY_LEN);
  hex
}

fn clone_bare(url: &str, dest: &Path) -> Result<gix::Repository, GitError> {
  let mut prepared = gix::prepare_clone_bare(url, dest).map_err(|e| GitError::Clone {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  let (repo, _outcome) = prepared
    .fetch_only(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| GitError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(repo)
}

fn fetch_updates(repo: &gix::Repository, url: &str) -> Result<(), GitError> {
  debug!(url, "fetching updates");

  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or(GitError::NoRemote)?
    .map_err(|e| GitError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| GitError::Fetch {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| GitError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| GitError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

/// Resolve `rev` to the commit it names, peeling annotated tags.
fn resolve_commit(repo: &gix::Repository, rev: &str) -> Result<gix::ObjectId, GitError> {
  let not_found = || GitError::RevisionNotFound { rev: rev.to_string() };

  let spec = repo.rev_parse(rev).map_err(|_| not_found())?;
  let id = spec.single().ok_or_else(|| GitError::RevisionNotFound {
    rev: format!("{} (ambiguous)", rev),
  })?;

  let commit = id
    .object()
    .map_err(|_| not_found())?
    .peel_to_commit()
    .map_err(|e| GitError::Object {
      rev: rev.to_string(),
      what: "commit",
      source: Box::new(e),
    })?;

  Ok(commit.id)
}

fn write_tree(tree: &gix::Tree<'_>, dir: &Path, rev: &str) -> Result<(), SourceError> {
  use gix::objs::tree::EntryKind;

  let object_err = |what: &'static str, e: Box<dyn std::error::Error + Send + Sync>| GitError::Object {
    rev: rev.to_string(),
    what,
    source: e,
  };

  for entry in tree.iter() {
    let entry = entry.map_err(|e| object_err("tree entry", Box::new(e)))?;
    let name = entry.filename().to_string();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
      debug!(name = %name, "skipping unsafe tree entry");
      continue;
    }
    let path = dir.join(&name);

    match entry.mode().kind() {
      EntryKind::Tree => {
        let subtree = entry
          .object()
          .map_err(|e| object_err("tree", Box::new(e)))?
          .peel_to_tree()
          .map_err(|e| object_err("tree", Box::new(e)))?;
        fs::create_dir(&path).map_err(|e| SourceError::io(format!("creating {}", path.display()), e))?;
        write_tree(&subtree, &path, rev)?;
      }
      kind @ (EntryKind::Blob | EntryKind::BlobExecutable) => {
        let blob = entry.object().map_err(|e| object_err("blob", Box::new(e)))?;
        fs::write(&path, &blob.data).map_err(|e| SourceError::io(format!("writing {}", path.display()), e))?;
        if kind == EntryKind::BlobExecutable {
          set_executable(&path)?;
        }
      }
      EntryKind::Link => {
        let target = entry.object().map_err(|e| object_err("link", Box::new(e)))?;
        write_link(&path, &target.data)?;
      }
      EntryKind::Commit => {
        debug!(path = %path.display(), "skipping submodule");
      }
    }
  }

  Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), SourceError> {
  use std::os::unix::fs::PermissionsExt;

  fs::set_permissions(path, fs::Permissions::from_mode(0o755))
    .map_err(|e| SourceError::io(format!("setting permissions on {}", path.display()), e))
}

#[cfg(windows)]
fn set_executable(_path: &Path) -> Result<(), SourceError> {
  Ok(())
}

#[cfg(unix)]
fn write_link(path: &Path, target: &[u8]) -> Result<(), SourceError> {
  use std::ffi::OsStr;
  use std::os::unix::ffi::OsStrExt;

  std::os::unix::fs::symlink(OsStr::from_bytes(target), path)
    .map_err(|e| SourceError::io(format!("creating symlink {}", path.display()), e))
}

/// Symlinks are written as regular files holding the link target.
#[cfg(windows)]
fn write_link(path: &Path, target: &[u8]) -> Result<(), SourceError> {
  fs::write(path, target).map_err(|e| SourceError::io(format!("writing {}", path.display()), e))
}
