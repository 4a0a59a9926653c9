//! The working root and the directory trees derived from it.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── sources/                         # archives, sidecars, unpacked trees
//! │   ├── <archive>
//! │   ├── <archive>.dn
//! │   ├── <unpacked-dir>/
//! │   └── .git/<name>-<url>.git        # bare mirrors for git sources
//! ├── build/<package-name>/<build-id>/ # configure + build markers
//! └── install/<package-name>/<build-id>/
//! ```
//!
//! Every component receives the `Workspace` explicitly; nothing is resolved
//! against the current directory after construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::build::BuildId;
use crate::config::{Config, IntegrityPolicy, Toolchain};
use crate::consts::{BUILD_DIR, INSTALL_DIR, SOURCES_DIR, USER_AGENT};
use crate::package::PackageId;

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("failed to create directory {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to initialize HTTP client: {0}")]
  HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct Workspace {
  root: PathBuf,
  toolchain: Toolchain,
  integrity: IntegrityPolicy,
  http: reqwest::blocking::Client,
}

impl Workspace {
  /// Create the workspace, making sure `<root>/sources` exists.
  ///
  /// The root is canonicalized so that every derived path, including the ones
  /// persisted in sidecar records, is absolute.
  pub fn new(config: Config) -> Result<Self, WorkspaceError> {
    let sources = config.root.join(SOURCES_DIR);
    std::fs::create_dir_all(&sources).map_err(|source| WorkspaceError::CreateDir {
      path: sources.clone(),
      source,
    })?;

    let root = dunce::canonicalize(&config.root).map_err(|source| WorkspaceError::CreateDir {
      path: config.root.clone(),
      source,
    })?;
    debug!(root = %root.display(), "workspace ready");

    let http = reqwest::blocking::Client::builder()
      .user_agent(USER_AGENT)
      .connect_timeout(Duration::from_secs(30))
      .timeout(None)
      .build()?;

    Ok(Self {
      root,
      toolchain: config.toolchain,
      integrity: config.integrity,
      http,
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn toolchain(&self) -> &Toolchain {
    &self.toolchain
  }

  pub fn integrity(&self) -> IntegrityPolicy {
    self.integrity
  }

  pub fn http(&self) -> &reqwest::blocking::Client {
    &self.http
  }

  pub fn sources_dir(&self) -> PathBuf {
    self.root.join(SOURCES_DIR)
  }

  /// `<root>/build/<package-name>/<build-id>`
  pub fn build_dir(&self, package: &PackageId, id: &BuildId) -> PathBuf {
    self.root.join(BUILD_DIR).join(package.name()).join(id.as_str())
  }

  /// `<root>/install/<package-name>/<build-id>`
  pub fn install_dir(&self, package: &PackageId, id: &BuildId) -> PathBuf {
    self.root.join(INSTALL_DIR).join(package.name()).join(id.as_str())
  }
}
