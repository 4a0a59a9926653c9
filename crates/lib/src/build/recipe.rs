//! The pluggable half of a build: what a package does at each stage.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::build::{BuildError, BuildId, command};
use crate::config::Toolchain;
use crate::export::ExportError;
use crate::package::PackageId;
use crate::source::Source;
use crate::workspace::Workspace;

/// Stage actions and export for one package.
///
/// The pipeline decides *whether* a stage runs; the recipe decides *what*
/// running it means. Stage actions may be invoked again after a failure, so
/// they must tolerate a partially populated build directory.
pub trait Recipe {
  fn source(&self) -> &Source;

  fn package(&self) -> &PackageId {
    self.source().package()
  }

  /// Cache key for this recipe's build and install directories.
  ///
  /// Recipes whose output depends on more than the toolchain and package
  /// identity fold the extra inputs in with [`BuildId::extend`].
  fn build_id(&self, base: BuildId) -> BuildId {
    base
  }

  fn configure(&self, ctx: &StageContext<'_>) -> Result<(), BuildError>;

  fn build(&self, ctx: &StageContext<'_>) -> Result<(), BuildError>;

  fn install(&self, ctx: &StageContext<'_>) -> Result<(), BuildError>;

  /// Describe the installed package to the consuming build system.
  fn export(&self, out: &mut dyn Write, install_dir: &Path) -> Result<(), ExportError>;
}

impl<R: Recipe + ?Sized> Recipe for &R {
  fn source(&self) -> &Source {
    (**self).source()
  }

  fn build_id(&self, base: BuildId) -> BuildId {
    (**self).build_id(base)
  }

  fn configure(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    (**self).configure(ctx)
  }

  fn build(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    (**self).build(ctx)
  }

  fn install(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    (**self).install(ctx)
  }

  fn export(&self, out: &mut dyn Write, install_dir: &Path) -> Result<(), ExportError> {
    (**self).export(out, install_dir)
  }
}

/// What a stage action gets to work with.
pub struct StageContext<'a> {
  workspace: &'a Workspace,
  source: &'a Source,
  build_dir: &'a Path,
  install_dir: &'a Path,
}

impl<'a> StageContext<'a> {
  pub(crate) fn new(workspace: &'a Workspace, source: &'a Source, build_dir: &'a Path, install_dir: &'a Path) -> Self {
    Self {
      workspace,
      source,
      build_dir,
      install_dir,
    }
  }

  pub fn workspace(&self) -> &'a Workspace {
    self.workspace
  }

  pub fn toolchain(&self) -> &'a Toolchain {
    self.workspace.toolchain()
  }

  pub fn build_dir(&self) -> &'a Path {
    self.build_dir
  }

  pub fn install_dir(&self) -> &'a Path {
    self.install_dir
  }

  /// The unpacked source tree, acquiring it on first use.
  pub fn source_dir(&self) -> Result<PathBuf, BuildError> {
    Ok(self.source.get_source()?)
  }

  /// Variables added to the inherited environment of every command: `CC` and
  /// `CXX` point at the configured compilers.
  pub fn env(&self) -> BTreeMap<String, String> {
    let toolchain = self.toolchain();
    BTreeMap::from([
      ("CC".to_string(), toolchain.c_compiler_path().to_string_lossy().into_owned()),
      ("CXX".to_string(), toolchain.cxx_compiler_path().to_string_lossy().into_owned()),
    ])
  }

  /// Run a command in `cwd` with [`StageContext::env`].
  pub fn run<S: AsRef<str>>(&self, cmd: &[S], cwd: &Path) -> Result<(), BuildError> {
    command::run_command(cmd, &self.env(), cwd)
  }
}
