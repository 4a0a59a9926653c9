//! Pellets: the packages cpackman knows how to provide.
//!
//! A pellet is a [`Recipe`] for one third-party package. [`Pellet`] selects
//! one by name so callers (the CLI, the CMake dependency provider) can drive
//! any of them through a single [`Build`].

pub mod boost;
pub mod zstd;

use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::args::FindPackageArgs;
use crate::build::{Build, BuildError, BuildId, Recipe, StageContext};
use crate::export::ExportError;
use crate::package::PackageError;
use crate::source::Source;
use crate::workspace::Workspace;

use boost::BoostRecipe;
use zstd::ZstdRecipe;

#[derive(Debug, Error)]
pub enum PelletError {
  #[error("unknown package '{}', available: {}", .0, available().join(", "))]
  Unknown(String),

  #[error("find_package arguments must start with a package name")]
  MissingPackageName,

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Build(#[from] BuildError),
}

/// Names accepted by [`Pellet::new`].
pub fn available() -> Vec<&'static str> {
  vec![boost::NAME, zstd::NAME]
}

#[derive(Debug)]
pub enum Pellet {
  Zstd(ZstdRecipe),
  Boost(BoostRecipe),
}

impl Pellet {
  /// Select the pellet called `name` (case-insensitive).
  pub fn new(ws: &Workspace, name: &str, args: FindPackageArgs) -> Result<Self, PelletError> {
    if name.eq_ignore_ascii_case(zstd::NAME) {
      Ok(Pellet::Zstd(ZstdRecipe::new(ws)?))
    } else if name.eq_ignore_ascii_case(boost::NAME) {
      Ok(Pellet::Boost(BoostRecipe::new(ws, args)?))
    } else {
      Err(PelletError::Unknown(name.to_string()))
    }
  }

  fn recipe(&self) -> &dyn Recipe {
    match self {
      Pellet::Zstd(recipe) => recipe,
      Pellet::Boost(recipe) => recipe,
    }
  }
}

impl Recipe for Pellet {
  fn source(&self) -> &Source {
    self.recipe().source()
  }

  fn build_id(&self, base: BuildId) -> BuildId {
    self.recipe().build_id(base)
  }

  fn configure(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    self.recipe().configure(ctx)
  }

  fn build(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    self.recipe().build(ctx)
  }

  fn install(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    self.recipe().install(ctx)
  }

  fn export(&self, out: &mut dyn Write, install_dir: &Path) -> Result<(), ExportError> {
    self.recipe().export(out, install_dir)
  }
}

/// Install the pellet `name` and write its import declarations to `out`.
///
/// `args` are the `find_package` arguments, starting with the package name;
/// when empty, `name` alone is used.
pub fn provide_module<S: AsRef<str>>(
  ws: &Workspace,
  name: &str,
  args: &[S],
  out: &mut dyn Write,
) -> Result<(), PelletError> {
  let args = if args.is_empty() {
    FindPackageArgs::parse(&[name])?
  } else {
    FindPackageArgs::parse(args)?
  };

  let build = Build::new(ws, Pellet::new(ws, name, args)?)?;
  let install_dir = build.install()?;
  info!(package = %build.recipe().package(), dir = %install_dir.display(), "package provided");
  build.export(out)?;
  Ok(())
}
