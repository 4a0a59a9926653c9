//! Zstandard, built as a static library with its CMake project.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::build::{BuildError, Recipe, StageContext};
use crate::export::{ExportError, LinkLanguage, add_static_library};
use crate::package::PackageId;
use crate::source::{HttpSource, Source};
use crate::util::hash::DigestAlgorithm;
use crate::workspace::Workspace;

use super::PelletError;

pub const NAME: &str = "zstd";
pub const VERSION: &str = "1.5.2";
const URL: &str = "https://github.com/facebook/zstd/releases/download/v1.5.2/zstd-1.5.2.tar.gz";
const SHA256: &str = "7c42d56fac126929a6a85dbc73ff1db2411d04f104fae9bdea51305663a83fd0";

pub const TARGET: &str = "zstd::libzstd_static";

#[cfg(not(windows))]
const LIBRARY_FILE: &str = "libzstd.a";
#[cfg(windows)]
const LIBRARY_FILE: &str = "zstd_static.lib";

#[derive(Debug)]
pub struct ZstdRecipe {
  source: Source,
}

impl ZstdRecipe {
  pub fn new(ws: &Workspace) -> Result<Self, PelletError> {
    let package = PackageId::new(NAME, VERSION)?;
    let source = HttpSource::new(ws, package, URL, SHA256).with_algorithm(DigestAlgorithm::Sha256);
    Ok(Self { source: source.into() })
  }

  pub fn version(&self) -> &str {
    self.source.package().version()
  }

  pub fn library_path(install_dir: &Path) -> PathBuf {
    install_dir.join("lib").join(LIBRARY_FILE)
  }
}

impl Recipe for ZstdRecipe {
  fn source(&self) -> &Source {
    &self.source
  }

  fn configure(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    let project = ctx.source_dir()?.join("build").join("cmake");
    let toolchain = ctx.toolchain();

    ctx.run(
      &[
        "cmake".to_string(),
        "-S".to_string(),
        project.to_string_lossy().into_owned(),
        "-B".to_string(),
        ctx.build_dir().to_string_lossy().into_owned(),
        format!("-DCMAKE_INSTALL_PREFIX={}", ctx.install_dir().display()),
        format!("-DCMAKE_C_COMPILER={}", toolchain.c_compiler_path().display()),
        format!("-DCMAKE_CXX_COMPILER={}", toolchain.cxx_compiler_path().display()),
        "-DCMAKE_BUILD_TYPE=Release".to_string(),
        "-DCMAKE_POSITION_INDEPENDENT_CODE=ON".to_string(),
        "-DZSTD_BUILD_PROGRAMS=OFF".to_string(),
        "-DZSTD_BUILD_TESTS=OFF".to_string(),
        "-DZSTD_BUILD_SHARED=OFF".to_string(),
        "-DZSTD_BUILD_STATIC=ON".to_string(),
      ],
      ctx.build_dir(),
    )
  }

  fn build(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    let build_dir = ctx.build_dir().to_string_lossy().into_owned();
    ctx.run(&["cmake", "--build", build_dir.as_str(), "--config", "Release"], ctx.build_dir())
  }

  fn install(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    let build_dir = ctx.build_dir().to_string_lossy().into_owned();
    ctx.run(&["cmake", "--install", build_dir.as_str(), "--config", "Release"], ctx.build_dir())
  }

  fn export(&self, out: &mut dyn Write, install_dir: &Path) -> Result<(), ExportError> {
    add_static_library(
      out,
      TARGET,
      &[install_dir.join("include")],
      &Self::library_path(install_dir),
      LinkLanguage::C,
    )
  }
}
