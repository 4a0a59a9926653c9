//! Shared helpers for pipeline integration tests.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use cpackman_lib::build::{BuildError, Recipe, StageContext};
use cpackman_lib::export::{ExportError, LinkLanguage, add_static_library};
use cpackman_lib::util::hash::DigestAlgorithm;
use cpackman_lib::{Config, HttpSource, IntegrityPolicy, PackageId, Source, Toolchain, Workspace};
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

/// A `.tar.gz` whose entries all live under `top/`.
pub fn tar_gz(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
  let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
  for (name, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
      .append_data(&mut header, format!("{}/{}", top, name), content.as_bytes())
      .unwrap();
  }
  let mut encoder = builder.into_inner().unwrap();
  encoder.flush().unwrap();
  encoder.finish().unwrap()
}

pub fn zlib_archive() -> Vec<u8> {
  tar_gz(
    "zlib-1.2.13",
    &[
      ("zlib.h", "#define ZLIB_VERSION \"1.2.13\"\n"),
      ("zconf.h", "/* zconf */\n"),
    ],
  )
}

pub fn sha1(data: &[u8]) -> String {
  DigestAlgorithm::Sha1.hex_digest(data)
}

/// Isolated working root.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> PathBuf {
    self.temp.path().join("cpackman")
  }

  pub fn workspace(&self, toolchain: Toolchain) -> Workspace {
    Workspace::new(Config::new(self.root(), toolchain).with_integrity(IntegrityPolicy::Error)).unwrap()
  }

  /// Scratch file outside the working root.
  pub fn scratch(&self, name: &str) -> PathBuf {
    self.temp.path().join(name)
  }
}

pub fn gcc() -> Toolchain {
  Toolchain::new("GNU", "12.2.0", "gcc", "12.2.0")
}

pub fn clang() -> Toolchain {
  Toolchain::new("GNU", "12.2.0", "clang", "12.2.0")
}

pub fn zlib() -> PackageId {
  PackageId::new("zlib", "1.2.13").unwrap()
}

/// Recipe driven by shell scripts.
///
/// Each stage appends its name to `log` so tests can count executions. The
/// build stage fails while `fail_flag` exists, the install stage while
/// `install_fail_flag` does.
pub struct ShellRecipe {
  pub source: Source,
  pub log: PathBuf,
  pub fail_flag: PathBuf,
  pub install_fail_flag: PathBuf,
}

impl ShellRecipe {
  pub fn new(ws: &Workspace, url: &str, checksum: &str, env: &TestEnv) -> Self {
    Self {
      source: HttpSource::new(ws, zlib(), url, checksum).into(),
      log: env.scratch("stages.log"),
      fail_flag: env.scratch("fail-build"),
      install_fail_flag: env.scratch("fail-install"),
    }
  }

  pub fn runs(&self, stage: &str) -> usize {
    std::fs::read_to_string(&self.log)
      .map(|log| log.lines().filter(|line| *line == stage).count())
      .unwrap_or(0)
  }

  fn sh(&self, ctx: &StageContext<'_>, script: &str, cwd: &Path) -> Result<(), BuildError> {
    ctx.run(&["/bin/sh", "-c", script], cwd)
  }
}

impl Recipe for ShellRecipe {
  fn source(&self) -> &Source {
    &self.source
  }

  fn configure(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    let source = ctx.source_dir()?;
    let script = format!(
      "echo configure >> '{}' && cp '{}/zlib.h' zlib.h.in",
      self.log.display(),
      source.display()
    );
    self.sh(ctx, &script, ctx.build_dir())
  }

  fn build(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    let script = format!(
      "echo build >> '{log}' && if [ -e '{flag}' ]; then exit 7; fi && printf 'archive' > libz.a",
      log = self.log.display(),
      flag = self.fail_flag.display()
    );
    self.sh(ctx, &script, ctx.build_dir())
  }

  fn install(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    let script = format!(
      "echo install >> '{log}' && if [ -e '{flag}' ]; then exit 9; fi && mkdir -p '{dest}/include' '{dest}/lib' && cp zlib.h.in '{dest}/include/zlib.h' && cp libz.a '{dest}/lib/libz.a'",
      log = self.log.display(),
      flag = self.install_fail_flag.display(),
      dest = ctx.install_dir().display()
    );
    self.sh(ctx, &script, ctx.build_dir())
  }

  fn export(&self, out: &mut dyn std::io::Write, install_dir: &Path) -> Result<(), ExportError> {
    add_static_library(
      out,
      "ZLIB::ZLIB",
      &[install_dir.join("include")],
      &install_dir.join("lib").join("libz.a"),
      LinkLanguage::C,
    )
  }
}
