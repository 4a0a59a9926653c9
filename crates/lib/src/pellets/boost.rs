//! Boost, built with its own `bootstrap.sh` + `b2` toolchain.
//!
//! Required and optional components are built, statically, against the zstd
//! pellet. Without components nothing is fetched, built or installed; the
//! exported `Boost_ROOT` then points at an empty prefix.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::args::FindPackageArgs;
use crate::build::{Build, BuildError, BuildId, Recipe, StageContext};
use crate::config::Toolchain;
use crate::export::ExportError;
use crate::package::PackageId;
use crate::source::{HttpSource, Source};
use crate::util::fs::write_atomic;
use crate::util::hash::DigestAlgorithm;
use crate::workspace::Workspace;

use super::PelletError;
use super::zstd::ZstdRecipe;

pub const NAME: &str = "Boost";
pub const VERSION: &str = "1.78.0";
const URL: &str = "https://boostorg.jfrog.io/artifactory/main/release/1.78.0/source/boost_1_78_0.tar.bz2";
const SHA256: &str = "8681f175d4bdb26c52222665793eef08490d7758529330f98d3b29dd0735bccc";

const USER_CONFIG: &str = "user-config.jam";

/// Compiler ids that b2 drives with its `clang` toolset.
const CLANG_COMPILER_IDS: &[&str] = &["Clang", "AppleClang", "Intel"];

#[derive(Debug)]
pub struct BoostRecipe {
  source: Source,
  args: FindPackageArgs,
  /// Required components followed by optional ones, without duplicates.
  libraries: Vec<String>,
  zstd: ZstdRecipe,
  toolset: &'static str,
  compiler: String,
  compiler_flags: String,
  linker_flags: String,
}

impl BoostRecipe {
  pub fn new(ws: &Workspace, args: FindPackageArgs) -> Result<Self, PelletError> {
    let package = PackageId::new(NAME, VERSION)?;
    let source = HttpSource::new(ws, package, URL, SHA256).with_algorithm(DigestAlgorithm::Sha256);
    let toolchain = ws.toolchain();
    let (compiler_flags, linker_flags) = b2_flags(toolchain, cfg!(target_os = "macos"));

    let mut libraries: Vec<String> = Vec::new();
    for component in args.components.iter().chain(&args.optional_components) {
      if !libraries.contains(component) {
        libraries.push(component.clone());
      }
    }

    Ok(Self {
      source: source.into(),
      args,
      libraries,
      zstd: ZstdRecipe::new(ws)?,
      toolset: toolset(toolchain),
      compiler: toolchain.cxx_compiler_path().to_string_lossy().into_owned(),
      compiler_flags,
      linker_flags,
    })
  }

  /// Every component that gets built.
  pub fn libraries(&self) -> &[String] {
    &self.libraries
  }

  pub fn toolset(&self) -> &str {
    self.toolset
  }

  fn user_config(&self, zstd_install: &Path) -> String {
    format!(
      "using {} : : {} : {} {} ;\nusing zstd : {} : <include>{} : <search>{} ;\n",
      self.toolset,
      self.compiler,
      self.compiler_flags,
      self.linker_flags,
      self.zstd.version(),
      zstd_install.join("include").display(),
      zstd_install.join("lib").display(),
    )
  }
}

fn toolset(toolchain: &Toolchain) -> &'static str {
  if CLANG_COMPILER_IDS.contains(&toolchain.cxx_compiler_id.as_str()) {
    "clang"
  } else {
    "gcc"
  }
}

/// `<cxxflags>` and `<linkflags>` features for the b2 toolset declaration.
fn b2_flags(toolchain: &Toolchain, macos: bool) -> (String, String) {
  let mut compiler_flags = vec!["-fvisibility=hidden", "-fPIC", "-std=c++17", "-w"];
  let mut linker_flags = Vec::new();

  if macos || toolchain.cxx_stdlib.as_deref() == Some("libc++") {
    compiler_flags.extend(["-stdlib=libc++", "-nostdlib++"]);
    linker_flags.extend(["-lc++", "-lc++abi"]);
    if !macos {
      linker_flags.push("-static-libgcc");
    }
  }

  let feature = |name: &str, flags: &[&str]| {
    flags
      .iter()
      .map(|flag| format!("<{}>{}", name, flag))
      .collect::<Vec<_>>()
      .join(" ")
  };
  (feature("cxxflags", &compiler_flags), feature("linkflags", &linker_flags))
}

impl Recipe for BoostRecipe {
  fn source(&self) -> &Source {
    &self.source
  }

  /// Toolset, components, flags and compiler all change the produced
  /// libraries.
  fn build_id(&self, base: BuildId) -> BuildId {
    let mut parts = vec![self.toolset.to_string()];
    parts.extend(self.libraries.iter().cloned());
    parts.push(self.compiler_flags.clone());
    parts.push(self.linker_flags.clone());
    parts.push(self.compiler.clone());
    base.extend(&parts)
  }

  fn configure(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    if self.libraries.is_empty() {
      debug!("no Boost components requested, skipping bootstrap");
      return Ok(());
    }

    let source = ctx.source_dir()?;
    ctx.run(
      &[
        source.join("bootstrap.sh").to_string_lossy().into_owned(),
        format!("--with-libraries={}", self.libraries.join(",")),
        format!("--with-toolset={}", self.toolset),
      ],
      ctx.build_dir(),
    )
  }

  fn build(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
    if self.libraries.is_empty() {
      return Ok(());
    }

    let zstd_install = Build::new(ctx.workspace(), &self.zstd)?.install()?;

    let jam = ctx.build_dir().join(USER_CONFIG);
    write_atomic(&jam, self.user_config(&zstd_install).as_bytes())
      .map_err(|e| BuildError::io(format!("writing {}", jam.display()), e))?;

    let mut cmd = vec![
      ctx.build_dir().join("b2").to_string_lossy().into_owned(),
      "link=static".to_string(),
      format!("--prefix={}", ctx.install_dir().display()),
      format!("--user-config={}", jam.display()),
    ];
    cmd.extend(self.libraries.iter().map(|c| format!("--with-{}", c)));
    cmd.push("install".to_string());

    ctx.run(&cmd, &ctx.source_dir()?)
  }

  /// `b2 install` already populated the prefix during the build stage.
  fn install(&self, _ctx: &StageContext<'_>) -> Result<(), BuildError> {
    Ok(())
  }

  fn export(&self, out: &mut dyn Write, install_dir: &Path) -> Result<(), ExportError> {
    let version = self.args.version.as_deref().unwrap_or(VERSION);
    let mut components = self.args.components.join(" ");
    if !self.args.optional_components.is_empty() {
      components.push_str(" OPTIONAL_COMPONENTS ");
      components.push_str(&self.args.optional_components.join(" "));
    }
    write!(
      out,
      "set(Boost_ROOT \"{}\")\nfind_package(Boost {} EXACT REQUIRED COMPONENTS {} CONFIG BYPASS_PROVIDER)\n",
      install_dir.display(),
      version,
      components,
    )
    .map_err(ExportError::Write)
  }
}
