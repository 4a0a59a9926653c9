//! Stage sequencing.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::build::{BuildError, BuildId, Recipe, Stage, StageContext};
use crate::lock::DirLock;
use crate::util::fs::touch_marker;
use crate::workspace::Workspace;

/// A recipe bound to its build and install directories.
///
/// Stage completion is persisted as marker files, so a `Build` constructed in
/// a later process picks up where an earlier one stopped.
pub struct Build<'a, R: Recipe> {
  workspace: &'a Workspace,
  recipe: R,
  id: BuildId,
  build_dir: PathBuf,
  install_dir: PathBuf,
}

impl<'a, R: Recipe> Build<'a, R> {
  /// Compute the build identity and create the build and install directories.
  pub fn new(workspace: &'a Workspace, recipe: R) -> Result<Self, BuildError> {
    let package = recipe.package().clone();
    let id = recipe.build_id(BuildId::compute(workspace.toolchain(), &package));
    let build_dir = workspace.build_dir(&package, &id);
    let install_dir = workspace.install_dir(&package, &id);

    for dir in [&build_dir, &install_dir] {
      std::fs::create_dir_all(dir).map_err(|source| BuildError::CreateDir {
        path: dir.clone(),
        source,
      })?;
    }

    debug!(package = %package, id = %id, "build initialized");
    Ok(Self {
      workspace,
      recipe,
      id,
      build_dir,
      install_dir,
    })
  }

  pub fn id(&self) -> &BuildId {
    &self.id
  }

  pub fn recipe(&self) -> &R {
    &self.recipe
  }

  pub fn build_dir(&self) -> &Path {
    &self.build_dir
  }

  pub fn install_dir(&self) -> &Path {
    &self.install_dir
  }

  pub fn is_complete(&self, stage: Stage) -> bool {
    self.stage_dir(stage).join(stage.marker()).exists()
  }

  pub fn configure(&self) -> Result<(), BuildError> {
    self.run_stage(Stage::Configure, |ctx| self.recipe.configure(ctx))
  }

  pub fn build(&self) -> Result<(), BuildError> {
    self.run_stage(Stage::Build, |ctx| self.recipe.build(ctx))
  }

  /// Run any outstanding stages and return the install directory.
  ///
  /// Once the install marker exists it is trusted completely: configure and
  /// build are not re-checked.
  pub fn install(&self) -> Result<PathBuf, BuildError> {
    if self.is_complete(Stage::Install) {
      debug!(package = %self.recipe.package(), dir = %self.install_dir.display(), "already installed");
      return Ok(self.install_dir.clone());
    }

    self.configure()?;
    self.build()?;
    self.run_stage(Stage::Install, |ctx| self.recipe.install(ctx))?;
    Ok(self.install_dir.clone())
  }

  /// Write the import declarations for the installed package to `out`.
  pub fn export(&self, out: &mut dyn Write) -> Result<(), BuildError> {
    Ok(self.recipe.export(out, &self.install_dir)?)
  }

  fn stage_dir(&self, stage: Stage) -> &Path {
    match stage {
      Stage::Configure | Stage::Build => &self.build_dir,
      Stage::Install => &self.install_dir,
    }
  }

  fn run_stage<F>(&self, stage: Stage, action: F) -> Result<(), BuildError>
  where
    F: FnOnce(&StageContext<'_>) -> Result<(), BuildError>,
  {
    let package = self.recipe.package();
    if self.is_complete(stage) {
      debug!(package = %package, %stage, "stage already complete");
      return Ok(());
    }

    let dir = self.stage_dir(stage);
    let _lock = DirLock::acquire(dir, &format!("{} {}", stage, package))?;

    // Another process may have finished the stage while we waited.
    if self.is_complete(stage) {
      debug!(package = %package, %stage, "stage completed by another process");
      return Ok(());
    }

    info!(package = %package, %stage, id = %self.id, "running stage");
    let ctx = StageContext::new(
      self.workspace,
      self.recipe.source(),
      &self.build_dir,
      &self.install_dir,
    );
    action(&ctx)?;

    let marker = dir.join(stage.marker());
    touch_marker(&marker).map_err(|source| BuildError::WriteMarker { path: marker, source })?;
    info!(package = %package, %stage, "stage complete");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Config, IntegrityPolicy, Toolchain};
  use crate::export::ExportError;
  use crate::package::PackageId;
  use crate::source::{HttpSource, Source};
  use crate::util::testutil::test_workspace;
  use std::cell::Cell;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  /// Records how often each stage action ran; `fail_build` and `fail_install`
  /// make the matching action fail while set.
  struct CountingRecipe {
    source: Source,
    configured: Cell<usize>,
    built: Cell<usize>,
    installed: Cell<usize>,
    fail_build: Cell<bool>,
    fail_install: Cell<bool>,
  }

  impl CountingRecipe {
    fn new(ws: &Workspace) -> Self {
      let package = PackageId::new("zlib", "1.2.13").unwrap();
      let source = HttpSource::new(ws, package, "http://127.0.0.1:9/zlib-1.2.13.tar.gz", "unused");
      Self {
        source: source.into(),
        configured: Cell::new(0),
        built: Cell::new(0),
        installed: Cell::new(0),
        fail_build: Cell::new(false),
        fail_install: Cell::new(false),
      }
    }
  }

  impl Recipe for CountingRecipe {
    fn source(&self) -> &Source {
      &self.source
    }

    fn configure(&self, _ctx: &StageContext<'_>) -> Result<(), BuildError> {
      self.configured.set(self.configured.get() + 1);
      Ok(())
    }

    fn build(&self, _ctx: &StageContext<'_>) -> Result<(), BuildError> {
      self.built.set(self.built.get() + 1);
      if self.fail_build.get() {
        return Err(BuildError::CommandFailed {
          command: "make".to_string(),
          code: Some(2),
        });
      }
      Ok(())
    }

    fn install(&self, ctx: &StageContext<'_>) -> Result<(), BuildError> {
      self.installed.set(self.installed.get() + 1);
      if self.fail_install.get() {
        return Err(BuildError::CommandFailed {
          command: "make install".to_string(),
          code: Some(1),
        });
      }
      std::fs::create_dir_all(ctx.install_dir().join("lib")).map_err(|e| BuildError::io("creating lib", e))?;
      Ok(())
    }

    fn export(&self, out: &mut dyn Write, install_dir: &Path) -> Result<(), ExportError> {
      writeln!(out, "# {}", install_dir.display()).map_err(ExportError::Write)
    }
  }

  #[test]
  fn new_creates_directories_without_markers() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());

    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();

    assert!(build.build_dir().is_dir());
    assert!(build.install_dir().is_dir());
    assert!(!build.is_complete(Stage::Configure));
    assert!(!build.is_complete(Stage::Build));
    assert!(!build.is_complete(Stage::Install));
    assert_eq!(
      build.build_dir(),
      ws.root().join("build").join("zlib").join(build.id().as_str())
    );
  }

  #[test]
  fn install_runs_each_action_once() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();

    let first = build.install().unwrap();
    for _ in 0..3 {
      assert_eq!(build.install().unwrap(), first);
    }

    let recipe = build.recipe();
    assert_eq!(recipe.configured.get(), 1);
    assert_eq!(recipe.built.get(), 1);
    assert_eq!(recipe.installed.get(), 1);
    assert!(build.build_dir().join(".cpackman_configure_done").is_file());
    assert!(build.build_dir().join(".cpackman_build_done").is_file());
    assert!(first.join(".cpackman_install_done").is_file());
  }

  #[test]
  fn markers_persist_across_instances() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());

    Build::new(&ws, CountingRecipe::new(&ws)).unwrap().install().unwrap();

    let again = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();
    again.install().unwrap();
    assert_eq!(again.recipe().configured.get(), 0);
    assert_eq!(again.recipe().built.get(), 0);
    assert_eq!(again.recipe().installed.get(), 0);
  }

  #[test]
  fn install_marker_is_trusted_without_earlier_markers() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();
    build.install().unwrap();

    std::fs::remove_file(build.build_dir().join(".cpackman_configure_done")).unwrap();
    std::fs::remove_file(build.build_dir().join(".cpackman_build_done")).unwrap();

    build.install().unwrap();
    assert_eq!(build.recipe().configured.get(), 1);
    assert_eq!(build.recipe().built.get(), 1);
  }

  #[test]
  fn failed_build_is_retried_and_keeps_configure() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();
    build.recipe().fail_build.set(true);

    let err = build.install().unwrap_err();
    assert!(matches!(err, BuildError::CommandFailed { code: Some(2), .. }));
    assert!(build.is_complete(Stage::Configure));
    assert!(!build.is_complete(Stage::Build));
    assert!(!build.is_complete(Stage::Install));
    assert_eq!(build.recipe().installed.get(), 0);

    build.recipe().fail_build.set(false);
    build.install().unwrap();

    assert_eq!(build.recipe().configured.get(), 1);
    assert_eq!(build.recipe().built.get(), 2);
    assert_eq!(build.recipe().installed.get(), 1);
  }

  #[test]
  fn failed_install_keeps_build_and_is_retried() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();
    build.recipe().fail_install.set(true);

    let err = build.install().unwrap_err();
    assert!(matches!(err, BuildError::CommandFailed { code: Some(1), .. }));
    assert!(build.is_complete(Stage::Configure));
    assert!(build.is_complete(Stage::Build));
    assert!(!build.is_complete(Stage::Install));
    assert!(!build.install_dir().join(".cpackman_install_done").exists());

    build.recipe().fail_install.set(false);
    let dir = build.install().unwrap();

    assert!(dir.join(".cpackman_install_done").is_file());
    assert_eq!(build.recipe().configured.get(), 1);
    assert_eq!(build.recipe().built.get(), 1);
    assert_eq!(build.recipe().installed.get(), 2);
  }

  #[test]
  fn configure_and_build_are_individually_idempotent() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();

    build.configure().unwrap();
    build.configure().unwrap();
    build.build().unwrap();
    build.build().unwrap();

    assert_eq!(build.recipe().configured.get(), 1);
    assert_eq!(build.recipe().built.get(), 1);
    assert!(!build.is_complete(Stage::Install));
  }

  #[test]
  fn toolchains_get_disjoint_directories() {
    let temp = TempDir::new().unwrap();
    let gcc = Workspace::new(
      Config::new(temp.path(), Toolchain::new("GNU", "12.2.0", "gcc", "12.2.0")).with_integrity(IntegrityPolicy::Error),
    )
    .unwrap();
    let clang = Workspace::new(
      Config::new(temp.path(), Toolchain::new("GNU", "12.2.0", "clang", "12.2.0"))
        .with_integrity(IntegrityPolicy::Error),
    )
    .unwrap();

    let gcc_build = Build::new(&gcc, CountingRecipe::new(&gcc)).unwrap();
    let clang_build = Build::new(&clang, CountingRecipe::new(&clang)).unwrap();
    assert_ne!(gcc_build.id(), clang_build.id());
    assert_ne!(gcc_build.build_dir(), clang_build.build_dir());

    gcc_build.install().unwrap();

    assert!(gcc_build.is_complete(Stage::Install));
    assert!(!clang_build.is_complete(Stage::Configure));
    assert!(!clang_build.build_dir().join(".cpackman_build_done").exists());
    assert!(!clang_build.install_dir().join(".cpackman_install_done").exists());
  }

  #[test]
  fn export_receives_install_dir() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();
    let dir = build.install().unwrap();

    let mut out = Vec::new();
    build.export(&mut out).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), format!("# {}\n", dir.display()));
  }

  #[test]
  #[traced_test]
  fn cached_stage_is_logged() {
    let temp = TempDir::new().unwrap();
    let ws = test_workspace(temp.path());
    let build = Build::new(&ws, CountingRecipe::new(&ws)).unwrap();

    build.configure().unwrap();
    build.configure().unwrap();

    assert!(logs_contain("running stage"));
    assert!(logs_contain("stage already complete"));
  }
}
