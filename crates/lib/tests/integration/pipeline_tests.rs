//! End-to-end fetch → configure → build → install runs.

use std::fs;

use cpackman_lib::build::Stage;
use cpackman_lib::{Build, BuildError, BuildId};

use super::common::{ShellRecipe, TestEnv, clang, gcc, sha1, zlib, zlib_archive};

struct Server {
  server: mockito::ServerGuard,
  _mocks: Vec<mockito::Mock>,
  archive: Vec<u8>,
}

impl Server {
  fn start() -> Self {
    let archive = zlib_archive();
    let mut server = mockito::Server::new();
    let mocks = vec![
      server.mock("HEAD", "/zlib-1.2.13.tar.gz").with_status(200).create(),
      server
        .mock("GET", "/zlib-1.2.13.tar.gz")
        .with_status(200)
        .with_body(&archive)
        .create(),
    ];
    Self {
      server,
      _mocks: mocks,
      archive,
    }
  }

  fn url(&self) -> String {
    format!("{}/zlib-1.2.13.tar.gz", self.server.url())
  }

  fn checksum(&self) -> String {
    sha1(&self.archive)
  }
}

#[test]
fn install_runs_every_stage_once() {
  let env = TestEnv::new();
  let server = Server::start();
  let ws = env.workspace(gcc());
  let build = Build::new(&ws, ShellRecipe::new(&ws, &server.url(), &server.checksum(), &env)).unwrap();

  let first = build.install().unwrap();
  for _ in 0..3 {
    assert_eq!(build.install().unwrap(), first);
  }

  let recipe = build.recipe();
  assert_eq!(recipe.runs("configure"), 1);
  assert_eq!(recipe.runs("build"), 1);
  assert_eq!(recipe.runs("install"), 1);
  assert_eq!(
    fs::read_to_string(first.join("include/zlib.h")).unwrap(),
    "#define ZLIB_VERSION \"1.2.13\"\n"
  );
  assert_eq!(first, ws.install_dir(&zlib(), build.id()));
}

#[test]
fn later_process_reuses_completed_install() {
  let env = TestEnv::new();
  let server = Server::start();
  let ws = env.workspace(gcc());

  let first = Build::new(&ws, ShellRecipe::new(&ws, &server.url(), &server.checksum(), &env))
    .unwrap()
    .install()
    .unwrap();

  let again = Build::new(&ws, ShellRecipe::new(&ws, &server.url(), &server.checksum(), &env)).unwrap();
  assert_eq!(again.install().unwrap(), first);
  assert_eq!(again.recipe().runs("install"), 1);
}

#[test]
fn failed_build_is_retried() {
  let env = TestEnv::new();
  let server = Server::start();
  let ws = env.workspace(gcc());
  let build = Build::new(&ws, ShellRecipe::new(&ws, &server.url(), &server.checksum(), &env)).unwrap();
  fs::write(&build.recipe().fail_flag, "").unwrap();

  let err = build.install().unwrap_err();
  assert!(matches!(err, BuildError::CommandFailed { code: Some(7), .. }));
  assert!(build.is_complete(Stage::Configure));
  assert!(!build.is_complete(Stage::Build));
  assert!(!build.is_complete(Stage::Install));

  fs::remove_file(&build.recipe().fail_flag).unwrap();
  build.build().unwrap();
  assert!(build.is_complete(Stage::Build));

  build.install().unwrap();
  let recipe = build.recipe();
  assert_eq!(recipe.runs("configure"), 1);
  assert_eq!(recipe.runs("build"), 2);
  assert_eq!(recipe.runs("install"), 1);
}

#[test]
fn failed_install_is_retried_without_rebuilding() {
  let env = TestEnv::new();
  let server = Server::start();
  let ws = env.workspace(gcc());
  let build = Build::new(&ws, ShellRecipe::new(&ws, &server.url(), &server.checksum(), &env)).unwrap();
  fs::write(&build.recipe().install_fail_flag, "").unwrap();

  let err = build.install().unwrap_err();
  assert!(matches!(err, BuildError::CommandFailed { code: Some(9), .. }));
  assert!(build.is_complete(Stage::Configure));
  assert!(build.is_complete(Stage::Build));
  assert!(!build.is_complete(Stage::Install));
  assert!(build.build_dir().join("libz.a").is_file());

  fs::remove_file(&build.recipe().install_fail_flag).unwrap();
  let dir = build.install().unwrap();
  assert!(dir.join("lib").join("libz.a").is_file());

  let recipe = build.recipe();
  assert_eq!(recipe.runs("configure"), 1);
  assert_eq!(recipe.runs("build"), 1);
  assert_eq!(recipe.runs("install"), 2);
}

#[test]
fn gcc_and_clang_builds_do_not_interfere() {
  let env = TestEnv::new();
  let server = Server::start();
  let gcc_ws = env.workspace(gcc());
  let clang_ws = env.workspace(clang());

  let gcc_build = Build::new(&gcc_ws, ShellRecipe::new(&gcc_ws, &server.url(), &server.checksum(), &env)).unwrap();
  let clang_build =
    Build::new(&clang_ws, ShellRecipe::new(&clang_ws, &server.url(), &server.checksum(), &env)).unwrap();

  assert_ne!(gcc_build.id(), clang_build.id());
  assert_eq!(gcc_build.id(), &BuildId::compute(&gcc(), &zlib()));
  assert_ne!(gcc_build.build_dir(), clang_build.build_dir());
  assert_ne!(gcc_build.install_dir(), clang_build.install_dir());

  gcc_build.install().unwrap();

  for stage in [Stage::Configure, Stage::Build, Stage::Install] {
    assert!(gcc_build.is_complete(stage));
    assert!(!clang_build.is_complete(stage));
  }
  assert!(!clang_build.install_dir().join("lib").exists());
}

#[test]
fn export_describes_installed_library() {
  let env = TestEnv::new();
  let server = Server::start();
  let ws = env.workspace(gcc());
  let build = Build::new(&ws, ShellRecipe::new(&ws, &server.url(), &server.checksum(), &env)).unwrap();
  let install = build.install().unwrap();

  let mut out = Vec::new();
  build.export(&mut out).unwrap();

  assert_eq!(
    String::from_utf8(out).unwrap(),
    format!(
      "add_library(ZLIB::ZLIB STATIC IMPORTED)\n\
       set_target_properties(ZLIB::ZLIB PROPERTIES\n  \
       INTERFACE_INCLUDE_DIRECTORIES {include}\n  \
       IMPORTED_LINK_INTERFACE_LANGUAGES \"C\"\n  \
       IMPORTED_LOCATION \"{library}\")\n",
      include = install.join("include").display(),
      library = install.join("lib").join("libz.a").display(),
    )
  );
}
