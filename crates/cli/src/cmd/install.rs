//! `cpackman install`: run a package through configure, build and install.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use cpackman_lib::pellets::Pellet;
use cpackman_lib::{Build, Recipe};

use super::{GlobalOpts, find_package_args};
use crate::output::{format_elapsed, print_json, print_path, print_success};

pub fn cmd_install(opts: &GlobalOpts, package: &str, args: &[String]) -> Result<()> {
  let ws = opts.workspace()?;
  let start = Instant::now();

  let build = Build::new(&ws, Pellet::new(&ws, package, find_package_args(package, args)?)?)?;
  let install_dir = build
    .install()
    .with_context(|| format!("Failed to install {}", build.recipe().package()))?;
  let elapsed = format_elapsed(start.elapsed());
  info!(package = %build.recipe().package(), id = %build.id(), %elapsed, "install complete");

  if opts.format.is_json() {
    print_json(&serde_json::json!({
      "package": build.recipe().package().to_string(),
      "build_id": build.id().as_str(),
      "install_dir": install_dir,
    }))?;
  } else {
    print_success(&format!("{} installed in {}", build.recipe().package(), elapsed));
    print_path(&install_dir);
  }
  Ok(())
}
