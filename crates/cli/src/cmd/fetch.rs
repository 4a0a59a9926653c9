//! `cpackman fetch`: acquire a package's unpacked source tree.

use anyhow::{Context, Result};
use tracing::info;

use cpackman_lib::Recipe;
use cpackman_lib::pellets::Pellet;

use super::{GlobalOpts, find_package_args};
use crate::output::{print_json, print_path};

pub fn cmd_fetch(opts: &GlobalOpts, package: &str) -> Result<()> {
  let ws = opts.source_workspace()?;
  let pellet = Pellet::new(&ws, package, find_package_args(package, &[])?)?;

  let dir = pellet
    .source()
    .get_source()
    .with_context(|| format!("Failed to fetch {}", pellet.package()))?;
  info!(package = %pellet.package(), dir = %dir.display(), "source ready");

  if opts.format.is_json() {
    print_json(&serde_json::json!({ "package": pellet.package().to_string(), "source_dir": dir }))?;
  } else {
    print_path(&dir);
  }
  Ok(())
}
