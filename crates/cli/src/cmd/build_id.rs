use anyhow::Result;

use cpackman_lib::pellets::Pellet;
use cpackman_lib::{Build, Recipe};

use super::{GlobalOpts, find_package_args};
use crate::output::print_json;

pub fn cmd_build_id(opts: &GlobalOpts, package: &str, args: &[String]) -> Result<()> {
  let ws = opts.workspace()?;
  let build = Build::new(&ws, Pellet::new(&ws, package, find_package_args(package, args)?)?)?;

  if opts.format.is_json() {
    print_json(&serde_json::json!({
      "package": build.recipe().package().to_string(),
      "build_id": build.id().as_str(),
      "build_dir": build.build_dir(),
      "install_dir": build.install_dir(),
    }))?;
  } else {
    println!("{}", build.id());
  }
  Ok(())
}
