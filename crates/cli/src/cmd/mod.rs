mod archive;
mod build_id;
mod fetch;
mod hash;
mod install;
mod provide;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cpackman_lib::args::FindPackageArgs;
use cpackman_lib::config::root_from_env;
use cpackman_lib::{Config, Toolchain, Workspace};

use crate::output::OutputFormat;

pub use archive::cmd_archive;
pub use build_id::cmd_build_id;
pub use fetch::cmd_fetch;
pub use hash::cmd_hash;
pub use install::cmd_install;
pub use provide::cmd_provide;

/// Options shared by every subcommand.
pub struct GlobalOpts {
  pub root: Option<PathBuf>,
  pub toolchain: Option<PathBuf>,
  pub format: OutputFormat,
}

impl GlobalOpts {
  fn root(&self) -> PathBuf {
    self.root.clone().unwrap_or_else(root_from_env)
  }

  fn load_toolchain(&self) -> Result<Toolchain> {
    match &self.toolchain {
      Some(path) => Toolchain::load(path).context("Failed to load toolchain"),
      None => Toolchain::from_env().context("No toolchain given (use --toolchain or the CPACKMAN_* variables)"),
    }
  }

  /// Workspace for commands that build.
  fn workspace(&self) -> Result<Workspace> {
    let config = Config::new(self.root(), self.load_toolchain()?);
    Workspace::new(config).context("Failed to open working root")
  }

  /// Workspace for commands that only acquire sources.
  ///
  /// Sources are shared across toolchains, so missing toolchain variables are
  /// replaced by an empty toolchain. A `--toolchain` file must still load.
  fn source_workspace(&self) -> Result<Workspace> {
    let toolchain = match &self.toolchain {
      Some(_) => self.load_toolchain()?,
      None => Toolchain::from_env().unwrap_or_else(|_| Toolchain::new("", "", "", "")),
    };
    Workspace::new(Config::new(self.root(), toolchain)).context("Failed to open working root")
  }
}

/// `find_package` arguments for `package`, which is prepended to `args`.
fn find_package_args(package: &str, args: &[String]) -> Result<FindPackageArgs> {
  let mut full = Vec::with_capacity(args.len() + 1);
  full.push(package);
  full.extend(args.iter().map(String::as_str));
  FindPackageArgs::parse(&full).context("Invalid find_package arguments")
}
