//! `cpackman provide`: install a package and emit its CMake import declarations.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use cpackman_lib::pellets::provide_module;
use cpackman_lib::util::fs::write_atomic;

use super::GlobalOpts;

/// Write declarations to `output`, or stdout when `None`.
///
/// The file is replaced atomically so an interrupted run never leaves CMake a
/// truncated module to include.
pub fn cmd_provide(opts: &GlobalOpts, package: &str, args: &[String], output: Option<&Path>) -> Result<()> {
  let ws = opts.workspace()?;

  let mut find_args = Vec::with_capacity(args.len() + 1);
  find_args.push(package);
  find_args.extend(args.iter().map(String::as_str));

  let mut declarations = Vec::new();
  provide_module(&ws, package, &find_args, &mut declarations)
    .with_context(|| format!("Failed to provide {}", package))?;

  match output {
    Some(path) => {
      write_atomic(path, &declarations).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(&declarations).context("Failed to write to stdout")?;
      stdout.flush().context("Failed to write to stdout")?;
    }
  }
  Ok(())
}
