//! `cpackman archive`: acquire an arbitrary archive the way pellets do.

use anyhow::{Context, Result};

use cpackman_lib::util::hash::DigestAlgorithm;
use cpackman_lib::{HttpSource, PackageId};

use super::GlobalOpts;
use crate::output::{print_json, print_path};

pub fn cmd_archive(
  opts: &GlobalOpts,
  name: &str,
  version: &str,
  url: &str,
  checksum: &str,
  algorithm: DigestAlgorithm,
) -> Result<()> {
  let ws = opts.source_workspace()?;
  let package = PackageId::new(name, version)?;
  let source = HttpSource::new(&ws, package, url, checksum).with_algorithm(algorithm);

  let dir = source
    .get_source()
    .with_context(|| format!("Failed to fetch {}", source.package()))?;

  if opts.format.is_json() {
    print_json(&serde_json::json!({
      "package": source.package().to_string(),
      "archive": source.resolve_local_path(),
      "source_dir": dir,
    }))?;
  } else {
    print_path(&dir);
  }
  Ok(())
}
