use std::path::Path;

use anyhow::{Context, Result};

use cpackman_lib::util::hash::{DigestAlgorithm, hash_file};

use super::GlobalOpts;
use crate::output::print_json;

pub fn cmd_hash(opts: &GlobalOpts, file: &Path, algorithm: DigestAlgorithm) -> Result<()> {
  let digest = hash_file(file, algorithm).with_context(|| format!("Failed to hash {}", file.display()))?;

  if opts.format.is_json() {
    print_json(&serde_json::json!({ "file": file, "algorithm": algorithm, "digest": digest }))?;
  } else {
    println!("{}  {}", digest, file.display());
  }
  Ok(())
}
