//! Subprocess execution for stage actions.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::build::BuildError;

/// Run `cmd` (program followed by its arguments) in `cwd` with `env` added to
/// the inherited environment.
///
/// Standard streams are inherited so toolchain output reaches the user as it
/// is produced. A non-zero exit status, or termination by a signal, is a
/// [`BuildError::CommandFailed`].
pub fn run_command<S: AsRef<str>>(cmd: &[S], env: &BTreeMap<String, String>, cwd: &Path) -> Result<(), BuildError> {
  let (program, args) = cmd.split_first().ok_or(BuildError::EmptyCommand)?;
  let command_line = cmd.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");

  info!(cmd = %command_line, cwd = %cwd.display(), "executing command");

  let status = Command::new(program.as_ref())
    .args(args.iter().map(AsRef::as_ref))
    .envs(env)
    .current_dir(cwd)
    .status()
    .map_err(|source| BuildError::Spawn {
      command: command_line.clone(),
      source,
    })?;

  if !status.success() {
    return Err(BuildError::CommandFailed {
      command: command_line,
      code: status.code(),
    });
  }

  debug!(cmd = %command_line, "command succeeded");
  Ok(())
}
