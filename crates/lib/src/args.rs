//! Arguments of a CMake `find_package` call, as forwarded by the dependency
//! provider.

use tracing::debug;

use crate::pellets::PelletError;

/// The parts of a `find_package` call that select what gets built.
///
/// Flags such as `EXACT`, `QUIET` or `CONFIG` are accepted but do not change
/// the build, so they are not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindPackageArgs {
  pub package: String,
  pub version: Option<String>,
  /// Components listed after `REQUIRED` or `COMPONENTS`.
  pub components: Vec<String>,
  pub optional_components: Vec<String>,
}

/// Keywords that end a component list.
const KEYWORDS: &[&str] = &[
  "EXACT",
  "QUIET",
  "REQUIRED",
  "COMPONENTS",
  "OPTIONAL_COMPONENTS",
  "MODULE",
  "CONFIG",
  "NO_MODULE",
  "BYPASS_PROVIDER",
  "GLOBAL",
  "NO_POLICY_SCOPE",
];

enum Collecting {
  Nothing,
  Components,
  OptionalComponents,
}

impl FindPackageArgs {
  /// Parse `<package> [version] [EXACT] [QUIET] [REQUIRED [components...]]
  /// [COMPONENTS components...] [OPTIONAL_COMPONENTS components...]
  /// [CONFIG|NO_MODULE|MODULE] [BYPASS_PROVIDER] ...`.
  pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, PelletError> {
    let mut iter = args.iter().map(AsRef::as_ref).peekable();
    let package = iter.next().filter(|p| !p.is_empty()).ok_or(PelletError::MissingPackageName)?;

    let mut parsed = FindPackageArgs {
      package: package.to_string(),
      ..Default::default()
    };

    if let Some(version) = iter.next_if(|arg| arg.starts_with(|c: char| c.is_ascii_digit())) {
      parsed.version = Some(version.to_string());
    }

    let mut collecting = Collecting::Nothing;
    for arg in iter {
      match arg {
        "REQUIRED" | "COMPONENTS" => {
          collecting = Collecting::Components;
          continue;
        }
        "OPTIONAL_COMPONENTS" => {
          collecting = Collecting::OptionalComponents;
          continue;
        }
        "EXACT" | "QUIET" | "MODULE" | "CONFIG" | "NO_MODULE" | "BYPASS_PROVIDER" | "GLOBAL" | "NO_POLICY_SCOPE" => {}
        other => match collecting {
          Collecting::Components => parsed.components.push(other.to_string()),
          Collecting::OptionalComponents => parsed.optional_components.push(other.to_string()),
          Collecting::Nothing => debug!(arg = other, "ignoring find_package argument"),
        },
      }
      if KEYWORDS.contains(&arg) {
        collecting = Collecting::Nothing;
      }
    }

    Ok(parsed)
  }
}
