/// Default working root, relative to the directory the tool is invoked from.
pub const DEFAULT_ROOT_DIR: &str = "cpackman";

pub const SOURCES_DIR: &str = "sources";
pub const BUILD_DIR: &str = "build";
pub const INSTALL_DIR: &str = "install";

pub const CONFIGURE_DONE_MARKER: &str = ".cpackman_configure_done";
pub const BUILD_DONE_MARKER: &str = ".cpackman_build_done";
pub const INSTALL_DONE_MARKER: &str = ".cpackman_install_done";

/// Extension appended to an archive path to form its unpack-directory sidecar.
pub const SIDECAR_EXTENSION: &str = "dn";

/// Suffix of an in-flight download.
pub const PARTIAL_DOWNLOAD_EXTENSION: &str = "part";

pub const LOCK_FILENAME: &str = ".cpackman.lock";

/// Directory under `sources/` holding bare repository mirrors.
pub const GIT_MIRRORS_DIR: &str = ".git";

/// Number of commit-id characters used to name an exported checkout.
pub const GIT_REV_PREFIX_LEN: usize = 12;

pub const USER_AGENT: &str = concat!("cpackman/", env!("CARGO_PKG_VERSION"));
