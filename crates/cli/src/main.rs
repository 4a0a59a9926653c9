mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cpackman_lib::util::hash::DigestAlgorithm;
use tracing_subscriber::EnvFilter;

use crate::cmd::GlobalOpts;
use crate::output::{OutputFormat, print_error};

/// Fetch, build and install third-party C/C++ dependencies with content-addressed caching
#[derive(Parser)]
#[command(name = "cpackman")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Working root holding sources, builds and installs [default: ./cpackman]
  #[arg(long, global = true, env = "CPACKMAN_ROOT")]
  root: Option<PathBuf>,

  /// JSON toolchain description; the CPACKMAN_* compiler variables are used otherwise
  #[arg(long, global = true)]
  toolchain: Option<PathBuf>,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Download and unpack a package's source, printing the source directory
  Fetch {
    /// Package name (e.g. Boost, zstd)
    package: String,
  },

  /// Download, verify and unpack an arbitrary archive, printing the source directory
  Archive {
    /// Package name
    name: String,
    /// Package version
    version: String,
    /// Archive URL
    url: String,
    /// Expected digest of the archive
    checksum: String,
    /// Digest algorithm of the checksum
    #[arg(long, default_value_t = DigestAlgorithm::Sha1)]
    algorithm: DigestAlgorithm,
  },

  /// Build and install a package, printing the install directory
  Install {
    /// Package name (e.g. Boost, zstd)
    package: String,
    /// find_package arguments following the package name
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Install a package and emit its CMake import declarations
  Provide {
    /// Write the declarations to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Package name (e.g. Boost, zstd)
    package: String,
    /// find_package arguments following the package name
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Print the build identity of a package for the current toolchain
  BuildId {
    /// Package name (e.g. Boost, zstd)
    package: String,
    /// find_package arguments following the package name
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Print the digest of a file
  Hash {
    /// File to hash
    file: PathBuf,
    /// Digest algorithm
    #[arg(long, default_value_t = DigestAlgorithm::Sha1)]
    algorithm: DigestAlgorithm,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let opts = GlobalOpts {
    root: cli.root,
    toolchain: cli.toolchain,
    format: cli.format,
  };

  let result = match cli.command {
    Commands::Fetch { package } => cmd::cmd_fetch(&opts, &package),
    Commands::Archive {
      name,
      version,
      url,
      checksum,
      algorithm,
    } => cmd::cmd_archive(&opts, &name, &version, &url, &checksum, algorithm),
    Commands::Install { package, args } => cmd::cmd_install(&opts, &package, &args),
    Commands::Provide { output, package, args } => cmd::cmd_provide(&opts, &package, &args, output.as_deref()),
    Commands::BuildId { package, args } => cmd::cmd_build_id(&opts, &package, &args),
    Commands::Hash { file, algorithm } => cmd::cmd_hash(&opts, &file, algorithm),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
