//! cpackman-lib: fetch, configure, build and install third-party dependencies
//!
//! This crate provides the pipeline used by the `cpackman` dependency provider:
//! - `Source`: acquires a verified, unpacked source tree (HTTP archive or git)
//! - `BuildId`: the cache key derived from toolchain and package identity
//! - `Build`: the idempotent configure/build/install stages of one package
//! - `export`: import declarations for a downstream CMake project
//!
//! All state lives under the `Workspace` root; there is no other database.

pub mod args;
pub mod build;
pub mod config;
pub mod consts;
pub mod export;
pub mod lock;
pub mod package;
pub mod pellets;
pub mod source;
pub mod util;
pub mod workspace;

pub use build::{Build, BuildError, BuildId, Recipe, StageContext};
pub use config::{Config, ConfigError, IntegrityPolicy, Toolchain};
pub use package::{PackageError, PackageId};
pub use source::{GitSource, HttpSource, Source, SourceError};
pub use workspace::Workspace;
