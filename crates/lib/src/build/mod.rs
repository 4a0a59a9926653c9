//! Staged, memoized builds.
//!
//! A build runs three stages (configure, build, install), each recorded by a
//! marker file once its action succeeds. Build and install directories are
//! keyed by the [`BuildId`], so a toolchain or package change lands in a fresh
//! directory pair and never disturbs existing ones.
//!
//! # Submodules
//!
//! - [`command`] - subprocess execution for stage actions
//! - `identity` - the build cache key
//! - `pipeline` - stage sequencing, markers and locking
//! - `recipe` - the [`Recipe`] trait implemented by each package

pub mod command;
mod identity;
mod pipeline;
mod recipe;
mod types;

pub use identity::BuildId;
pub use pipeline::Build;
pub use recipe::{Recipe, StageContext};
pub use types::*;
