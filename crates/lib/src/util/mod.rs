//! Shared utilities.
//!
//! Digest computation, atomic record writes and test helpers.

pub mod fs;
pub mod hash;

#[cfg(test)]
pub mod testutil;
