//! Library half of the QPM GitHub Action.
//!
//! Installs QPM from CI artifacts or releases, restores package
//! dependencies with a directory-backed cache, and publishes packages by
//! uploading release binaries and committing the updated manifests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod extraction;
pub mod github;
pub mod http;
pub mod install;
pub mod platform;
pub mod process;
pub mod publish;
pub mod resolver;
pub mod restore;
pub mod toolcache;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use config::{ActionConfig, RunnerEnv};
pub use error::{ActionError, Result};
