//! App Engine SDK provisioner, package bundler and launcher writer.
//!
//! This crate provides the core functionality for building an App Engine
//! development environment from a declarative configuration. It is used by
//! the `gae-bundler` CLI binary and can be consumed programmatically for
//! testing or custom workflows.
//!
//! # Modules
//!
//! - [`archive`] - Zip writer rooted at a directory
//! - [`bundle`] - The `install` and `update` operations
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration loading and path resolution
//! - [`error`] - Error types for fatal conditions
//! - [`filter`] - Allow-list and exclude filtering of paths
//! - [`launcher`] - Launcher script generation
//! - [`output`] - Progress output, summaries and the log backend
//! - [`packages`] - Package descriptors, resolution, copying and zipping
//! - [`patch`] - Patching the installed SDK through a command executor
//! - [`paths`] - Lexical path normalisation helpers
//! - [`sdk`] - SDK download, version check and installation
//! - [`sync`] - Recursive tree copy with optional symlinks

pub mod archive;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod launcher;
pub mod output;
pub mod packages;
pub mod patch;
pub mod paths;
pub mod sdk;
pub mod sync;

#[cfg(test)]
mod test_utils;
