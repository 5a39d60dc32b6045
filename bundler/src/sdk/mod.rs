//! SDK provisioning: download, version check, and staged installation.
//!
//! # Sub-modules
//!
//! - [`download`] - Downloader trait and the `ureq` implementation.
//! - [`extraction`] - Zip extraction with path traversal protection.
//! - [`provisioner`] - The download-once, install-on-version-change flow.
//! - [`version`] - Strict `release: "X.Y.Z"` marker parsing.

pub mod download;
pub mod extraction;
pub mod provisioner;
pub mod version;

pub use provisioner::{InstallAction, ProvisionReport, SdkLayout, SdkProvisioner};
pub use version::SdkVersion;
