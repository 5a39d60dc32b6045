//! Error types for the bundler.
//!
//! Every variant here is fatal: it aborts the running `install` or `update`
//! operation. Per-entry copy failures during tree synchronisation are not
//! errors; they are logged and collected in
//! [`SyncReport`](crate::sync::SyncReport) instead.

use crate::sdk::download::DownloadError;
use crate::sdk::extraction::ExtractionError;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a bundling run.
#[derive(Debug, Error)]
pub enum BundlerError {
    /// The SDK version marker does not start with `release: "<version>"`.
    #[error("could not parse SDK version marker in {origin}: {reason}")]
    VersionMarker {
        /// Where the marker was read from (archive member or installed file).
        origin: String,
        /// Description of the format violation.
        reason: String,
    },

    /// The external `patch` utility exited unsuccessfully.
    #[error("patching the SDK failed ({status}): {stderr}")]
    PatchFailed {
        /// Exit status reported by the patch process.
        status: String,
        /// Trimmed standard error output of the patch process.
        stderr: String,
    },

    /// A patch was requested for an SDK the bundler did not install.
    #[error("patching a preinstalled SDK is not allowed: {path}")]
    PreinstalledSdkPatch {
        /// Location of the preinstalled SDK.
        path: Utf8PathBuf,
    },

    /// A requested package has no descriptor in the resolved package set.
    #[error("{name}: package not found")]
    PackageNotFound {
        /// Lower-cased name of the missing package.
        name: String,
    },

    /// A package's configured source root does not exist.
    #[error("{name}: package source {} does not exist", path.display())]
    PackageSourceMissing {
        /// Name of the package as configured.
        name: String,
        /// The missing source root.
        path: PathBuf,
    },

    /// An archive entry resolves to a path outside the archive root.
    #[error("{}: not found in {}", path.display(), root.display())]
    EntryOutsideRoot {
        /// The offending, normalised entry path.
        path: PathBuf,
        /// The archive root every entry must live under.
        root: PathBuf,
    },

    /// An exclude entry is not a valid regular expression.
    #[error("invalid exclude pattern {pattern:?}: {reason}")]
    InvalidExcludePattern {
        /// The exclude entry as configured.
        pattern: String,
        /// Description of the regex compilation failure.
        reason: String,
    },

    /// No archive file name can be derived from the SDK URL.
    #[error("cannot derive an archive file name from SDK URL {url}")]
    InvalidSdkUrl {
        /// The configured URL.
        url: String,
    },

    /// The extracted SDK archive lacks the expected top-level directory.
    #[error("SDK archive does not contain a top-level {top_level} directory")]
    MissingSdkRoot {
        /// Name of the directory that was expected.
        top_level: String,
    },

    /// The configuration file does not exist.
    #[error("configuration file not found at {path}")]
    ConfigNotFound {
        /// Path that was looked up.
        path: Utf8PathBuf,
    },

    /// The configuration file could not be parsed or failed validation.
    #[error("invalid configuration in {path}: {reason}")]
    InvalidConfig {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// Writing a launcher script failed.
    #[error("launcher generation failed: {0}")]
    LauncherGeneration(String),

    /// Downloading the SDK archive failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extracting the SDK archive failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Reading or writing a zip archive failed.
    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`BundlerError`].
pub type Result<T> = std::result::Result<T, BundlerError>;
