//! Dependency packages bundled into the application directory.
//!
//! Packages are described by [`PackageDescriptor`]s. The requested names are
//! resolved against those descriptors, split by zip safety, and either copied
//! unpacked into the application directory or gathered in a library
//! directory that [`zip_packages`] turns into a single archive.

use crate::archive::ArchiveWriter;
use crate::error::{BundlerError, Result};
use crate::filter::PathFilter;
use crate::paths::absolute_normalized;
use crate::sync::{CopySpec, SyncReport, sync};
use log::{debug, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Exclude entry applied to every package copy.
pub const ALWAYS_EXCLUDED: &str = "EGG-INFO";

/// A dependency package ready to be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Distribution name, matched case-insensitively.
    pub name: String,
    /// Top-level package directory, or the file of a single-module package.
    pub source_root: PathBuf,
    /// File basenames that belong to the package; empty allows everything.
    pub allowed_basenames: Vec<String>,
    /// Whether the package can be imported from inside a zip archive.
    pub zip_safe: bool,
}

impl PackageDescriptor {
    /// Directory name the package occupies inside a library directory.
    #[must_use]
    pub fn install_name(&self) -> PathBuf {
        self.source_root
            .file_name()
            .map_or_else(|| PathBuf::from(&self.name), PathBuf::from)
    }

    fn filter(&self, excludes: &[String]) -> Result<PathFilter> {
        let excludes = std::iter::once(ALWAYS_EXCLUDED).chain(excludes.iter().map(String::as_str));
        if self.source_root.is_file() {
            // Single-module package: only the module file itself.
            let allowed = if self.allowed_basenames.is_empty() {
                self.source_root
                    .file_name()
                    .map(|name| vec![name.to_string_lossy().into_owned()])
                    .unwrap_or_default()
            } else {
                self.allowed_basenames.clone()
            };
            return Ok(PathFilter::new(allowed, excludes)?.files_only());
        }
        PathFilter::new(self.allowed_basenames.clone(), excludes)
    }
}

/// Match `requested` names against `available` descriptors.
///
/// Names are lower-cased before matching. The result keeps request order and
/// lists each descriptor once.
///
/// # Errors
///
/// Returns [`BundlerError::PackageNotFound`] for the first name without a
/// descriptor.
///
/// # Examples
///
/// ```
/// use gae_bundler::packages::{PackageDescriptor, resolve_packages};
///
/// let available = vec![PackageDescriptor {
///     name: "WebOb".to_owned(),
///     source_root: "/site-packages/webob".into(),
///     allowed_basenames: vec![],
///     zip_safe: true,
/// }];
///
/// let resolved = resolve_packages(&["webob".to_owned()], &available)?;
/// assert_eq!(resolved.len(), 1);
/// assert!(resolve_packages(&["jinja2".to_owned()], &available).is_err());
/// # Ok::<(), gae_bundler::error::BundlerError>(())
/// ```
pub fn resolve_packages<'a>(
    requested: &[String],
    available: &'a [PackageDescriptor],
) -> Result<Vec<&'a PackageDescriptor>> {
    let mut resolved: Vec<&PackageDescriptor> = Vec::with_capacity(requested.len());
    for name in requested {
        let wanted = name.to_lowercase();
        let descriptor = available
            .iter()
            .find(|candidate| candidate.name.to_lowercase() == wanted)
            .ok_or(BundlerError::PackageNotFound { name: wanted })?;
        if !resolved.iter().any(|seen| std::ptr::eq(*seen, descriptor)) {
            resolved.push(descriptor);
        }
    }
    Ok(resolved)
}

/// Partition packages into `(zip_safe, not_zip_safe)`.
#[must_use]
pub fn split_zip_safe<'a>(
    packages: &[&'a PackageDescriptor],
) -> (Vec<&'a PackageDescriptor>, Vec<&'a PackageDescriptor>) {
    packages.iter().copied().partition(|package| package.zip_safe)
}

/// Copy each package into `lib_dir/<install name>`.
///
/// [`ALWAYS_EXCLUDED`] is added to `excludes` and the package's allowed
/// basenames form the allow-list.
///
/// # Errors
///
/// Returns [`BundlerError::PackageSourceMissing`] when a package's source
/// root does not exist, and an error if an exclude entry is invalid or a
/// package's top-level copy fails. Per-entry failures are collected in the
/// returned report.
pub fn copy_packages(
    lib_dir: &Path,
    packages: &[&PackageDescriptor],
    excludes: &[String],
    symlink: bool,
) -> Result<SyncReport> {
    std::fs::create_dir_all(lib_dir)?;
    let mut report = SyncReport::default();
    for package in packages {
        if !package.source_root.exists() {
            return Err(BundlerError::PackageSourceMissing {
                name: package.name.clone(),
                path: package.source_root.clone(),
            });
        }
        let destination = lib_dir.join(package.install_name());
        debug!(
            "copying package {} from {} to {}",
            package.name,
            package.source_root.display(),
            destination.display()
        );
        let spec = CopySpec::new(&package.source_root, destination)
            .with_symlinks(symlink)
            .with_filter(package.filter(excludes)?);
        report.merge(sync(&spec)?);
    }
    Ok(report)
}

/// Bundle every file below `lib_dir` into the zip archive at `archive_path`.
///
/// Symbolic links are not followed while walking; a link to a file is stored
/// with the contents of its target. Returns the number of entries written.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or the archive cannot be
/// written.
pub fn zip_packages(lib_dir: &Path, archive_path: &Path) -> Result<usize> {
    info!("zipping packages into {}", archive_path.display());
    let lib_dir = absolute_normalized(lib_dir)?;
    ArchiveWriter::scoped(archive_path, &lib_dir, |writer| {
        let mut added = 0;
        for entry in WalkDir::new(&lib_dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            let is_file = if entry.path_is_symlink() {
                path.is_file()
            } else {
                entry.file_type().is_file()
            };
            if is_file {
                writer.add(path, None)?;
                added += 1;
            }
        }
        Ok(added)
    })
}

#[cfg(test)]
#[path = "packages_tests.rs"]
mod tests;
