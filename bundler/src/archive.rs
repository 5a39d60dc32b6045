//! Zip archive writer rooted at a directory.
//!
//! Every entry added to an [`ArchiveWriter`] must live strictly under the
//! writer's root; the entry is stored under its root-relative name. The
//! writer is a scoped resource: [`ArchiveWriter::finish`] finalises it
//! explicitly, [`ArchiveWriter::scoped`] finalises it on every exit path, and
//! dropping an unfinished writer finalises it as a last resort.

use crate::error::{BundlerError, Result};
use crate::paths::{absolute_normalized, normalize_against, to_archive_name};
use log::warn;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Writes a deflate-compressed zip archive whose entries are named relative
/// to a root directory.
///
/// # Examples
///
/// ```
/// use gae_bundler::archive::ArchiveWriter;
///
/// let temp = tempfile::tempdir()?;
/// let lib = temp.path().join("lib");
/// std::fs::create_dir_all(lib.join("six"))?;
/// std::fs::write(lib.join("six/__init__.py"), "")?;
///
/// let archive = temp.path().join("packages.zip");
/// ArchiveWriter::scoped(&archive, &lib, |writer| {
///     writer.add(&lib.join("six/__init__.py"), None)?;
///     Ok(())
/// })?;
/// assert!(archive.is_file());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ArchiveWriter {
    path: PathBuf,
    root: PathBuf,
    zip: Option<ZipWriter<File>>,
}

impl ArchiveWriter {
    /// Create (or truncate) the archive at `path` with entries rooted at
    /// `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be made absolute or the archive
    /// file cannot be created.
    pub fn create(path: &Path, root: &Path) -> Result<Self> {
        let root = absolute_normalized(root)?;
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
            zip: Some(ZipWriter::new(file)),
        })
    }

    /// Create a writer, hand it to `fill`, and finalise the archive whether
    /// or not `fill` succeeds.
    ///
    /// When `fill` fails its error is returned; a finalisation failure on
    /// that path is only logged.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::create`], from `fill`, or from
    /// finalising the archive.
    pub fn scoped<T, F>(path: &Path, root: &Path, fill: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut writer = Self::create(path, root)?;
        match fill(&mut writer) {
            Ok(value) => {
                writer.finish()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(close_err) = writer.finish() {
                    warn!(
                        "failed to finalise {} after error: {close_err}",
                        path.display()
                    );
                }
                Err(err)
            }
        }
    }

    /// Add `file` to the archive.
    ///
    /// The entry name is derived from `archive_name`, or from `file` when no
    /// name is given. Relative paths resolve against the root. Returns the
    /// stored entry name.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::EntryOutsideRoot`] when the name does not lie
    /// strictly under the root, or an I/O or zip error if the file cannot be
    /// read or written.
    pub fn add(&mut self, file: &Path, archive_name: Option<&Path>) -> Result<String> {
        let name = self.entry_name(archive_name.unwrap_or(file))?;
        let source = fs::canonicalize(normalize_against(file, &self.root))?;
        let options = entry_options(&source)?;

        let zip = self
            .zip
            .as_mut()
            .ok_or_else(|| io::Error::other("archive already finalised"))?;
        zip.start_file(name.as_str(), options)?;
        let mut input = File::open(&source)?;
        io::copy(&mut input, zip)?;
        Ok(name)
    }

    /// Compute the root-relative entry name for `candidate`.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::EntryOutsideRoot`] when `candidate` is the
    /// root itself or lies outside it.
    pub fn entry_name(&self, candidate: &Path) -> Result<String> {
        let normalized = normalize_against(candidate, &self.root);
        match normalized.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => Ok(to_archive_name(relative)),
            _ => Err(BundlerError::EntryOutsideRoot {
                path: normalized,
                root: self.root.clone(),
            }),
        }
    }

    /// Flush and finalise the archive, returning its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the central directory cannot be written.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.close()?;
        Ok(self.path.clone())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(zip) = self.zip.take() {
            zip.finish()?;
        }
        Ok(())
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("failed to finalise {}: {err}", self.path.display());
        }
    }
}

#[cfg(unix)]
fn entry_options(source: &Path) -> Result<SimpleFileOptions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(source)?.permissions().mode();
    Ok(SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(mode))
}

#[cfg(not(unix))]
fn entry_options(_source: &Path) -> Result<SimpleFileOptions> {
    Ok(SimpleFileOptions::default().compression_method(CompressionMethod::Deflated))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
