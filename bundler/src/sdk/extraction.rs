//! SDK archive extraction.
//!
//! Extracts zip archives into a staging directory, rejecting entries that
//! would land outside it (zip-slip) and restoring Unix modes where the
//! archive records them.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Trait for extracting SDK archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait SdkExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the number of files written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape `dest_dir`, [`ExtractionError::EmptyArchive`] if the archive
    /// holds no files, and [`ExtractionError::Io`] or
    /// [`ExtractionError::Zip`] on read and write failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive could not be read as a zip file.
    #[error("malformed SDK archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name from the archive.
        path: String,
    },

    /// The archive contains no files.
    #[error("SDK archive contains no files")]
    EmptyArchive,
}

/// Default extractor backed by the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl SdkExtractor for ZipExtractor {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractionError> {
        let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
        let mut written = 0;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let relative = validate_entry_name(entry.name())?;
            let dest_path = dest_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest_path)?;
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut output = File::create(&dest_path)?;
            io::copy(&mut entry, &mut output)?;
            restore_mode(&dest_path, entry.unix_mode())?;
            written += 1;
        }

        if written == 0 {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(written)
    }
}

/// Validate that an entry name stays inside the destination directory and
/// convert it to a relative path.
fn validate_entry_name(name: &str) -> Result<PathBuf, ExtractionError> {
    let path = Path::new(name);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: name.to_owned(),
        });
    }
    Ok(path.to_path_buf())
}

#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}
