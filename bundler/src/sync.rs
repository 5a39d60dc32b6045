//! Recursive tree synchronisation.
//!
//! [`sync`] mirrors a source directory into a destination directory. It is
//! best-effort: a failure to copy or link a single entry is logged, recorded
//! in the returned [`SyncReport`], and the walk carries on with the remaining
//! entries. Only failures at the top level (an unreadable source directory or
//! an uncreatable destination) abort the call.

use crate::error::Result;
use crate::filter::PathFilter;
use crate::paths::absolute_normalized;
use log::{debug, warn};
use std::ffi::OsStr;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

/// Extension of package metadata directories that are never copied.
const EGG_INFO_EXTENSION: &str = "egg-info";

/// Kind of a filesystem entry, determined without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// A symbolic link, whatever it points to.
    Symlink,
}

/// A path together with its [`EntryKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Location of the entry.
    pub path: PathBuf,
    /// What the entry is.
    pub kind: EntryKind,
}

impl FileEntry {
    /// Inspect `path` without following a trailing symlink.
    ///
    /// Anything that is neither a symlink nor a directory is reported as a
    /// file.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry's metadata cannot be read.
    pub fn inspect(path: &Path) -> io::Result<Self> {
        let file_type = fs::symlink_metadata(path)?.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(Self {
            path: path.to_path_buf(),
            kind,
        })
    }
}

/// Parameters of one synchronisation call.
#[derive(Debug, Clone)]
pub struct CopySpec {
    /// Directory (or single module file) to mirror.
    pub source: PathBuf,
    /// Directory that receives the mirrored entries.
    pub destination: PathBuf,
    /// Link files instead of copying them.
    pub symlink: bool,
    /// Include/exclude rules consulted for every entry.
    pub filter: PathFilter,
}

impl CopySpec {
    /// Create a copy-mode spec with an empty filter.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            symlink: false,
            filter: PathFilter::default(),
        }
    }

    /// Select symlink mode.
    #[must_use]
    pub fn with_symlinks(mut self, symlink: bool) -> Self {
        self.symlink = symlink;
        self
    }

    /// Replace the filter.
    #[must_use]
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// An entry that could not be copied or linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Source entry.
    pub source: PathBuf,
    /// Intended destination.
    pub destination: PathBuf,
    /// Description of the underlying I/O error.
    pub reason: String,
}

/// Summary of a [`sync`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files copied byte for byte.
    pub copied: usize,
    /// Symbolic links created.
    pub linked: usize,
    /// Entries left out by the filter or the `.egg-info` rule.
    pub skipped: usize,
    /// Entries that failed and were skipped.
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.copied += other.copied;
        self.linked += other.linked;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// Return `true` when no entry failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Whether symlink mode can be used on this platform.
#[must_use]
pub const fn symlink_supported() -> bool {
    cfg!(unix)
}

/// Mirror `spec.source` into `spec.destination`.
///
/// When the source is not a directory it is taken to be the single file of
/// a one-module package, and both source and destination are retargeted to
/// their parent directories.
///
/// # Errors
///
/// Returns an error when the source directory cannot be listed or the
/// destination directory cannot be created. Failures below the top level are
/// reported through [`SyncReport::failures`] instead.
///
/// # Examples
///
/// ```
/// use gae_bundler::sync::{CopySpec, sync};
///
/// let temp = tempfile::tempdir()?;
/// let src = temp.path().join("src");
/// std::fs::create_dir_all(src.join("pkg"))?;
/// std::fs::write(src.join("pkg/__init__.py"), "")?;
///
/// let report = sync(&CopySpec::new(&src, temp.path().join("dst")))?;
/// assert_eq!(report.copied, 1);
/// assert!(temp.path().join("dst/pkg/__init__.py").is_file());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn sync(spec: &CopySpec) -> Result<SyncReport> {
    let mut source = absolute_normalized(&spec.source)?;
    let mut destination = absolute_normalized(&spec.destination)?;

    if !source.is_dir() {
        if let Some(parent) = source.parent() {
            source = parent.to_path_buf();
        }
        if let Some(parent) = destination.parent() {
            destination = parent.to_path_buf();
        }
    }

    let mut report = SyncReport::default();
    sync_dir(spec, &source, &destination, &mut report)?;
    Ok(report)
}

fn sync_dir(spec: &CopySpec, src: &Path, dst: &Path, report: &mut SyncReport) -> io::Result<()> {
    let entries = fs::read_dir(src)?;
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in entries {
        let name = entry?.file_name();
        if Path::new(&name).extension() == Some(OsStr::new(EGG_INFO_EXTENSION)) {
            report.skipped += 1;
            continue;
        }

        let src_path = src.join(&name);
        let dst_path = dst.join(&name);
        if !spec.filter.should_include(&src_path, src_path.is_file()) {
            debug!("Skipped {}", src_path.display());
            report.skipped += 1;
            continue;
        }

        if let Err(err) = sync_entry(spec, &src_path, &dst_path, report) {
            warn!(
                "Can't copy {} to {}: {err}",
                src_path.display(),
                dst_path.display()
            );
            report.failures.push(SyncFailure {
                source: src_path,
                destination: dst_path,
                reason: err.to_string(),
            });
        }
    }
    Ok(())
}

fn sync_entry(spec: &CopySpec, src: &Path, dst: &Path, report: &mut SyncReport) -> io::Result<()> {
    let entry = FileEntry::inspect(src)?;

    if spec.symlink && entry.kind == EntryKind::Symlink {
        let target = fs::read_link(src)?;
        if fs::read_link(dst).is_ok_and(|existing| existing == target) {
            return Ok(());
        }
        make_symlink(&target, dst)?;
        report.linked += 1;
    } else if src.is_dir() {
        sync_dir(spec, src, dst, report)?;
    } else if spec.symlink && !dst.is_file() {
        make_symlink(src, dst)?;
        report.linked += 1;
    } else if !spec.symlink {
        copy_preserving(src, dst)?;
        report.copied += 1;
    }
    Ok(())
}

/// Copy a file, keeping its permission bits and modification time.
fn copy_preserving(src: &Path, dst: &Path) -> io::Result<()> {
    // Writing through a link left by an earlier symlink-mode run would
    // clobber the source.
    if fs::symlink_metadata(dst).is_ok_and(|meta| meta.file_type().is_symlink()) {
        fs::remove_file(dst)?;
    }
    fs::copy(src, dst)?;

    let metadata = fs::metadata(src)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    open_for_times(dst)?.set_times(times)
}

#[cfg(unix)]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(not(unix))]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::options().write(true).open(path)
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!(
            "symbolic links are not supported here: {} -> {}",
            link.display(),
            target.display()
        ),
    ))
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
