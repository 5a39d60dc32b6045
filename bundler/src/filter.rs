//! Include/exclude decisions for tree synchronisation.
//!
//! A [`PathFilter`] combines an optional allow-list of file basenames with a
//! list of exclude entries. Each exclude entry is checked twice: once for an
//! exact basename match and once as a regular expression anchored at the start
//! of the full path. Both checks apply at every directory level.

use crate::error::{BundlerError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// One configured exclude entry.
#[derive(Debug, Clone)]
struct ExcludeEntry {
    literal: String,
    pattern: Regex,
}

/// Decides whether a source path takes part in a copy.
///
/// # Examples
///
/// ```
/// use gae_bundler::filter::PathFilter;
/// use std::path::Path;
///
/// let filter = PathFilter::new(Vec::<String>::new(), ["EGG-INFO", r".*\.pyc$"])?;
/// assert!(filter.should_include(Path::new("/src/pkg/module.py"), true));
/// assert!(!filter.should_include(Path::new("/src/pkg/module.pyc"), true));
/// assert!(!filter.should_include(Path::new("/src/EGG-INFO"), false));
/// # Ok::<(), gae_bundler::error::BundlerError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    allowed_basenames: Option<BTreeSet<String>>,
    excludes: Vec<ExcludeEntry>,
    files_only: bool,
}

impl PathFilter {
    /// Build a filter from an allow-list and exclude entries.
    ///
    /// An empty allow-list means "no allow-list": every file passes that
    /// check.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::InvalidExcludePattern`] when an exclude entry
    /// is not a valid regular expression.
    pub fn new<A, E>(allowed_basenames: A, excludes: E) -> Result<Self>
    where
        A: IntoIterator,
        A::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let allowed: BTreeSet<String> = allowed_basenames.into_iter().map(Into::into).collect();
        let excludes = excludes
            .into_iter()
            .map(|entry| compile_exclude(entry.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            allowed_basenames: (!allowed.is_empty()).then_some(allowed),
            excludes,
            files_only: false,
        })
    }

    /// Reject every entry that is not a file.
    ///
    /// Used for single-module packages, whose copy walks the module's parent
    /// directory and must not pick up sibling packages.
    #[must_use]
    pub fn files_only(mut self) -> Self {
        self.files_only = true;
        self
    }

    /// Return `true` when `path` should be copied.
    ///
    /// `is_file` tells the filter whether `path` refers to a regular file;
    /// the allow-list only constrains files, never directories. A
    /// [`files_only`](Self::files_only) filter rejects directories outright.
    #[must_use]
    pub fn should_include(&self, path: &Path, is_file: bool) -> bool {
        if self.files_only && !is_file {
            return false;
        }

        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if is_file
            && self
                .allowed_basenames
                .as_ref()
                .is_some_and(|allowed| !allowed.contains(&basename))
        {
            return false;
        }

        if self.excludes.iter().any(|entry| entry.literal == basename) {
            return false;
        }

        let full_path = path.to_string_lossy();
        !self
            .excludes
            .iter()
            .any(|entry| entry.pattern.is_match(&full_path))
    }

}

/// Compile an exclude entry as a start-anchored regular expression.
fn compile_exclude(entry: &str) -> Result<ExcludeEntry> {
    let pattern =
        Regex::new(&format!("^(?:{entry})")).map_err(|e| BundlerError::InvalidExcludePattern {
            pattern: entry.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(ExcludeEntry {
        literal: entry.to_owned(),
        pattern,
    })
}
