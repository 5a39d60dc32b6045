//! Lexical path helpers.
//!
//! These functions never consult the process working directory implicitly:
//! relative paths are resolved against a base the caller passes in.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` and fold `.` and `..` components lexically.
///
/// `..` never climbs above the root. Symbolic links are not resolved.
///
/// # Examples
///
/// ```
/// use gae_bundler::paths::normalize_against;
/// use std::path::{Path, PathBuf};
///
/// let resolved = normalize_against(Path::new("./pkg/../lib/x.py"), Path::new("/srv/app"));
/// assert_eq!(resolved, PathBuf::from("/srv/app/lib/x.py"));
/// ```
#[must_use]
pub fn normalize_against(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Fold `.` and `..` components of `path` lexically.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir | Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Make `path` absolute using the current directory, then normalise it.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn absolute_normalized(path: &Path) -> std::io::Result<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

/// Render a relative path with `/` separators, as used for archive names.
#[must_use]
pub fn to_archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
