//! SDK version markers.
//!
//! The SDK ships a `VERSION` file whose first line reads
//! `release: "1.9.0"`. Parsing is strict: the key must be exactly `release`.
//! Two versions are equal when their trimmed strings are equal; no semantic
//! version ordering is applied.

use crate::error::{BundlerError, Result};
use std::fmt;

/// Key that must open the first line of a version marker.
const RELEASE_KEY: &str = "release";

/// A version string extracted from a marker file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SdkVersion(String);

impl SdkVersion {
    /// Parse the contents of a marker file.
    ///
    /// `origin` names the marker in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::VersionMarker`] when the first line is not of
    /// the form `release: "<version>"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gae_bundler::sdk::SdkVersion;
    ///
    /// let version = SdkVersion::parse("release: \"1.9.0\"\ntimestamp: 1\n", "VERSION")?;
    /// assert_eq!(version.as_str(), "1.9.0");
    ///
    /// assert!(SdkVersion::parse("version: 1.9.0", "VERSION").is_err());
    /// # Ok::<(), gae_bundler::error::BundlerError>(())
    /// ```
    pub fn parse(marker: &str, origin: &str) -> Result<Self> {
        let first_line = marker.lines().next().unwrap_or_default();
        let Some((key, value)) = first_line.split_once(':') else {
            return Err(marker_error(origin, "first line has no `release:` key"));
        };
        if key != RELEASE_KEY {
            return Err(marker_error(
                origin,
                &format!("expected `{RELEASE_KEY}:` but found `{key}:`"),
            ));
        }
        Ok(Self(value.trim_matches([' ', '"']).to_owned()))
    }

    /// Borrow the version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn marker_error(origin: &str, reason: &str) -> BundlerError {
    BundlerError::VersionMarker {
        origin: origin.to_owned(),
        reason: reason.to_owned(),
    }
}
