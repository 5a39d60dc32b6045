//! Download-once, install-on-version-change SDK provisioning.
//!
//! The archive is cached under its URL's file name. Installation compares the
//! archive's version marker with the installed copy's marker and only
//! replaces the installation when they differ. Extraction goes to a staging
//! directory next to the final location and the SDK directory is then moved
//! into place with a rename, so a half-extracted SDK never appears at the
//! install path.

use crate::error::{BundlerError, Result};
use crate::sdk::download::SdkDownloader;
use crate::sdk::extraction::SdkExtractor;
use crate::sdk::version::SdkVersion;
use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Where the SDK lives inside its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkLayout {
    /// Top-level directory of the archive, installed as-is.
    pub top_level: String,
    /// Version marker file inside [`Self::top_level`].
    pub marker: String,
}

impl SdkLayout {
    /// Archive member name of the version marker.
    #[must_use]
    pub fn marker_member(&self) -> String {
        format!("{}/{}", self.top_level, self.marker)
    }
}

impl Default for SdkLayout {
    fn default() -> Self {
        Self {
            top_level: "google_appengine".to_owned(),
            marker: "VERSION".to_owned(),
        }
    }
}

/// What [`SdkProvisioner::ensure_installed`] did to the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAction {
    /// No SDK was installed before.
    Fresh,
    /// An SDK with a different (or unreadable) version was replaced.
    Upgraded {
        /// Version of the replaced SDK, `None` when it had no marker.
        previous: Option<SdkVersion>,
    },
    /// The installed SDK already matched the archive.
    Unchanged,
}

/// Outcome of a provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Installed SDK directory.
    pub sdk_root: PathBuf,
    /// Version recorded in the archive.
    pub version: SdkVersion,
    /// Whether the archive had to be downloaded.
    pub downloaded: bool,
    /// What happened to the installation.
    pub action: InstallAction,
}

/// State of an existing installation.
enum Installed {
    Absent,
    Unknown,
    Version(SdkVersion),
}

/// Installs an SDK archive into a directory, downloading it at most once.
pub struct SdkProvisioner<'a> {
    layout: SdkLayout,
    downloader: &'a dyn SdkDownloader,
    extractor: &'a dyn SdkExtractor,
}

impl<'a> SdkProvisioner<'a> {
    /// Create a provisioner with injected download and extraction backends.
    #[must_use]
    pub fn new(
        layout: SdkLayout,
        downloader: &'a dyn SdkDownloader,
        extractor: &'a dyn SdkExtractor,
    ) -> Self {
        Self {
            layout,
            downloader,
            extractor,
        }
    }

    /// Make sure the SDK from `url` is installed under `install_dir`.
    ///
    /// Both version markers are parsed and the new archive is extracted into
    /// a staging directory before anything is removed, so a malformed marker
    /// or a failed extraction leaves the installed SDK untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::InvalidSdkUrl`] when no file name can be
    /// derived from `url`, [`BundlerError::Download`] when the download fails,
    /// [`BundlerError::VersionMarker`] for malformed markers,
    /// [`BundlerError::Extraction`] or [`BundlerError::MissingSdkRoot`] when
    /// the archive cannot be installed, and I/O errors from the filesystem.
    pub fn ensure_installed(
        &self,
        url: &str,
        cache_dir: &Path,
        install_dir: &Path,
    ) -> Result<ProvisionReport> {
        let (archive, downloaded) = self.fetch_archive(url, cache_dir)?;
        let version = self.archive_version(&archive)?;
        let sdk_root = install_dir.join(&self.layout.top_level);

        let action = match self.installed(&sdk_root)? {
            Installed::Absent => InstallAction::Fresh,
            Installed::Version(installed) if installed == version => {
                info!(
                    "SDK {version} already installed at {}",
                    sdk_root.display()
                );
                return Ok(ProvisionReport {
                    sdk_root,
                    version,
                    downloaded,
                    action: InstallAction::Unchanged,
                });
            }
            Installed::Version(installed) => InstallAction::Upgraded {
                previous: Some(installed),
            },
            Installed::Unknown => InstallAction::Upgraded { previous: None },
        };

        info!("installing SDK {version} into {}", install_dir.display());
        self.install(&archive, install_dir, &sdk_root)?;

        Ok(ProvisionReport {
            sdk_root,
            version,
            downloaded,
            action,
        })
    }

    /// Return the cached archive for `url`, downloading it on a cache miss.
    ///
    /// The download is written to a temporary file inside `cache_dir` and
    /// renamed into place once complete. The flag is `true` when a download
    /// happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL has no file name, the cache directory
    /// cannot be created, or the download fails.
    pub fn fetch_archive(&self, url: &str, cache_dir: &Path) -> Result<(PathBuf, bool)> {
        let file_name = archive_file_name(url)?;
        fs::create_dir_all(cache_dir)?;
        let cached = cache_dir.join(file_name);

        if cached.is_file() {
            info!("SDK archive already downloaded: {}", cached.display());
            return Ok((cached, false));
        }

        info!("downloading SDK archive from {url}");
        let partial = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(cache_dir)?
            .into_temp_path();
        self.downloader.download(url, &partial)?;
        partial.persist(&cached).map_err(|e| e.error)?;
        Ok((cached, true))
    }

    /// Read the version marker embedded in `archive`.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::VersionMarker`] when the marker is missing or
    /// malformed, or a zip/I/O error when the archive cannot be read.
    pub fn archive_version(&self, archive: &Path) -> Result<SdkVersion> {
        let member = self.layout.marker_member();
        let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
        let mut contents = String::new();
        match zip.by_name(&member) {
            Ok(mut entry) => {
                entry.read_to_string(&mut contents)?;
            }
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(BundlerError::VersionMarker {
                    origin: format!("{}:{member}", archive.display()),
                    reason: "marker file is missing from the archive".to_owned(),
                });
            }
            Err(other) => return Err(other.into()),
        }
        SdkVersion::parse(&contents, &member)
    }

    fn installed(&self, sdk_root: &Path) -> Result<Installed> {
        if !sdk_root.is_dir() {
            return Ok(Installed::Absent);
        }
        let marker_path = sdk_root.join(&self.layout.marker);
        match fs::read_to_string(&marker_path) {
            Ok(contents) => Ok(Installed::Version(SdkVersion::parse(
                &contents,
                &marker_path.display().to_string(),
            )?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "installed SDK at {} has no version marker; reinstalling",
                    sdk_root.display()
                );
                Ok(Installed::Unknown)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn install(&self, archive: &Path, install_dir: &Path, sdk_root: &Path) -> Result<()> {
        fs::create_dir_all(install_dir)?;
        // Same filesystem as the destination, so the final move is a rename.
        let staging = tempfile::Builder::new()
            .prefix(".sdk-staging-")
            .tempdir_in(install_dir)?;
        self.extractor.extract(archive, staging.path())?;

        let staged_root = staging.path().join(&self.layout.top_level);
        if !staged_root.is_dir() {
            return Err(BundlerError::MissingSdkRoot {
                top_level: self.layout.top_level.clone(),
            });
        }
        // The old tree goes only once the new one is staged.
        if sdk_root.exists() {
            info!("removing outdated SDK at {}", sdk_root.display());
            fs::remove_dir_all(sdk_root)?;
        }
        fs::rename(&staged_root, sdk_root)?;
        staging.close()?;
        Ok(())
    }
}

/// Derive the cache file name from the last segment of `url`.
///
/// # Errors
///
/// Returns [`BundlerError::InvalidSdkUrl`] when the last segment is empty.
///
/// # Examples
///
/// ```
/// use gae_bundler::sdk::provisioner::archive_file_name;
///
/// let name = archive_file_name("https://example.test/sdk/google_appengine_1.9.0.zip")?;
/// assert_eq!(name, "google_appengine_1.9.0.zip");
/// # Ok::<(), gae_bundler::error::BundlerError>(())
/// ```
pub fn archive_file_name(url: &str) -> Result<String> {
    let last_segment = url.rsplit('/').next().unwrap_or_default();
    let name = last_segment
        .rsplit(MAIN_SEPARATOR)
        .next()
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(BundlerError::InvalidSdkUrl {
            url: url.to_owned(),
        });
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod tests;
