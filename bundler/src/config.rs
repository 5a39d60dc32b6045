//! Bundle configuration loaded from TOML.
//!
//! Keys use kebab-case and unknown keys are rejected. Relative paths resolve
//! against the base directory, which is `directory` when set and otherwise
//! the directory holding the configuration file. Loading produces a
//! [`BundleConfig`] whose paths are all absolute.

use crate::error::{BundlerError, Result};
use crate::filter::PathFilter;
use crate::packages::PackageDescriptor;
use crate::paths::absolute_normalized;
use crate::sdk::SdkLayout;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::io;

/// File looked up when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "bundle.toml";

/// Where the SDK comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkSource {
    /// Download the archive from a URL and install it into the parts
    /// directory.
    Download {
        /// Archive URL.
        url: String,
    },
    /// Use an SDK that is already installed; nothing is downloaded.
    Preinstalled {
        /// SDK directory.
        path: Utf8PathBuf,
    },
}

/// An additional launcher declared with `[[launcher]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExtraLauncher {
    /// Launcher file name.
    pub name: String,
    /// Entry script; relative paths resolve against the SDK root.
    pub entry: Utf8PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawPackage {
    name: String,
    source_root: Utf8PathBuf,
    #[serde(default)]
    allowed_basenames: Vec<String>,
    #[serde(default = "default_true")]
    zip_safe: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    name: String,
    url: Option<String>,
    directory: Option<Utf8PathBuf>,
    parts_directory: Option<Utf8PathBuf>,
    bin_directory: Option<Utf8PathBuf>,
    download_cache: Option<Utf8PathBuf>,
    appengine_lib: Option<Utf8PathBuf>,
    server_script: Option<String>,
    #[serde(default = "default_appserver_script_name")]
    appserver_script_name: String,
    #[serde(default = "default_interpreter")]
    interpreter: String,
    #[serde(default)]
    extra_paths: Vec<Utf8PathBuf>,
    src: Option<Utf8PathBuf>,
    #[serde(default)]
    sources: Vec<Utf8PathBuf>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    packages: Vec<String>,
    #[serde(default = "default_true")]
    zip_packages: bool,
    #[serde(default = "default_zip_name")]
    zip_name: String,
    patch: Option<Utf8PathBuf>,
    patch_options: Option<String>,
    #[serde(default = "default_true")]
    symlink_runtime: bool,
    #[serde(default = "default_sdk_directory")]
    sdk_directory: String,
    #[serde(default, rename = "package")]
    package_descriptors: Vec<RawPackage>,
    #[serde(default, rename = "launcher")]
    launchers: Vec<ExtraLauncher>,
}

const fn default_true() -> bool {
    true
}

fn default_appserver_script_name() -> String {
    "dev_appserver.py".to_owned()
}

fn default_interpreter() -> String {
    "python".to_owned()
}

fn default_zip_name() -> String {
    "packages.zip".to_owned()
}

fn default_sdk_directory() -> String {
    SdkLayout::default().top_level
}

/// Fully resolved bundle configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    /// Bundle name; also the application directory name.
    pub name: String,
    /// Where the SDK comes from.
    pub sdk_source: SdkSource,
    /// Base directory for relative paths.
    pub directory: Utf8PathBuf,
    /// Install root for the SDK and the application directory.
    pub parts_directory: Utf8PathBuf,
    /// Directory receiving launcher scripts.
    pub bin_directory: Utf8PathBuf,
    /// Directory caching downloaded SDK archives.
    pub download_cache: Utf8PathBuf,
    /// File name of the application server launcher.
    pub server_script: String,
    /// SDK script run by the application server launcher.
    pub appserver_script_name: String,
    /// Interpreter used by launchers unless `PYTHON` is set.
    pub interpreter: String,
    /// Extra `PYTHONPATH` entries for launchers.
    pub extra_paths: Vec<Utf8PathBuf>,
    /// Application source roots, copied in order.
    pub sources: Vec<Utf8PathBuf>,
    /// Exclude entries for package and source copies.
    pub exclude: Vec<String>,
    /// Names of the packages to bundle.
    pub packages: Vec<String>,
    /// Whether zip-safe packages go into a single archive.
    pub zip_packages: bool,
    /// File name of the package archive.
    pub zip_name: String,
    /// Patch applied to the installed SDK.
    pub patch: Option<Utf8PathBuf>,
    /// Options handed to `patch`, split on spaces.
    pub patch_options: Option<String>,
    /// Whether to link the SDK runtime helper into the bin directory.
    pub symlink_runtime: bool,
    /// Layout of the SDK archive.
    pub sdk_layout: SdkLayout,
    /// Packages available for bundling.
    pub package_descriptors: Vec<PackageDescriptor>,
    /// Additional launchers.
    pub launchers: Vec<ExtraLauncher>,
}

impl BundleConfig {
    /// Load and resolve the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::ConfigNotFound`] if the file does not exist,
    /// [`BundlerError::InvalidConfig`] if it cannot be parsed or fails
    /// validation, and [`BundlerError::InvalidExcludePattern`] for an exclude
    /// entry that is not a valid regular expression.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BundlerError::ConfigNotFound {
                path: path.to_owned(),
            },
            _ => BundlerError::from(e),
        })?;
        Self::from_toml(&contents, path)
    }

    /// Parse configuration text as if it had been read from `path`.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use gae_bundler::config::{BundleConfig, SdkSource};
    ///
    /// let config = BundleConfig::from_toml(
    ///     "name = \"app\"\nurl = \"https://example.test/sdk.zip\"\n",
    ///     Utf8Path::new("/srv/project/bundle.toml"),
    /// )?;
    /// assert_eq!(config.parts_directory, "/srv/project/parts");
    /// assert_eq!(config.app_directory(), "/srv/project/parts/app");
    /// assert!(matches!(config.sdk_source, SdkSource::Download { .. }));
    /// # Ok::<(), gae_bundler::error::BundlerError>(())
    /// ```
    pub fn from_toml(contents: &str, path: &Utf8Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).map_err(|e| invalid(path, &e.to_string()))?;
        Resolver::new(path)?.resolve(raw)
    }

    /// Directory receiving sources and packages.
    #[must_use]
    pub fn app_directory(&self) -> Utf8PathBuf {
        self.parts_directory.join(&self.name)
    }

    /// Scratch directory exported as `TMPDIR` by every launcher.
    #[must_use]
    pub fn scratch_directory(&self) -> Utf8PathBuf {
        self.parts_directory.join(format!("{}_var", self.name))
    }

    /// Directory of the SDK the launchers run against.
    #[must_use]
    pub fn sdk_root(&self) -> Utf8PathBuf {
        match &self.sdk_source {
            SdkSource::Preinstalled { path } => path.clone(),
            SdkSource::Download { .. } => self.parts_directory.join(&self.sdk_layout.top_level),
        }
    }
}

/// Turns a [`RawConfig`] into a [`BundleConfig`] relative to one config file.
struct Resolver<'a> {
    path: &'a Utf8Path,
    config_dir: Utf8PathBuf,
}

impl<'a> Resolver<'a> {
    fn new(path: &'a Utf8Path) -> Result<Self> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let config_dir = absolute_utf8(path, parent)?;
        Ok(Self { path, config_dir })
    }

    fn resolve(&self, raw: RawConfig) -> Result<BundleConfig> {
        self.validate(&raw)?;

        let directory = match &raw.directory {
            Some(directory) => self.against(&self.config_dir, directory)?,
            None => self.config_dir.clone(),
        };
        let in_base = |value: Option<&Utf8PathBuf>, default: &str| -> Result<Utf8PathBuf> {
            match value {
                Some(path) => self.against(&directory, path),
                None => Ok(directory.join(default)),
            }
        };
        let parts_directory = in_base(raw.parts_directory.as_ref(), "parts")?;
        let bin_directory = in_base(raw.bin_directory.as_ref(), "bin")?;
        let download_cache = in_base(raw.download_cache.as_ref(), "downloads")?;

        let sdk_source = match (raw.appengine_lib, raw.url) {
            (Some(path), _) => SdkSource::Preinstalled {
                path: self.against(&directory, &path)?,
            },
            (None, Some(url)) => SdkSource::Download { url },
            (None, None) => {
                return Err(invalid(self.path, "either `url` or `appengine-lib` is required"));
            }
        };

        let source_list = match raw.src {
            Some(src) => vec![src],
            None => raw.sources,
        };

        Ok(BundleConfig {
            server_script: raw.server_script.unwrap_or_else(|| raw.name.clone()),
            name: raw.name,
            sdk_source,
            parts_directory,
            bin_directory,
            download_cache,
            appserver_script_name: raw.appserver_script_name,
            interpreter: raw.interpreter,
            extra_paths: self.all_against(&directory, &raw.extra_paths)?,
            sources: self.all_against(&directory, &source_list)?,
            exclude: raw.exclude,
            packages: raw.packages,
            zip_packages: raw.zip_packages,
            zip_name: raw.zip_name,
            patch: raw
                .patch
                .map(|patch| self.against(&directory, &patch))
                .transpose()?,
            patch_options: raw.patch_options,
            symlink_runtime: raw.symlink_runtime,
            sdk_layout: SdkLayout {
                top_level: raw.sdk_directory,
                ..SdkLayout::default()
            },
            package_descriptors: raw
                .package_descriptors
                .into_iter()
                .map(|package| {
                    Ok(PackageDescriptor {
                        name: package.name,
                        source_root: self
                            .against(&directory, &package.source_root)?
                            .into_std_path_buf(),
                        allowed_basenames: package.allowed_basenames,
                        zip_safe: package.zip_safe,
                    })
                })
                .collect::<Result<_>>()?,
            launchers: raw.launchers,
            directory,
        })
    }

    fn validate(&self, raw: &RawConfig) -> Result<()> {
        if !is_plain_name(&raw.name) {
            return Err(invalid(self.path, "`name` must be a non-empty file name"));
        }
        if raw
            .server_script
            .as_deref()
            .is_some_and(|script| !is_plain_name(script))
        {
            return Err(invalid(self.path, "`server-script` must be a file name"));
        }
        if !is_plain_name(&raw.zip_name) {
            return Err(invalid(self.path, "`zip-name` must be a file name"));
        }
        if !is_plain_name(&raw.sdk_directory) {
            return Err(invalid(self.path, "`sdk-directory` must be a directory name"));
        }
        if let Some(launcher) = raw.launchers.iter().find(|l| !is_plain_name(&l.name)) {
            return Err(invalid(
                self.path,
                &format!("launcher name {:?} must be a file name", launcher.name),
            ));
        }
        PathFilter::new(Vec::<String>::new(), &raw.exclude)?;
        Ok(())
    }

    fn against(&self, base: &Utf8Path, path: &Utf8Path) -> Result<Utf8PathBuf> {
        absolute_utf8(self.path, &base.join(path))
    }

    fn all_against(&self, base: &Utf8Path, paths: &[Utf8PathBuf]) -> Result<Vec<Utf8PathBuf>> {
        paths.iter().map(|path| self.against(base, path)).collect()
    }
}

/// A name usable as a single path component.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn absolute_utf8(config: &Utf8Path, path: &Utf8Path) -> Result<Utf8PathBuf> {
    let absolute = absolute_normalized(path.as_std_path())?;
    Utf8PathBuf::from_path_buf(absolute).map_err(|non_utf8| {
        invalid(
            config,
            &format!("path {} is not valid UTF-8", non_utf8.display()),
        )
    })
}

fn invalid(path: &Utf8Path, reason: &str) -> BundlerError {
    BundlerError::InvalidConfig {
        path: path.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
