//! The `install` and `update` operations.
//!
//! [`Bundler::install`] provisions the SDK, writes the launchers, rebuilds the
//! application directory from the requested packages and the application
//! sources, and finally patches the SDK when a patch is configured.
//! [`Bundler::update`] only refreshes the launchers and the sources.

use crate::config::{BundleConfig, SdkSource};
use crate::error::{BundlerError, Result};
use crate::filter::PathFilter;
use crate::launcher::{LauncherSpec, generate_launchers, link_runtime_script};
use crate::packages::{copy_packages, resolve_packages, split_zip_safe, zip_packages};
use crate::patch::{CommandExecutor, apply_patch};
use crate::sdk::download::SdkDownloader;
use crate::sdk::extraction::SdkExtractor;
use crate::sdk::{ProvisionReport, SdkProvisioner};
use crate::sync::{CopySpec, SyncReport, symlink_supported, sync};
use camino::Utf8Path;
use log::info;
use std::fs;
use std::path::PathBuf;

/// SDK script behind the `appcfg` launcher.
pub const APPCFG_SCRIPT: &str = "appcfg.py";

/// Name of the `appcfg` launcher.
pub const APPCFG_LAUNCHER: &str = "appcfg";

/// What a bundling run produced.
#[derive(Debug, Default)]
pub struct BundleReport {
    /// Provisioning outcome, when the SDK is managed by the bundler.
    pub sdk: Option<ProvisionReport>,
    /// Launcher scripts written.
    pub launchers: Vec<PathBuf>,
    /// Runtime helper link in the bin directory, if one exists.
    pub runtime_link: Option<PathBuf>,
    /// Number of packages bundled.
    pub packages: usize,
    /// Package archive, when one was written.
    pub archive: Option<PathBuf>,
    /// Merged result of every package and source copy.
    pub sync: SyncReport,
    /// Whether the SDK was patched.
    pub patched: bool,
}

/// Runs bundling operations for one configuration.
pub struct Bundler<'a> {
    config: &'a BundleConfig,
    downloader: &'a dyn SdkDownloader,
    extractor: &'a dyn SdkExtractor,
    executor: &'a dyn CommandExecutor,
}

impl<'a> Bundler<'a> {
    /// Create a bundler with injected download, extraction and command
    /// backends.
    #[must_use]
    pub fn new(
        config: &'a BundleConfig,
        downloader: &'a dyn SdkDownloader,
        extractor: &'a dyn SdkExtractor,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            config,
            downloader,
            extractor,
            executor,
        }
    }

    /// Build the complete development environment.
    ///
    /// # Errors
    ///
    /// Returns [`BundlerError::PreinstalledSdkPatch`] before doing any work
    /// when a patch is configured for a preinstalled SDK. Otherwise returns
    /// the first fatal error from provisioning, launcher generation, package
    /// resolution, copying, zipping, or patching.
    pub fn install(&self) -> Result<BundleReport> {
        let config = self.config;
        if let (Some(_), SdkSource::Preinstalled { path }) = (&config.patch, &config.sdk_source) {
            return Err(BundlerError::PreinstalledSdkPatch { path: path.clone() });
        }

        let sdk = match &config.sdk_source {
            SdkSource::Download { url } => Some(self.provision(url)?),
            SdkSource::Preinstalled { path } => {
                info!("using preinstalled SDK at {path}");
                None
            }
        };

        let mut report = self.write_launchers()?;
        report.sdk = sdk;

        let app_dir = config.app_directory();
        recreate_dir(&app_dir)?;

        let requested = resolve_packages(&config.packages, &config.package_descriptors)?;
        let (zip_safe, not_zip_safe) = split_zip_safe(&requested);
        let symlink = symlink_supported();
        report.packages = requested.len();

        if config.zip_packages && !zip_safe.is_empty() {
            let staging = tempfile::Builder::new()
                .prefix("gae-bundler-lib-")
                .tempdir()?;
            let lib_dir = staging.path().join(&config.name);
            report
                .sync
                .merge(copy_packages(&lib_dir, &zip_safe, &config.exclude, symlink)?);
            let archive = app_dir.join(&config.zip_name).into_std_path_buf();
            zip_packages(&lib_dir, &archive)?;
            staging.close()?;
            report.archive = Some(archive);
        } else {
            report.sync.merge(copy_packages(
                app_dir.as_std_path(),
                &zip_safe,
                &config.exclude,
                symlink,
            )?);
        }
        report.sync.merge(copy_packages(
            app_dir.as_std_path(),
            &not_zip_safe,
            &config.exclude,
            symlink,
        )?);

        report.sync.merge(self.copy_sources()?);

        if let Some(patch) = &config.patch {
            apply_patch(
                self.executor,
                config.sdk_root().as_std_path(),
                config.patch_options.as_deref().unwrap_or_default(),
                patch.as_std_path(),
            )?;
            report.patched = true;
        }

        Ok(report)
    }

    /// Refresh the launchers and the application sources.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error from launcher generation or copying.
    pub fn update(&self) -> Result<BundleReport> {
        let mut report = self.write_launchers()?;
        report.sync = self.copy_sources()?;
        Ok(report)
    }

    fn provision(&self, url: &str) -> Result<ProvisionReport> {
        let config = self.config;
        SdkProvisioner::new(config.sdk_layout.clone(), self.downloader, self.extractor)
            .ensure_installed(
                url,
                config.download_cache.as_std_path(),
                config.parts_directory.as_std_path(),
            )
    }

    fn write_launchers(&self) -> Result<BundleReport> {
        let config = self.config;
        let launchers = generate_launchers(&config.bin_directory, &launcher_specs(config))?;
        let runtime_link = if config.symlink_runtime {
            link_runtime_script(
                config.sdk_root().as_std_path(),
                config.bin_directory.as_std_path(),
            )?
        } else {
            None
        };
        Ok(BundleReport {
            launchers,
            runtime_link,
            ..BundleReport::default()
        })
    }

    fn copy_sources(&self) -> Result<SyncReport> {
        let config = self.config;
        let app_dir = config.app_directory();
        let filter = PathFilter::new(Vec::<String>::new(), &config.exclude)?;
        let mut report = SyncReport::default();
        for source in &config.sources {
            info!("copying sources from {source}");
            let spec = CopySpec::new(source, &app_dir)
                .with_symlinks(symlink_supported())
                .with_filter(filter.clone());
            report.merge(sync(&spec)?);
        }
        Ok(report)
    }
}

/// Launchers written for `config`: the application server, `appcfg`, and
/// every configured extra launcher, all sharing one scratch directory.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use gae_bundler::bundle::launcher_specs;
/// use gae_bundler::config::BundleConfig;
///
/// let config = BundleConfig::from_toml(
///     "name = \"app\"\nurl = \"https://example.test/sdk.zip\"\n",
///     Utf8Path::new("/srv/project/bundle.toml"),
/// )?;
/// let names: Vec<_> = launcher_specs(&config).into_iter().map(|s| s.name).collect();
/// assert_eq!(names, ["app", "appcfg"]);
/// # Ok::<(), gae_bundler::error::BundlerError>(())
/// ```
#[must_use]
pub fn launcher_specs(config: &BundleConfig) -> Vec<LauncherSpec> {
    let sdk_root = config.sdk_root();
    let mut python_paths = config.extra_paths.clone();
    python_paths.push(sdk_root.clone());
    let spec = |name: &str, entry: &Utf8Path| LauncherSpec {
        name: name.to_owned(),
        entry_script: sdk_root.join(entry),
        scratch_dir: config.scratch_directory(),
        interpreter: config.interpreter.clone(),
        python_paths: python_paths.clone(),
    };

    let mut specs = vec![
        spec(
            config.server_script.as_str(),
            Utf8Path::new(&config.appserver_script_name),
        ),
        spec(APPCFG_LAUNCHER, Utf8Path::new(APPCFG_SCRIPT)),
    ];
    specs.extend(
        config
            .launchers
            .iter()
            .map(|extra| spec(extra.name.as_str(), extra.entry.as_path())),
    );
    specs
}

/// Remove `dir` if present and create it empty.
fn recreate_dir(dir: &Utf8Path) -> Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
