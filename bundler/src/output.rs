//! Output formatting for the bundler CLI.
//!
//! This module writes progress lines to stderr, formats run summaries and
//! dry-run information, and installs the `tracing-subscriber` backend that
//! renders the library's `log` records.

use crate::bundle::BundleReport;
use crate::cli::Command;
use crate::config::{BundleConfig, SdkSource};
use crate::sdk::InstallAction;
use std::fmt::Display;
use std::io::Write;
use tracing_subscriber::filter::LevelFilter;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the lines reported after a successful run.
///
/// # Example
///
/// ```
/// use gae_bundler::bundle::BundleReport;
/// use gae_bundler::output::summary_lines;
///
/// let lines = summary_lines(&BundleReport::default());
/// assert!(lines.iter().any(|line| line.contains("0 launchers")));
/// ```
#[must_use]
pub fn summary_lines(report: &BundleReport) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(sdk) = &report.sdk {
        let action = match &sdk.action {
            InstallAction::Fresh => "installed".to_owned(),
            InstallAction::Upgraded { previous: Some(previous) } => {
                format!("upgraded from {previous}")
            }
            InstallAction::Upgraded { previous: None } => "reinstalled".to_owned(),
            InstallAction::Unchanged => "already up to date".to_owned(),
        };
        lines.push(format!(
            "SDK {} {action} at {}",
            sdk.version,
            sdk.sdk_root.display()
        ));
    }

    lines.push(format!(
        "Wrote {} {}",
        report.launchers.len(),
        plural(report.launchers.len(), "launcher", "launchers")
    ));

    if report.packages > 0 {
        let noun = plural(report.packages, "package", "packages");
        match &report.archive {
            Some(archive) => lines.push(format!(
                "Bundled {} {noun}; zip-safe packages archived in {}",
                report.packages,
                archive.display()
            )),
            None => lines.push(format!("Bundled {} {noun}", report.packages)),
        }
    }

    if report.patched {
        lines.push("Patched the SDK".to_owned());
    }

    if !report.sync.is_clean() {
        let count = report.sync.failures.len();
        lines.push(format!(
            "{count} {} could not be copied; see the warnings above",
            plural(count, "entry", "entries")
        ));
    }

    lines
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Configuration information for dry-run output.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Command that would run.
    pub command: Command,
    /// Resolved configuration.
    pub config: &'a BundleConfig,
    /// Verbosity level (0 = normal, 1+ = verbose).
    pub verbosity: u8,
    /// Whether quiet mode is enabled.
    pub quiet: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let sdk = match &config.sdk_source {
            SdkSource::Download { url } => format!("download {url}"),
            SdkSource::Preinstalled { path } => format!("preinstalled at {path}"),
        };
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Command: {}", self.command.name()),
            format!("Bundle name: {}", config.name),
            format!("SDK: {sdk}"),
            format!("SDK root: {}", config.sdk_root()),
            format!("Download cache: {}", config.download_cache),
            format!("Application directory: {}", config.app_directory()),
            format!("Bin directory: {}", config.bin_directory),
            format!("Interpreter: {}", config.interpreter),
            format!("Zip packages: {}", config.zip_packages),
            format!("Verbosity level: {}", self.verbosity),
            format!("Quiet: {}", self.quiet),
        ];

        if let Some(patch) = &config.patch {
            lines.push(format!("Patch: {patch}"));
        }

        lines.push(String::new());
        lines.push("Packages to bundle:".to_owned());
        for name in &config.packages {
            lines.push(format!("  - {name}"));
        }

        lines.push(String::new());
        lines.push("Source directories:".to_owned());
        for source in &config.sources {
            lines.push(format!("  - {source}"));
        }

        lines.join("\n")
    }
}

/// Log level selected by the `-v` and `-q` flags.
#[must_use]
pub const fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install a stderr `fmt` subscriber at the level chosen by `-v`/`-q`.
///
/// The subscriber bridges `log` records, so the library's `log` macros reach
/// it. Later calls leave the first subscriber in place.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(level_filter(verbosity, quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if installed.is_err() {
        log::debug!("logging already initialised");
    }
}
