//! gae-bundler CLI entrypoint.
//!
//! This binary reads a bundle configuration, provisions the App Engine SDK,
//! bundles the requested packages and application sources, and writes the
//! launcher scripts. Progress and errors go to stderr.

use clap::Parser;
use gae_bundler::bundle::{BundleReport, Bundler};
use gae_bundler::cli::{Cli, Command};
use gae_bundler::config::{BundleConfig, SdkSource};
use gae_bundler::error::Result;
use gae_bundler::output::{DryRunInfo, init_logging, summary_lines, write_stderr_line};
use gae_bundler::patch::SystemCommandExecutor;
use gae_bundler::sdk::download::HttpDownloader;
use gae_bundler::sdk::extraction::ZipExtractor;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity, cli.quiet);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = BundleConfig::load(&cli.config_path())?;

    // Dry-run mode: show what would be done without side effects
    if cli.dry_run {
        print_dry_run_info(cli, &config, stderr);
        return Ok(());
    }

    let bundler = Bundler::new(&config, &HttpDownloader, &ZipExtractor, &SystemCommandExecutor);
    run_command(cli, &config, &bundler, stderr)
}

/// Runs the selected command and reports the outcome.
fn run_command(
    cli: &Cli,
    config: &BundleConfig,
    bundler: &Bundler<'_>,
    stderr: &mut dyn Write,
) -> Result<()> {
    let report = match cli.command() {
        Command::Install => {
            if !cli.quiet {
                announce_install(config, stderr);
            }
            bundler.install()?
        }
        Command::Update => {
            if !cli.quiet {
                write_stderr_line(
                    stderr,
                    format!("Updating launchers and sources for {}...", config.name),
                );
            }
            bundler.update()?
        }
    };

    if !cli.quiet {
        print_summary(&report, stderr);
    }
    Ok(())
}

fn announce_install(config: &BundleConfig, stderr: &mut dyn Write) {
    match &config.sdk_source {
        SdkSource::Download { url } => {
            write_stderr_line(stderr, format!("Provisioning SDK from {url}..."));
        }
        SdkSource::Preinstalled { path } => {
            write_stderr_line(stderr, format!("Using preinstalled SDK at {path}"));
        }
    }
    write_stderr_line(
        stderr,
        format!("Building application directory {}...", config.app_directory()),
    );
}

fn print_summary(report: &BundleReport, stderr: &mut dyn Write) {
    write_stderr_line(stderr, "");
    for line in summary_lines(report) {
        write_stderr_line(stderr, line);
    }
}

/// Prints dry run configuration information.
fn print_dry_run_info(cli: &Cli, config: &BundleConfig, stderr: &mut dyn Write) {
    let info = DryRunInfo {
        command: cli.command(),
        config,
        verbosity: cli.verbosity,
        quiet: cli.quiet,
    };
    write_stderr_line(stderr, info.display_text());
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}
