//! CLI argument definitions for the bundler.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::DEFAULT_CONFIG_FILE;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Provision an App Engine SDK, bundle packages and write launchers.
#[derive(Parser, Debug, Default)]
#[command(name = "gae-bundler")]
#[command(version, about)]
#[command(long_about = concat!(
    "Provision an App Engine SDK, bundle packages and write launchers.\n\n",
    "The bundler reads a TOML configuration (bundle.toml by default), downloads ",
    "the SDK archive once into a cache, and installs it again only when the ",
    "archive carries a different version. Requested packages are copied into ",
    "the application directory or bundled into a zip archive, the application ",
    "sources are copied next to them, and launcher scripts are written to the ",
    "bin directory.",
))]
#[command(after_help = concat!(
    "COMMANDS:\n",
    "  install   Provision the SDK and rebuild the application directory (default)\n",
    "  update    Refresh launchers and application sources only\n\n",
    "EXAMPLES:\n",
    "  Build the environment described by ./bundle.toml:\n",
    "    $ gae-bundler\n\n",
    "  Use another configuration file:\n",
    "    $ gae-bundler -c deploy/bundle.toml install\n\n",
    "  Refresh sources after editing them:\n",
    "    $ gae-bundler update\n\n",
    "  Preview the resolved configuration:\n",
    "    $ gae-bundler --dry-run",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file [default: bundle.toml].
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Show the resolved configuration and exit without changing anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log output (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        alias = "verbosity",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Provision the SDK and rebuild the application directory (default).
    Install,

    /// Refresh launchers and application sources only.
    Update,
}

impl Command {
    /// Lower-case command name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
        }
    }
}

impl Cli {
    /// Returns the command to run, defaulting to [`Command::Install`].
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use gae_bundler::cli::{Cli, Command};
    ///
    /// let cli = Cli::parse_from(["gae-bundler"]);
    /// assert_eq!(cli.command(), Command::Install);
    /// ```
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Install)
    }

    /// Returns the configuration file path, defaulting to `bundle.toml` in
    /// the current directory.
    #[must_use]
    pub fn config_path(&self) -> Utf8PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
