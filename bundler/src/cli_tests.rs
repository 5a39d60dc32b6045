//! Tests for bundler CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["gae-bundler"]);
    assert!(cli.command.is_none());
    assert!(cli.config.is_none());
    assert!(!cli.dry_run);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
    assert_eq!(cli.command(), Command::Install);
    assert_eq!(cli.config_path(), Utf8PathBuf::from("bundle.toml"));
}

#[test]
fn cli_parses_config_path() {
    let cli = Cli::parse_from(["gae-bundler", "-c", "/srv/app/bundle.toml"]);
    assert_eq!(cli.config_path(), Utf8PathBuf::from("/srv/app/bundle.toml"));
}

#[rstest]
#[case::install(&["gae-bundler", "install"], Command::Install)]
#[case::update(&["gae-bundler", "update"], Command::Update)]
#[case::implicit(&["gae-bundler", "--dry-run"], Command::Install)]
fn cli_parses_subcommands(#[case] args: &[&str], #[case] expected: Command) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.command(), expected);
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::parse_from(["gae-bundler", "update", "--dry-run", "-c", "other.toml"]);
    assert_eq!(cli.command(), Command::Update);
    assert!(cli.dry_run);
    assert_eq!(cli.config_path(), Utf8PathBuf::from("other.toml"));
}

/// Parameterised tests for boolean CLI flags.
#[rstest]
#[case::dry_run(&["gae-bundler", "--dry-run"], |cli: &Cli| cli.dry_run)]
#[case::verbose(&["gae-bundler", "-v"], |cli: &Cli| cli.verbosity > 0)]
#[case::quiet(&["gae-bundler", "-q"], |cli: &Cli| cli.quiet)]
#[case::quiet_long(&["gae-bundler", "--quiet"], |cli: &Cli| cli.quiet)]
fn cli_parses_boolean_flags(#[case] args: &[&str], #[case] check: fn(&Cli) -> bool) {
    let cli = Cli::parse_from(args);
    assert!(check(&cli));
}

/// Parameterised tests for repeatable verbosity flags.
#[rstest]
#[case::double_short(&["gae-bundler", "-vv"], 2)]
#[case::triple_short(&["gae-bundler", "-vvv"], 3)]
#[case::double_long(&["gae-bundler", "--verbose", "--verbose"], 2)]
#[case::double_alias(&["gae-bundler", "--verbosity", "--verbosity"], 2)]
fn cli_parses_repeatable_verbosity_flags(#[case] args: &[&str], #[case] expected: u8) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.verbosity, expected);
}

#[rstest]
#[case::verbose_with_quiet(&["gae-bundler", "--verbose", "--quiet"])]
#[case::unknown_command(&["gae-bundler", "deploy"])]
fn cli_rejects_invalid_arguments(#[case] args: &[&str]) {
    Cli::try_parse_from(args).expect_err("expected clap to reject the arguments");
}

#[rstest]
#[case::install(Command::Install, "install")]
#[case::update(Command::Update, "update")]
fn command_names_are_lower_case(#[case] command: Command, #[case] expected: &str) {
    assert_eq!(command.name(), expected);
}
