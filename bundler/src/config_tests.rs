//! Tests for configuration loading and path resolution.

use super::*;
use rstest::{fixture, rstest};

const MINIMAL: &str = r#"
name = "guestbook"
url = "https://example.test/google_appengine_1.9.0.zip"
"#;

#[fixture]
fn config_path() -> &'static Utf8Path {
    Utf8Path::new("/srv/project/bundle.toml")
}

fn parse(contents: &str) -> Result<BundleConfig> {
    BundleConfig::from_toml(contents, Utf8Path::new("/srv/project/bundle.toml"))
}

#[rstest]
fn minimal_config_uses_defaults(config_path: &Utf8Path) {
    let config = BundleConfig::from_toml(MINIMAL, config_path).expect("valid config");

    assert_eq!(config.name, "guestbook");
    assert_eq!(config.directory, "/srv/project");
    assert_eq!(config.parts_directory, "/srv/project/parts");
    assert_eq!(config.bin_directory, "/srv/project/bin");
    assert_eq!(config.download_cache, "/srv/project/downloads");
    assert_eq!(config.server_script, "guestbook");
    assert_eq!(config.appserver_script_name, "dev_appserver.py");
    assert_eq!(config.interpreter, "python");
    assert_eq!(config.zip_name, "packages.zip");
    assert!(config.zip_packages);
    assert!(config.symlink_runtime);
    assert!(config.patch.is_none());
    assert_eq!(config.sdk_layout, SdkLayout::default());
    assert_eq!(config.app_directory(), "/srv/project/parts/guestbook");
    assert_eq!(config.scratch_directory(), "/srv/project/parts/guestbook_var");
    assert_eq!(config.sdk_root(), "/srv/project/parts/google_appengine");
}

#[test]
fn relative_paths_resolve_against_directory() {
    let config = parse(
        r#"
name = "app"
url = "https://example.test/sdk.zip"
directory = "build"
parts-directory = "out/parts"
download-cache = "/var/cache/sdk"
extra-paths = ["vendor", "../shared"]
patch = "patches/sdk.patch"
"#,
    )
    .expect("valid config");

    assert_eq!(config.directory, "/srv/project/build");
    assert_eq!(config.parts_directory, "/srv/project/build/out/parts");
    assert_eq!(config.download_cache, "/var/cache/sdk");
    assert_eq!(
        config.extra_paths,
        vec![
            Utf8PathBuf::from("/srv/project/build/vendor"),
            Utf8PathBuf::from("/srv/project/shared"),
        ]
    );
    assert_eq!(
        config.patch.as_deref(),
        Some(Utf8Path::new("/srv/project/build/patches/sdk.patch"))
    );
}

#[rstest]
#[case::src_wins(
    "src = \"app\"\nsources = [\"a\", \"b\"]",
    &["/srv/project/app"]
)]
#[case::sources_list("sources = [\"a\", \"b\"]", &["/srv/project/a", "/srv/project/b"])]
#[case::neither("", &[])]
fn source_roots_prefer_src(#[case] extra: &str, #[case] expected: &[&str]) {
    let config = parse(&format!("{MINIMAL}{extra}\n")).expect("valid config");

    let sources: Vec<&str> = config.sources.iter().map(|s| s.as_str()).collect();
    assert_eq!(sources, expected);
}

#[test]
fn preinstalled_sdk_skips_download() {
    let config = parse(
        r#"
name = "app"
appengine-lib = "/opt/google_appengine"
url = "https://example.test/ignored.zip"
"#,
    )
    .expect("valid config");

    assert_eq!(
        config.sdk_source,
        SdkSource::Preinstalled {
            path: Utf8PathBuf::from("/opt/google_appengine")
        }
    );
    assert_eq!(config.sdk_root(), "/opt/google_appengine");
}

#[test]
fn package_and_launcher_tables_are_parsed() {
    let config = parse(&format!(
        r#"{MINIMAL}
packages = ["WebOb"]

[[package]]
name = "WebOb"
source-root = "site-packages/webob"
allowed-basenames = ["__init__.py"]

[[package]]
name = "simplejson"
source-root = "/usr/lib/python2.7/simplejson"
zip-safe = false

[[launcher]]
name = "bulkloader"
entry = "bulkloader.py"
"#
    ))
    .expect("valid config");

    assert_eq!(config.packages, vec!["WebOb"]);
    assert_eq!(
        config.package_descriptors,
        vec![
            PackageDescriptor {
                name: "WebOb".to_owned(),
                source_root: "/srv/project/site-packages/webob".into(),
                allowed_basenames: vec!["__init__.py".to_owned()],
                zip_safe: true,
            },
            PackageDescriptor {
                name: "simplejson".to_owned(),
                source_root: "/usr/lib/python2.7/simplejson".into(),
                allowed_basenames: Vec::new(),
                zip_safe: false,
            },
        ]
    );
    assert_eq!(
        config.launchers,
        vec![ExtraLauncher {
            name: "bulkloader".to_owned(),
            entry: Utf8PathBuf::from("bulkloader.py"),
        }]
    );
}

#[rstest]
#[case::no_sdk_source("name = \"app\"\n", "appengine-lib")]
#[case::unknown_key(
    "name = \"app\"\nurl = \"u.zip\"\nzip_packages = false\n",
    "zip_packages"
)]
#[case::missing_name("url = \"u.zip\"\n", "name")]
#[case::name_with_separator("name = \"a/b\"\nurl = \"u.zip\"\n", "name")]
#[case::bad_zip_name("name = \"app\"\nurl = \"u.zip\"\nzip-name = \"\"\n", "zip-name")]
#[case::bad_launcher(
    "name = \"app\"\nurl = \"u.zip\"\n[[launcher]]\nname = \"..\"\nentry = \"x.py\"\n",
    "launcher"
)]
fn invalid_configs_are_rejected(#[case] contents: &str, #[case] mentioned: &str) {
    let err = parse(contents).expect_err("invalid config");

    match err {
        BundlerError::InvalidConfig { path, reason } => {
            assert_eq!(path, "/srv/project/bundle.toml");
            assert!(reason.contains(mentioned), "reason: {reason}");
        }
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn invalid_exclude_pattern_is_reported_at_load() {
    let err = parse(&format!("{MINIMAL}exclude = [\"[unclosed\"]\n")).expect_err("bad regex");
    assert!(matches!(
        err,
        BundlerError::InvalidExcludePattern { ref pattern, .. } if pattern == "[unclosed"
    ));
}

#[test]
fn missing_file_is_config_not_found() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::try_from(temp.path().join("bundle.toml")).expect("utf-8 path");

    let err = BundleConfig::load(&path).expect_err("missing file");

    assert!(matches!(err, BundlerError::ConfigNotFound { path: ref missing } if *missing == path));
}

#[test]
fn load_resolves_against_config_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf-8 path");
    let path = dir.join(DEFAULT_CONFIG_FILE);
    std::fs::write(&path, MINIMAL).expect("write config");

    let config = BundleConfig::load(&path).expect("load");

    assert_eq!(config.parts_directory, dir.join("parts"));
}
