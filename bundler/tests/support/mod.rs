//! Test support utilities for bundler behavioural tests.
//!
//! This module builds throwaway project trees holding an SDK archive,
//! site-packages and application sources, and provides a downloader that
//! copies the archive from disk instead of fetching it over HTTP.

use camino::{Utf8Path, Utf8PathBuf};
use gae_bundler::sdk::download::{DownloadError, SdkDownloader};
use std::cell::Cell;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A project tree in a temporary directory.
pub struct Project {
    // Keep the directory alive for the lifetime of the project.
    _temp: TempDir,
    /// Project root.
    pub root: Utf8PathBuf,
}

impl Project {
    /// Create a project with an SDK archive at release `version`, two
    /// packages and a small application.
    pub fn new(version: &str) -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("utf-8 temp dir");
        let project = Self { _temp: temp, root };
        project.write_sdk_archive(version);
        project.write("site-packages/webob/__init__.py", "");
        project.write("site-packages/webob/exc.py", "class HTTPException: pass\n");
        project.write("site-packages/webob/EGG-INFO/PKG-INFO", "Name: WebOb\n");
        project.write("site-packages/simplejson/__init__.py", "");
        project.write("src/app.yaml", "application: guestbook\n");
        project.write("src/main.py", "import webob\n");
        project
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent");
        }
        fs::write(&path, contents).expect("failed to write file");
    }

    /// Replace the upstream SDK archive with one carrying `version`.
    pub fn write_sdk_archive(&self, version: &str) {
        let path = self.archive();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create upstream dir");
        }
        let marker = format!("release: \"{version}\"\ntimestamp: 1\napi_versions: ['1']\n");
        let mut zip = zip::ZipWriter::new(File::create(&path).expect("failed to create zip"));
        for (name, body) in [
            ("google_appengine/VERSION", marker.as_str()),
            ("google_appengine/dev_appserver.py", "print('dev')\n"),
            ("google_appengine/appcfg.py", "print('cfg')\n"),
            ("google_appengine/_python_runtime.py", "print('rt')\n"),
        ] {
            zip.start_file(name, SimpleFileOptions::default())
                .expect("failed to start zip entry");
            zip.write_all(body.as_bytes())
                .expect("failed to write zip entry");
        }
        zip.finish().expect("failed to finish zip");
    }

    /// Upstream SDK archive served by [`FileDownloader`].
    pub fn archive(&self) -> Utf8PathBuf {
        self.root.join("upstream/google_appengine_1.9.0.zip")
    }

    /// Configuration text for a downloaded SDK, followed by `extra` and the
    /// package tables. `extra` chooses the requested packages.
    pub fn config_text(&self, extra: &str) -> String {
        format!(
            concat!(
                "name = \"guestbook\"\n",
                "url = \"https://example.test/google_appengine_1.9.0.zip\"\n",
                "src = \"src\"\n",
                "{extra}\n",
                "\n",
                "[[package]]\n",
                "name = \"WebOb\"\n",
                "source-root = \"site-packages/webob\"\n",
                "\n",
                "[[package]]\n",
                "name = \"simplejson\"\n",
                "source-root = \"site-packages/simplejson\"\n",
                "zip-safe = false\n",
            ),
            extra = extra
        )
    }

    /// Path of `relative` under the project root.
    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }
}

/// Downloader copying a local archive and counting calls.
pub struct FileDownloader {
    source: Utf8PathBuf,
    calls: Cell<usize>,
}

impl FileDownloader {
    /// Serve `source` for every URL.
    pub fn new(source: &Utf8Path) -> Self {
        Self {
            source: source.to_owned(),
            calls: Cell::new(0),
        }
    }

    /// Number of downloads performed so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SdkDownloader for FileDownloader {
    fn download(&self, _url: &str, dest: &Path) -> Result<(), DownloadError> {
        self.calls.set(self.calls.get() + 1);
        fs::copy(&self.source, dest)?;
        Ok(())
    }
}
