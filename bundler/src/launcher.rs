//! Launcher script generation.
//!
//! Each launcher prepares a scratch directory, exports it as `TMPDIR`,
//! prepends the bundle's Python paths to `PYTHONPATH`, and hands the remaining
//! command-line arguments to an SDK entry script. Unix launchers are POSIX
//! shell scripts; Windows launchers are PowerShell scripts.

use crate::error::{BundlerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};

/// Runtime helper linked next to the launchers.
pub const RUNTIME_SCRIPT: &str = "_python_runtime.py";

/// Everything needed to render one launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSpec {
    /// File name of the launcher inside the bin directory.
    pub name: String,
    /// Script the launcher executes.
    pub entry_script: Utf8PathBuf,
    /// Directory exported as `TMPDIR`.
    pub scratch_dir: Utf8PathBuf,
    /// Interpreter used unless `PYTHON` is set at run time.
    pub interpreter: String,
    /// Entries prepended to `PYTHONPATH`, in order.
    pub python_paths: Vec<Utf8PathBuf>,
}

/// Write one launcher into `bin_dir` and create its scratch directory.
///
/// Returns the path of the written script.
///
/// # Errors
///
/// Returns [`BundlerError::LauncherGeneration`] if a directory or the script
/// cannot be written.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use gae_bundler::launcher::{LauncherSpec, generate_launcher};
///
/// let temp = tempfile::tempdir()?;
/// let root = Utf8PathBuf::try_from(temp.path().to_path_buf())?;
/// let spec = LauncherSpec {
///     name: "app".to_owned(),
///     entry_script: root.join("google_appengine/dev_appserver.py"),
///     scratch_dir: root.join("parts/app_var"),
///     interpreter: "python".to_owned(),
///     python_paths: vec![],
/// };
///
/// let script = generate_launcher(&root.join("bin"), &spec)?;
/// assert!(script.exists());
/// assert!(root.join("parts/app_var").is_dir());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn generate_launcher(bin_dir: &Utf8Path, spec: &LauncherSpec) -> Result<PathBuf> {
    std::fs::create_dir_all(bin_dir).map_err(|e| {
        BundlerError::LauncherGeneration(format!("failed to create {bin_dir}: {e}"))
    })?;
    std::fs::create_dir_all(&spec.scratch_dir).map_err(|e| {
        BundlerError::LauncherGeneration(format!(
            "failed to create scratch directory {}: {e}",
            spec.scratch_dir
        ))
    })?;

    #[cfg(windows)]
    let path = {
        let path = bin_dir.join(format!("{}.ps1", spec.name));
        write_script(path.as_std_path(), &render_powershell(spec))?;
        path
    };

    #[cfg(not(windows))]
    let path = {
        let path = bin_dir.join(&spec.name);
        write_script(path.as_std_path(), &render_shell(spec))?;
        path
    };

    debug!("wrote launcher {path}");
    Ok(path.into_std_path_buf())
}

/// Write every launcher in `specs`, stopping at the first failure.
///
/// # Errors
///
/// Returns the first error from [`generate_launcher`].
pub fn generate_launchers(bin_dir: &Utf8Path, specs: &[LauncherSpec]) -> Result<Vec<PathBuf>> {
    specs
        .iter()
        .map(|spec| generate_launcher(bin_dir, spec))
        .collect()
}

/// Link the SDK's runtime helper into `bin_dir`.
///
/// Returns the link path, or `None` when the SDK has no helper or links are
/// unavailable on this platform. An existing link is left in place.
///
/// # Errors
///
/// Returns an I/O error if the link cannot be created for any other reason.
pub fn link_runtime_script(sdk_root: &Path, bin_dir: &Path) -> Result<Option<PathBuf>> {
    let source = sdk_root.join(RUNTIME_SCRIPT);
    if !source.is_file() {
        warn!("{} not found; skipping runtime link", source.display());
        return Ok(None);
    }
    let dest = bin_dir.join(RUNTIME_SCRIPT);
    std::fs::create_dir_all(bin_dir)?;
    match symlink_file(&source, &dest) {
        Ok(()) => Ok(Some(dest)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(Some(dest)),
        Err(err) if err.kind() == io::ErrorKind::Unsupported => {
            debug!("symlinks unsupported; not linking {RUNTIME_SCRIPT}");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(unix)]
fn symlink_file(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(not(unix))]
fn symlink_file(_source: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

/// Render the POSIX shell launcher.
#[must_use]
pub fn render_shell(spec: &LauncherSpec) -> String {
    let scratch = shell_quote(spec.scratch_dir.as_str());
    let mut script = format!(
        "#!/bin/sh\nset -e\nmkdir -p {scratch}\nTMPDIR={scratch}\nexport TMPDIR\n"
    );
    if !spec.python_paths.is_empty() {
        let joined = spec
            .python_paths
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join(":");
        script.push_str(&format!(
            "PYTHONPATH={}\"${{PYTHONPATH:+:$PYTHONPATH}}\"\nexport PYTHONPATH\n",
            shell_quote(&joined)
        ));
    }
    script.push_str(&format!(
        "python=${{PYTHON:-{}}}\nexec \"$python\" {} \"$@\"\n",
        shell_quote(&spec.interpreter),
        shell_quote(spec.entry_script.as_str())
    ));
    script
}

/// Render the PowerShell launcher.
#[must_use]
pub fn render_powershell(spec: &LauncherSpec) -> String {
    let mut script = format!(
        concat!(
            "$scratch = {}\n",
            "New-Item -ItemType Directory -Force -Path $scratch | Out-Null\n",
            "$env:TMPDIR = $scratch\n"
        ),
        powershell_quote(spec.scratch_dir.as_str())
    );
    if !spec.python_paths.is_empty() {
        let joined = spec
            .python_paths
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join(";");
        script.push_str(&format!(
            "$env:PYTHONPATH = {} + $(if ($env:PYTHONPATH) {{ ';' + $env:PYTHONPATH }} else {{ '' }})\n",
            powershell_quote(&joined)
        ));
    }
    script.push_str(&format!(
        concat!(
            "$python = if ($env:PYTHON) {{ $env:PYTHON }} else {{ {} }}\n",
            "& $python {} @args\n",
            "exit $LASTEXITCODE\n"
        ),
        powershell_quote(&spec.interpreter),
        powershell_quote(spec.entry_script.as_str())
    ));
    script
}

/// Quote `value` for a POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote `value` as a PowerShell verbatim string.
fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Writes a launcher script and marks it executable where that applies.
fn write_script(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| {
        BundlerError::LauncherGeneration(format!("failed to write {}: {e}", path.display()))
    })?;
    make_executable(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // rwxr-xr-x
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        BundlerError::LauncherGeneration(format!("failed to set permissions: {e}"))
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
