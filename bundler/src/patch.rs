//! Patching the installed SDK with the external `patch` utility.

use crate::error::{BundlerError, Result};
use log::info;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Program invoked to apply patches.
pub const PATCH_PROGRAM: &str = "patch";

/// Options used when none are configured.
pub const DEFAULT_PATCH_OPTIONS: &str = "-p1";

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `program` with `args` in `cwd`, feeding `stdin` from a file when
    /// given, and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while opening `stdin`, spawning, or
    /// running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gae_bundler::patch::{CommandExecutor, SystemCommandExecutor};
    /// use std::path::Path;
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("patch", &["--version".to_owned()], Path::new("."), None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), gae_bundler::error::BundlerError>(())
    /// ```
    fn run(&self, program: &str, args: &[String], cwd: &Path, stdin: Option<&Path>)
    -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        stdin: Option<&Path>,
    ) -> Result<Output> {
        let mut command = Command::new(program);
        command.args(args).current_dir(cwd);
        if let Some(input) = stdin {
            command.stdin(Stdio::from(File::open(input)?));
        }
        command.output().map_err(BundlerError::from)
    }
}

/// Split configured patch options on spaces, dropping empty pieces.
///
/// # Examples
///
/// ```
/// use gae_bundler::patch::patch_arguments;
///
/// assert_eq!(patch_arguments("-p1  --forward"), vec!["-p1", "--forward"]);
/// assert_eq!(patch_arguments(""), vec!["-p1"]);
/// ```
#[must_use]
pub fn patch_arguments(options: &str) -> Vec<String> {
    let args: Vec<String> = options
        .split(' ')
        .filter(|piece| !piece.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if args.is_empty() {
        vec![DEFAULT_PATCH_OPTIONS.to_owned()]
    } else {
        args
    }
}

/// Apply `patch_file` to the SDK tree at `sdk_root`.
///
/// # Errors
///
/// Returns [`BundlerError::PatchFailed`] when `patch` exits unsuccessfully,
/// or an I/O error when it cannot be run.
pub fn apply_patch(
    executor: &dyn CommandExecutor,
    sdk_root: &Path,
    options: &str,
    patch_file: &Path,
) -> Result<()> {
    let args = patch_arguments(options);
    info!(
        "patching {} with {} ({})",
        sdk_root.display(),
        patch_file.display(),
        args.join(" ")
    );
    let output = executor.run(PATCH_PROGRAM, &args, sdk_root, Some(patch_file))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BundlerError::PatchFailed {
            status: output.status.to_string(),
            stderr: stderr.trim().to_owned(),
        });
    }
    Ok(())
}
