//! External command invocation behind a test seam.

use std::path::Path;
use std::process::Command;

/// Captured outcome of a process that actually ran.
///
/// A non-zero exit is not folded into an error here: the lint and policy
/// tools exit non-zero exactly when findings exist, and the scanners must
/// be able to inspect stdout before deciding whether the run failed.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status_code: Option<i32>,
    pub success: bool,
}

/// Capability seam for running external binaries.
///
/// An `Err` from `run` means the process could not be started at all
/// (binary missing, spawn failure) and is always fatal to the scan.
pub trait CommandRunner: Send + Sync {
    fn run(&self, dir: Option<&Path>, program: &str, args: &[String])
        -> std::io::Result<CommandOutput>;
}

/// Production runner backed by `std::process::Command`.
pub struct OsCommandRunner;

impl CommandRunner for OsCommandRunner {
    fn run(
        &self,
        dir: Option<&Path>,
        program: &str,
        args: &[String],
    ) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status_code: output.status.code(),
            success: output.status.success(),
        })
    }
}
