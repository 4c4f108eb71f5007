//! Narrow wrapper around the external yt-dlp binary.
//!
//! Everything the crate needs from the tool goes through [`YtDlp::run`], which
//! reports exit status, stdout and stderr. Tests point the wrapper at a shell
//! stub instead of the real binary.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::ArchiveError;

/// Handle on the yt-dlp program. Holds only the program path so the wrapper
/// stays cheap to clone into helpers and tests.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
        }
    }

    /// Uses an alternative program, e.g. a stub script in tests.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `--version` to fail loudly when yt-dlp is missing from PATH.
    pub fn ensure_available(&self) -> Result<(), ArchiveError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(ArchiveError::ToolInvocation(format!(
                "{} is installed but returned a failure status",
                self.program.display()
            ))),
            Err(err) => Err(ArchiveError::ToolInvocation(format!(
                "{} is not installed or not in PATH: {err}",
                self.program.display()
            ))),
        }
    }

    /// Runs the tool to completion, capturing stdout and stderr.
    ///
    /// No timeout is imposed; a hang in the tool hangs the run.
    pub fn run<I, S>(&self, args: I) -> Result<ToolOutput, ArchiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|err| {
                ArchiveError::ToolInvocation(format!(
                    "failed to launch {}: {err}",
                    self.program.display()
                ))
            })?;

        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Captured result of one tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Trimmed stderr, or `fallback` when the tool died silently.
    pub fn error_message(&self, fallback: &str) -> String {
        let trimmed = self.stderr.trim();
        if trimmed.is_empty() {
            fallback.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::tempdir;

    fn install_stub(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("yt-dlp");
        fs::write(&path, format!("#!/usr/bin/env bash\n{body}\n")).unwrap();
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
        }
        path
    }

    #[test]
    fn run_captures_stdout_and_status() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), "echo payload; echo noise >&2");
        let output = YtDlp::with_program(stub).run(["-J"]).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "payload");
        assert_eq!(output.stderr.trim(), "noise");
    }

    #[test]
    fn error_message_prefers_stderr() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), "echo 'ERROR: private video' >&2; exit 1");
        let output = YtDlp::with_program(stub).run(["x"]).unwrap();
        assert!(!output.success());
        assert_eq!(output.error_message("fallback"), "ERROR: private video");
    }

    #[test]
    fn error_message_falls_back_when_stderr_empty() {
        let dir = tempdir().unwrap();
        let stub = install_stub(dir.path(), "exit 1");
        let output = YtDlp::with_program(stub).run(["x"]).unwrap();
        assert_eq!(output.error_message("fallback"), "fallback");
    }

    #[test]
    fn missing_program_is_a_tool_error() {
        let dir = tempdir().unwrap();
        let tool = YtDlp::with_program(dir.path().join("does-not-exist"));
        let err = tool.run(["--version"]).unwrap_err();
        assert!(matches!(err, ArchiveError::ToolInvocation(_)));
        assert!(tool.ensure_available().is_err());
    }
}
