//! Host process execution shared by the container backends.

use debqueue_common::error::{DebqueueError, Result};

/// Output from a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code returned by the command (`-1` if killed by a signal).
    pub exit_code: i32,
}

impl ExecOutput {
    /// Creates an output value, mostly useful for scripted backends.
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `program` with `args` on the host and captures its output.
///
/// # Errors
///
/// Returns an error if the arguments are empty or the process cannot be spawned.
pub fn run_host_command(program: &str, args: &[String]) -> Result<ExecOutput> {
    tracing::trace!(program, ?args, "running host command");

    if args.is_empty() {
        return Err(DebqueueError::Config {
            message: format!("no arguments given to {program}"),
        });
    }

    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| DebqueueError::Io {
            path: program.into(),
            source: e,
        })?;

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_args_are_rejected() {
        let err = run_host_command("docker", &[]).expect_err("should fail");
        assert!(matches!(err, DebqueueError::Config { .. }));
    }

    #[test]
    fn missing_program_is_io_error() {
        let err = run_host_command("definitely-not-a-real-binary-xyz", &["x".into()])
            .expect_err("should fail");
        assert!(matches!(err, DebqueueError::Io { .. }));
    }

    #[test]
    fn success_tracks_exit_code() {
        assert!(ExecOutput::new(0, "", "").success());
        assert!(!ExecOutput::new(100, "", "").success());
    }
}
