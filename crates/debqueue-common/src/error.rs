//! Unified error taxonomy for the debqueue workspace.
//!
//! A missing recipe is not an error: the inspector reports it as `Ok(None)`
//! and the package drops out of the graph.

use std::path::PathBuf;

use thiserror::Error;

/// Exit status used when a run is interrupted by a signal.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DebqueueError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A recipe exists but its metadata cannot be used.
    #[error("malformed metadata for package {package}: {message}")]
    MalformedMetadata {
        /// Package whose recipe produced the metadata.
        package: String,
        /// What was wrong with it.
        message: String,
    },

    /// A command run inside the sandbox exited with an unexpected status.
    #[error("inspection of {package} failed: `{command}` exited with {exit_code}: {stderr}")]
    InspectionFailure {
        /// Package being inspected.
        package: String,
        /// Command line that was executed.
        command: String,
        /// Exit status reported by the sandbox.
        exit_code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Build-dependencies form a cycle.
    #[error("cyclic build dependency detected: {}", path.join(" -> "))]
    CycleDetected {
        /// Identifiers along the cycle, first and last being equal.
        path: Vec<String>,
    },

    /// The sandbox could not be prepared or driven.
    #[error("sandbox error: {message}")]
    Sandbox {
        /// Description of the failure.
        message: String,
    },

    /// The warm-up command of the seed container exited non-zero.
    #[error("seed container {container} exited with {status}:\n{logs}")]
    WarmUpFailed {
        /// Name of the seed container.
        container: String,
        /// Exit status of the warm-up command.
        status: i32,
        /// Seed container logs.
        logs: String,
    },

    /// The run was cancelled before it completed.
    #[error("interrupted")]
    Interrupted,
}

impl DebqueueError {
    /// Returns the process exit status this error should terminate with.
    ///
    /// Failed sandbox commands propagate their own status when it is a
    /// valid process exit status.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InspectionFailure {
                exit_code: status, ..
            }
            | Self::WarmUpFailed { status, .. }
                if *status > 0 && *status <= 255 =>
            {
                *status
            }
            Self::Interrupted => INTERRUPTED_EXIT_CODE,
            _ => 1,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DebqueueError>;
