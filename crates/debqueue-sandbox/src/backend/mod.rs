//! Container backend abstraction used by the sandbox.

pub mod docker;

use std::path::Path;

use debqueue_common::error::Result;
use debqueue_common::types::{ContainerId, ImageId};

use crate::exec::ExecOutput;

/// Configuration for creating a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Human-readable container name.
    pub name: String,
    /// Image the container is created from.
    pub image: String,
    /// Command to execute inside the container.
    pub command: Vec<String>,
    /// Replace the image entrypoint with the first element of `command`.
    pub override_entrypoint: bool,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Working directory for the command and for later execs.
    pub workdir: Option<String>,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// Share the host network stack.
    pub host_network: bool,
}

/// Platform-agnostic container backend.
///
/// Implementors must tolerate concurrent `exec` calls against the same
/// container; discovery workers share one inspection context.
pub trait SandboxBackend: Send + Sync {
    /// Creates a container from the given specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    fn create(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Copies the contents of a host directory into a container path.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy_into(&self, id: &ContainerId, src: &Path, dst: &str) -> Result<()>;

    /// Starts a previously created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, id: &ContainerId) -> Result<()>;

    /// Blocks until the container exits and returns its status.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be obtained.
    fn wait(&self, id: &ContainerId) -> Result<i32>;

    /// Returns the combined output of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if logs cannot be retrieved.
    fn logs(&self, id: &ContainerId) -> Result<String>;

    /// Commits a container's filesystem as `repo:tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit(&self, id: &ContainerId, repo: &str, tag: &str) -> Result<ImageId>;

    /// Executes a command inside a running container.
    ///
    /// A non-zero exit status is not an error at this level.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be executed at all.
    fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput>;

    /// Force-removes a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, id: &ContainerId) -> Result<()>;

    /// Removes an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be removed.
    fn remove_image(&self, image: &ImageId) -> Result<()>;

    /// Returns whether this backend is operational on the current host.
    fn is_available(&self) -> bool;
}

/// Creates the default backend for the current host.
#[must_use]
pub fn detect_backend() -> Box<dyn SandboxBackend> {
    Box::new(docker::DockerCliBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_spec_defaults_are_empty() {
        let spec = ContainerSpec::default();
        assert!(spec.command.is_empty());
        assert!(!spec.override_entrypoint);
        assert!(spec.workdir.is_none());
    }
}
