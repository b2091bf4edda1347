//! Backend driving the `docker` command-line client.
//!
//! Every operation spawns an independent client process, so concurrent
//! execs into one container never share a connection.

use std::path::{Path, PathBuf};

use debqueue_common::constants::DOCKER_BINARY;
use debqueue_common::error::{DebqueueError, Result};
use debqueue_common::types::{ContainerId, ImageId};

use super::{ContainerSpec, SandboxBackend};
use crate::exec::{ExecOutput, run_host_command};

/// Backend that shells out to the Docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCliBackend {
    binary: String,
}

impl DockerCliBackend {
    /// Creates a backend using the `docker` binary from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: DOCKER_BINARY.to_owned(),
        }
    }

    /// Creates a backend using a specific client binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: Vec<String>) -> Result<ExecOutput> {
        run_host_command(&self.binary, &args)
    }

    /// Runs a client command that must succeed, returning trimmed stdout.
    fn run_ok(&self, args: Vec<String>) -> Result<String> {
        let action = args.first().cloned().unwrap_or_default();
        let output = self.run(args)?;
        if !output.success() {
            return Err(DebqueueError::Sandbox {
                message: format!(
                    "{} {action} exited with {}: {}",
                    self.binary,
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }
        Ok(output.stdout.trim().to_owned())
    }
}

impl Default for DockerCliBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the `docker create` argument list for a spec.
pub(crate) fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_owned(), "--name".to_owned(), spec.name.clone()];
    if spec.host_network {
        args.extend(["--network".to_owned(), "host".to_owned()]);
    }
    if spec.tty {
        args.push("--tty".to_owned());
    }
    for (key, value) in &spec.env {
        args.extend(["--env".to_owned(), format!("{key}={value}")]);
    }
    if let Some(workdir) = &spec.workdir {
        args.extend(["--workdir".to_owned(), workdir.clone()]);
    }

    let mut command = spec.command.iter();
    if spec.override_entrypoint {
        if let Some(entrypoint) = command.next() {
            args.extend(["--entrypoint".to_owned(), entrypoint.clone()]);
        }
    }
    args.push(spec.image.clone());
    args.extend(command.cloned());
    args
}

impl SandboxBackend for DockerCliBackend {
    fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        tracing::info!(name = %spec.name, image = %spec.image, "creating container");
        let id = self.run_ok(create_args(spec))?;
        Ok(ContainerId::new(id))
    }

    fn copy_into(&self, id: &ContainerId, src: &Path, dst: &str) -> Result<()> {
        tracing::debug!(id = %id, src = %src.display(), dst, "copying into container");
        let src: PathBuf = src.join(".");
        let _ = self.run_ok(vec![
            "cp".to_owned(),
            src.to_string_lossy().into_owned(),
            format!("{id}:{dst}"),
        ])?;
        Ok(())
    }

    fn start(&self, id: &ContainerId) -> Result<()> {
        tracing::debug!(id = %id, "starting container");
        let _ = self.run_ok(vec!["start".to_owned(), id.to_string()])?;
        Ok(())
    }

    fn wait(&self, id: &ContainerId) -> Result<i32> {
        let status = self.run_ok(vec!["wait".to_owned(), id.to_string()])?;
        status.parse().map_err(|_| DebqueueError::Sandbox {
            message: format!("unexpected wait status for {id}: {status:?}"),
        })
    }

    fn logs(&self, id: &ContainerId) -> Result<String> {
        let output = self.run(vec!["logs".to_owned(), id.to_string()])?;
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    fn commit(&self, id: &ContainerId, repo: &str, tag: &str) -> Result<ImageId> {
        let image = ImageId::tagged(repo, tag);
        tracing::info!(id = %id, image = %image, "committing snapshot");
        let _ = self.run_ok(vec!["commit".to_owned(), id.to_string(), image.to_string()])?;
        Ok(image)
    }

    fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput> {
        if cmd.is_empty() {
            return Err(DebqueueError::Config {
                message: "exec command is empty".into(),
            });
        }
        let mut args = vec!["exec".to_owned(), id.to_string()];
        args.extend(cmd.iter().cloned());
        self.run(args)
    }

    fn remove(&self, id: &ContainerId) -> Result<()> {
        tracing::debug!(id = %id, "removing container");
        let _ = self.run_ok(vec!["rm".to_owned(), "--force".to_owned(), id.to_string()])?;
        Ok(())
    }

    fn remove_image(&self, image: &ImageId) -> Result<()> {
        tracing::debug!(image = %image, "removing image");
        let _ = self.run_ok(vec!["rmi".to_owned(), image.to_string()])?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}
