//! Scoped lifecycle of the inspection sandbox.
//!
//! A [`Sandbox`] records every container and image it creates and removes
//! them in [`Sandbox::teardown`], which `Drop` also calls. Holding the value
//! for the duration of a run guarantees release on every exit path,
//! including early returns on fatal inspection errors.

use std::sync::Arc;

use debqueue_common::error::{DebqueueError, Result};
use debqueue_common::types::{ContainerId, ImageId};

use crate::backend::SandboxBackend;
use crate::exec::ExecOutput;
use crate::plan::SandboxPlan;

/// One shared snapshot image and one long-lived execution context.
pub struct Sandbox {
    backend: Arc<dyn SandboxBackend>,
    snapshot: Option<ImageId>,
    context: Option<ContainerId>,
    containers: Vec<ContainerId>,
}

impl Sandbox {
    /// Creates an empty sandbox bound to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn SandboxBackend>) -> Self {
        Self {
            backend,
            snapshot: None,
            context: None,
            containers: Vec::new(),
        }
    }

    /// Prepares the snapshot and the inspection context in one step.
    ///
    /// Anything created before a failure is removed when the partially
    /// prepared sandbox is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if either preparation step fails.
    pub fn prepare(backend: Arc<dyn SandboxBackend>, plan: &SandboxPlan) -> Result<Self> {
        let mut sandbox = Self::new(backend);
        let _ = sandbox.prepare_snapshot(plan)?;
        let _ = sandbox.prepare_context(plan)?;
        Ok(sandbox)
    }

    /// Runs the warm-up command in a throwaway seed container and commits it.
    ///
    /// # Errors
    ///
    /// Returns `WarmUpFailed` carrying the seed status and logs if warm-up
    /// exits non-zero, or any backend error.
    pub fn prepare_snapshot(&mut self, plan: &SandboxPlan) -> Result<&ImageId> {
        let seed = self.backend.create(&plan.seed_spec())?;
        self.containers.push(seed.clone());
        tracing::info!(name = %plan.seed_name, id = %seed, "created seed container");

        for (src, dst) in &plan.injections {
            self.backend.copy_into(&seed, src, dst)?;
        }

        self.backend.start(&seed)?;
        let status = self.backend.wait(&seed)?;
        if status != 0 {
            let logs = self.backend.logs(&seed).unwrap_or_default();
            return Err(DebqueueError::WarmUpFailed {
                container: plan.seed_name.clone(),
                status,
                logs,
            });
        }

        let image = self
            .backend
            .commit(&seed, &plan.snapshot_repo, &plan.snapshot_tag)?;
        tracing::info!(image = %image, "snapshot committed");
        self.snapshot = Some(image);

        match self.backend.remove(&seed) {
            Ok(()) => self.containers.retain(|c| *c != seed),
            Err(e) => tracing::warn!(id = %seed, error = %e, "seed container left for teardown"),
        }

        self.snapshot.as_ref().ok_or_else(|| DebqueueError::Sandbox {
            message: "snapshot missing after commit".into(),
        })
    }

    /// Starts the idle inspection context from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if no snapshot has been prepared or the container
    /// cannot be created and started.
    pub fn prepare_context(&mut self, plan: &SandboxPlan) -> Result<&ContainerId> {
        let snapshot = self.snapshot.clone().ok_or_else(|| DebqueueError::Sandbox {
            message: "context requested before snapshot".into(),
        })?;

        let id = self.backend.create(&plan.context_spec(&snapshot))?;
        self.containers.push(id.clone());
        self.backend.start(&id)?;
        tracing::info!(name = %plan.context_name, id = %id, "inspection context running");

        Ok(&*self.context.insert(id))
    }

    /// Executes a command in the inspection context.
    ///
    /// Safe to call from several threads at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is not running or the backend fails.
    pub fn exec(&self, cmd: &[String]) -> Result<ExecOutput> {
        let id = self.context.as_ref().ok_or_else(|| DebqueueError::Sandbox {
            message: "inspection context is not running".into(),
        })?;
        self.backend.exec(id, cmd)
    }

    /// Returns the committed snapshot, if any.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&ImageId> {
        self.snapshot.as_ref()
    }

    /// Returns the running inspection context, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&ContainerId> {
        self.context.as_ref()
    }

    /// Returns whether nothing remains to be released.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.containers.is_empty() && self.snapshot.is_none()
    }

    /// Removes every container, then the snapshot.
    ///
    /// Failures are logged and do not stop the remaining removals.
    /// Calling this more than once is harmless.
    pub fn teardown(&mut self) {
        self.context = None;
        for id in self.containers.drain(..).rev() {
            if let Err(e) = self.backend.remove(&id) {
                tracing::warn!(id = %id, error = %e, "failed to remove container");
            }
        }
        if let Some(image) = self.snapshot.take() {
            match self.backend.remove_image(&image) {
                Ok(()) => tracing::info!(image = %image, "sandbox torn down"),
                Err(e) => tracing::warn!(image = %image, error = %e, "failed to remove snapshot"),
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("snapshot", &self.snapshot)
            .field("context", &self.context)
            .field("containers", &self.containers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use debqueue_common::config::Settings;

    use super::*;
    use crate::backend::ContainerSpec;

    #[derive(Default)]
    struct RecordingBackend {
        seed_status: i32,
        fail_remove: bool,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingBackend {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SandboxBackend for RecordingBackend {
        fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
            self.record(format!("create {}", spec.name));
            Ok(ContainerId::new(spec.name.clone()))
        }

        fn copy_into(&self, id: &ContainerId, src: &Path, dst: &str) -> Result<()> {
            self.record(format!("copy {} {id}:{dst}", src.display()));
            Ok(())
        }

        fn start(&self, id: &ContainerId) -> Result<()> {
            self.record(format!("start {id}"));
            Ok(())
        }

        fn wait(&self, id: &ContainerId) -> Result<i32> {
            self.record(format!("wait {id}"));
            Ok(self.seed_status)
        }

        fn logs(&self, _id: &ContainerId) -> Result<String> {
            Ok("apt failure".into())
        }

        fn commit(&self, id: &ContainerId, repo: &str, tag: &str) -> Result<ImageId> {
            self.record(format!("commit {id} {repo}:{tag}"));
            Ok(ImageId::tagged(repo, tag))
        }

        fn exec(&self, id: &ContainerId, cmd: &[String]) -> Result<ExecOutput> {
            self.record(format!("exec {id} {}", cmd.join(" ")));
            Ok(ExecOutput::new(0, "ok", ""))
        }

        fn remove(&self, id: &ContainerId) -> Result<()> {
            self.record(format!("rm {id}"));
            if self.fail_remove {
                return Err(DebqueueError::Sandbox {
                    message: "busy".into(),
                });
            }
            Ok(())
        }

        fn remove_image(&self, image: &ImageId) -> Result<()> {
            self.record(format!("rmi {image}"));
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn plan() -> SandboxPlan {
        let settings = Settings::from_yaml(
            "image:\n  name: builder\ncontainer: ci\naptly:\n  repo: pkgs\n  repo_url: http://repo\n",
        )
        .expect("settings");
        SandboxPlan::with_timestamp(&settings, "focal", 7).with_injection("recipes", "/recipes")
    }

    #[test]
    fn prepare_commits_snapshot_and_starts_context() {
        let backend = Arc::new(RecordingBackend::default());
        let sandbox = Sandbox::prepare(backend.clone(), &plan()).expect("prepare");

        assert_eq!(
            sandbox.snapshot().map(ImageId::as_str),
            Some("builder-inspect-7:focal")
        );
        assert_eq!(
            sandbox.context().map(ContainerId::as_str),
            Some("ci-focal-7-inspect")
        );
        assert_eq!(
            backend.calls(),
            vec![
                "create ci-focal-7",
                "copy recipes ci-focal-7:/recipes",
                "start ci-focal-7",
                "wait ci-focal-7",
                "commit ci-focal-7 builder-inspect-7:focal",
                "rm ci-focal-7",
                "create ci-focal-7-inspect",
                "start ci-focal-7-inspect",
            ]
        );
    }

    #[test]
    fn exec_runs_in_context() {
        let backend = Arc::new(RecordingBackend::default());
        let sandbox = Sandbox::prepare(backend.clone(), &plan()).expect("prepare");
        let out = sandbox
            .exec(&["apt-cache".into(), "show".into(), "app".into()])
            .expect("exec");
        assert_eq!(out.stdout, "ok");
        assert!(
            backend
                .calls()
                .contains(&"exec ci-focal-7-inspect apt-cache show app".to_owned())
        );
    }

    #[test]
    fn exec_without_context_fails() {
        let sandbox = Sandbox::new(Arc::new(RecordingBackend::default()));
        assert!(sandbox.exec(&["true".into()]).is_err());
    }

    #[test]
    fn drop_removes_context_and_snapshot() {
        let backend = Arc::new(RecordingBackend::default());
        {
            let _sandbox = Sandbox::prepare(backend.clone(), &plan()).expect("prepare");
        }
        let calls = backend.calls();
        let tail = &calls[calls.len() - 2..];
        assert_eq!(tail, ["rm ci-focal-7-inspect", "rmi builder-inspect-7:focal"]);
    }

    #[test]
    fn failed_warm_up_reports_logs_and_cleans_seed() {
        let backend = Arc::new(RecordingBackend {
            seed_status: 3,
            ..RecordingBackend::default()
        });
        let err = Sandbox::prepare(backend.clone(), &plan()).expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("exited with 3"), "got: {msg}");
        assert!(msg.contains("apt failure"), "got: {msg}");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(backend.calls().last().map(String::as_str), Some("rm ci-focal-7"));
    }

    #[test]
    fn injections_are_copied_before_warm_up() {
        let recipes = tempfile::tempdir().expect("tempdir");
        let bin = tempfile::tempdir().expect("tempdir");
        let plan = plan()
            .with_injection(recipes.path(), "/srv/recipes")
            .with_injection(bin.path(), "/bin");
        let backend = Arc::new(RecordingBackend::default());
        let _sandbox = Sandbox::prepare(backend.clone(), &plan).expect("prepare");

        let calls = backend.calls();
        let copies: Vec<String> = calls
            .iter()
            .filter(|c| c.starts_with("copy "))
            .cloned()
            .collect();
        assert_eq!(
            copies,
            vec![
                "copy recipes ci-focal-7:/recipes".to_owned(),
                format!("copy {} ci-focal-7:/srv/recipes", recipes.path().display()),
                format!("copy {} ci-focal-7:/bin", bin.path().display()),
            ]
        );
        let start = calls.iter().position(|c| c == "start ci-focal-7").expect("start");
        let last_copy = calls.iter().rposition(|c| c.starts_with("copy ")).expect("copy");
        assert!(last_copy < start);
    }

    #[test]
    fn teardown_is_idempotent_and_tolerates_failures() {
        let backend = Arc::new(RecordingBackend {
            fail_remove: true,
            ..RecordingBackend::default()
        });
        let mut sandbox = Sandbox::prepare(backend.clone(), &plan()).expect("prepare");
        sandbox.teardown();
        assert!(sandbox.is_torn_down());
        let after_first = backend.calls().len();
        sandbox.teardown();
        drop(sandbox);
        assert_eq!(backend.calls().len(), after_first);
        assert_eq!(
            backend.calls().last().map(String::as_str),
            Some("rmi builder-inspect-7:focal")
        );
    }
}
