//! Scripted sandbox backend and recipe fixtures shared by the integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use debqueue_common::config::{ResolveConfig, Settings};
use debqueue_common::error::{DebqueueError, Result};
use debqueue_common::types::{ContainerId, ImageId};
use debqueue_resolve::{Resolution, resolve_build_queue};
use debqueue_sandbox::{ContainerSpec, ExecOutput, SandboxBackend, SandboxPlan};

/// Backend answering `fpm-cook inspect` and `apt-cache show` from scripts.
#[derive(Default)]
pub struct ScriptedBackend {
    recipes: Mutex<HashMap<String, ExecOutput>>,
    apt: Mutex<HashMap<String, ExecOutput>>,
    execs: Mutex<Vec<Vec<String>>>,
    events: Mutex<Vec<String>>,
    delay: Duration,
    interrupt_on_wait: Option<Arc<AtomicBool>>,
}

impl ScriptedBackend {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Raises `flag` and fails `wait`, as a signal delivered to the client would.
    pub fn interrupt_on_wait(flag: Arc<AtomicBool>) -> Self {
        Self {
            interrupt_on_wait: Some(flag),
            ..Self::default()
        }
    }

    pub fn set_recipe(&self, name: &str, output: ExecOutput) {
        let _ = self.recipes.lock().unwrap().insert(name.to_owned(), output);
    }

    pub fn set_apt(&self, name: &str, output: ExecOutput) {
        let _ = self.apt.lock().unwrap().insert(name.to_owned(), output);
    }

    pub fn execs(&self) -> Vec<Vec<String>> {
        self.execs.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Number of execs whose program is `program` and last argument mentions `package`.
    pub fn count(&self, program: &str, package: &str) -> usize {
        self.execs()
            .iter()
            .filter(|cmd| {
                cmd[0] == program
                    && cmd
                        .last()
                        .is_some_and(|arg| arg == package || arg.starts_with(&format!("{package}/")))
            })
            .count()
    }

    /// Whether every created container was removed.
    pub fn containers_removed(&self) -> bool {
        let events = self.events();
        let created = events.iter().filter(|e| e.starts_with("create ")).count();
        let removed = events.iter().filter(|e| e.starts_with("rm ")).count();
        created > 0 && created == removed
    }

    /// Whether every container and the snapshot were removed.
    pub fn torn_down(&self) -> bool {
        self.containers_removed() && self.events().iter().any(|e| e.starts_with("rmi "))
    }

    fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl SandboxBackend for ScriptedBackend {
    fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.event(format!("create {}", spec.name));
        Ok(ContainerId::new(spec.name.clone()))
    }

    fn copy_into(&self, _id: &ContainerId, _src: &Path, _dst: &str) -> Result<()> {
        Ok(())
    }

    fn start(&self, _id: &ContainerId) -> Result<()> {
        Ok(())
    }

    fn wait(&self, id: &ContainerId) -> Result<i32> {
        if let Some(flag) = &self.interrupt_on_wait {
            flag.store(true, Ordering::SeqCst);
            return Err(DebqueueError::Sandbox {
                message: format!("docker wait {id} exited with 130"),
            });
        }
        Ok(0)
    }

    fn logs(&self, _id: &ContainerId) -> Result<String> {
        Ok(String::new())
    }

    fn commit(&self, _id: &ContainerId, repo: &str, tag: &str) -> Result<ImageId> {
        Ok(ImageId::tagged(repo, tag))
    }

    fn exec(&self, _id: &ContainerId, cmd: &[String]) -> Result<ExecOutput> {
        self.execs.lock().unwrap().push(cmd.to_vec());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match cmd.first().map(String::as_str) {
            Some("fpm-cook") => {
                let package = cmd[2].split('/').next().unwrap_or_default();
                Ok(self
                    .recipes
                    .lock()
                    .unwrap()
                    .get(package)
                    .cloned()
                    .unwrap_or_else(|| ExecOutput::new(1, "", "unknown recipe")))
            }
            Some("apt-cache") => Ok(self
                .apt
                .lock()
                .unwrap()
                .get(&cmd[2])
                .cloned()
                .unwrap_or_else(|| ExecOutput::new(100, "", "E: No packages found"))),
            _ => Ok(ExecOutput::new(127, "", "command not found")),
        }
    }

    fn remove(&self, id: &ContainerId) -> Result<()> {
        self.event(format!("rm {id}"));
        Ok(())
    }

    fn remove_image(&self, image: &ImageId) -> Result<()> {
        self.event(format!("rmi {image}"));
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Temporary recipes directory wired to a scripted backend.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub backend: Arc<ScriptedBackend>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_backend(ScriptedBackend::default())
    }

    pub fn with_backend(backend: ScriptedBackend) -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
            backend: Arc::new(backend),
        }
    }

    /// Writes `recipes/<name>/recipe.rb` without scripting the inspect output.
    pub fn recipe_file(&self, name: &str) -> &Self {
        let pkg_dir = self.dir.path().join(name);
        std::fs::create_dir_all(&pkg_dir).expect("mkdir");
        std::fs::write(pkg_dir.join("recipe.rb"), "class Recipe; end\n").expect("write");
        self
    }

    /// Adds a recipe whose inspection prints `metadata`.
    pub fn recipe(&self, name: &str, metadata: &serde_json::Value) -> &Self {
        let _ = self.recipe_file(name);
        self.backend
            .set_recipe(name, ExecOutput::new(0, metadata.to_string(), ""));
        self
    }

    /// Adds a focal recipe at version 1.0-1 with the given build-dependencies.
    pub fn simple(&self, name: &str, deps: &[&str]) -> &Self {
        self.recipe(
            name,
            &serde_json::json!({
                "version": "1.0",
                "revision": 1,
                "build_depends": deps,
                "ubuntu_distribution": ["bionic", "focal"],
            }),
        )
    }

    /// Scripts `apt-cache show <apt_name>` to report `versions`.
    pub fn published(&self, apt_name: &str, versions: &[&str]) -> &Self {
        let stdout: String = versions
            .iter()
            .map(|v| format!("Package: {apt_name}\nVersion: {v}\nArchitecture: amd64\n\n"))
            .collect();
        self.backend.set_apt(apt_name, ExecOutput::new(0, stdout, ""));
        self
    }

    pub fn config(&self) -> ResolveConfig {
        ResolveConfig::new("focal")
            .with_recipes_dir(self.dir.path())
            .with_workers(4)
    }

    pub fn plan(&self) -> SandboxPlan {
        let settings = Settings::from_yaml(
            "image:\n  name: builder\ncontainer: ci\naptly:\n  repo: pkgs\n  repo_url: http://repo\n",
        )
        .expect("settings");
        SandboxPlan::with_timestamp(&settings, "focal", 42)
            .with_injection(self.dir.path(), "/recipes")
    }

    pub fn resolve_with(&self, config: &ResolveConfig, names: &[&str]) -> Result<Resolution> {
        resolve_build_queue(
            self.backend.clone(),
            &self.plan(),
            config,
            names,
            &AtomicBool::new(false),
        )
    }

    pub fn resolve(&self, names: &[&str]) -> Result<Resolution> {
        self.resolve_with(&self.config(), names)
    }
}
