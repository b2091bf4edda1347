//! Naming and environment of the containers a sandbox creates.

use std::path::PathBuf;

use debqueue_common::config::Settings;
use debqueue_common::constants::{IDLE_COMMAND, SANDBOX_RECIPES_DIR, SEED_COMMAND};
use debqueue_common::types::ImageId;

use crate::backend::ContainerSpec;

/// Everything needed to build the snapshot and the inspection context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPlan {
    /// Base build image (`{image}:{distribution}`).
    pub base_image: ImageId,
    /// Repository the snapshot is committed to.
    pub snapshot_repo: String,
    /// Tag of the committed snapshot.
    pub snapshot_tag: String,
    /// Name of the throwaway seed container.
    pub seed_name: String,
    /// Name of the long-lived inspection container.
    pub context_name: String,
    /// Warm-up command run in the seed container.
    pub seed_command: Vec<String>,
    /// Environment of the seed container.
    pub seed_env: Vec<(String, String)>,
    /// Environment of the inspection container.
    pub context_env: Vec<(String, String)>,
    /// Working directory of the inspection container.
    pub workdir: String,
    /// Host directories copied into the seed container before warm-up.
    pub injections: Vec<(PathBuf, String)>,
}

impl SandboxPlan {
    /// Derives a plan for `distribution`, stamping names with the current time.
    #[must_use]
    pub fn new(settings: &Settings, distribution: &str) -> Self {
        Self::with_timestamp(settings, distribution, chrono::Utc::now().timestamp())
    }

    /// Derives a plan for `distribution` using an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(settings: &Settings, distribution: &str, timestamp: i64) -> Self {
        let image = &settings.image.name;
        let seed_name = format!("{}-{distribution}-{timestamp}", settings.container);
        Self {
            base_image: ImageId::tagged(image, distribution),
            snapshot_repo: format!("{image}-inspect-{timestamp}"),
            snapshot_tag: distribution.to_owned(),
            context_name: format!("{seed_name}-inspect"),
            seed_name,
            seed_command: SEED_COMMAND.iter().map(|s| (*s).to_owned()).collect(),
            seed_env: vec![
                ("SKIP_UPDATE".to_owned(), "0".to_owned()),
                (
                    "APT_SOURCES".to_owned(),
                    settings.apt_sources(distribution).join("\n"),
                ),
            ],
            context_env: vec![
                ("SKIP_DEBUG".to_owned(), "1".to_owned()),
                ("SKIP_UPDATE".to_owned(), "1".to_owned()),
            ],
            workdir: SANDBOX_RECIPES_DIR.to_owned(),
            injections: Vec::new(),
        }
    }

    /// Adds a host directory to copy into the seed container.
    #[must_use]
    pub fn with_injection(mut self, src: impl Into<PathBuf>, dst: impl Into<String>) -> Self {
        self.injections.push((src.into(), dst.into()));
        self
    }

    /// Spec of the seed container running the warm-up command.
    #[must_use]
    pub fn seed_spec(&self) -> ContainerSpec {
        ContainerSpec {
            name: self.seed_name.clone(),
            image: self.base_image.to_string(),
            command: self.seed_command.clone(),
            override_entrypoint: false,
            env: self.seed_env.clone(),
            workdir: None,
            tty: true,
            host_network: true,
        }
    }

    /// Spec of the idle inspection container created from `snapshot`.
    #[must_use]
    pub fn context_spec(&self, snapshot: &ImageId) -> ContainerSpec {
        ContainerSpec {
            name: self.context_name.clone(),
            image: snapshot.to_string(),
            command: IDLE_COMMAND.iter().map(|s| (*s).to_owned()).collect(),
            override_entrypoint: true,
            env: self.context_env.clone(),
            workdir: Some(self.workdir.clone()),
            tty: true,
            host_network: true,
        }
    }
}
