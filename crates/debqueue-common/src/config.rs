//! Configuration values threaded through a resolution run.
//!
//! Nothing here is global: the CLI builds a [`ResolveConfig`] and a
//! [`Settings`] once and passes them down explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{DebqueueError, Result};

/// Parameters of a single build-queue resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Distribution the queue is built for (e.g. `focal`).
    pub distribution: String,
    /// Bypass the distribution and already-uploaded skip policies.
    pub force_build: bool,
    /// Only build-dependencies starting with this prefix are tracked.
    pub owned_prefix: String,
    /// Host directory containing one sub-directory per recipe.
    pub recipes_dir: PathBuf,
    /// Recipe file name inside each package directory.
    pub recipe_file: String,
    /// Recipe tool invoked inside the sandbox.
    pub inspect_tool: String,
    /// Number of discovery workers.
    pub workers: usize,
}

impl ResolveConfig {
    /// Creates a configuration for `distribution` with default settings.
    #[must_use]
    pub fn new(distribution: impl Into<String>) -> Self {
        Self {
            distribution: distribution.into(),
            force_build: false,
            owned_prefix: String::new(),
            recipes_dir: PathBuf::from(constants::DEFAULT_RECIPES_DIR),
            recipe_file: constants::DEFAULT_RECIPE_FILE.to_owned(),
            inspect_tool: constants::DEFAULT_INSPECT_TOOL.to_owned(),
            workers: default_workers(),
        }
    }

    /// Sets the force-build flag.
    #[must_use]
    pub const fn with_force_build(mut self, force_build: bool) -> Self {
        self.force_build = force_build;
        self
    }

    /// Sets the ownership prefix for tracked build-dependencies.
    #[must_use]
    pub fn with_owned_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.owned_prefix = prefix.into();
        self
    }

    /// Sets the host recipes directory.
    #[must_use]
    pub fn with_recipes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recipes_dir = dir.into();
        self
    }

    /// Sets the number of discovery workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Path of the recipe file for `package` relative to the recipes directory.
    #[must_use]
    pub fn recipe_path(&self, package: &str) -> String {
        format!("{package}/{}", self.recipe_file)
    }

    /// Returns whether a recipe for `package` exists on the host.
    #[must_use]
    pub fn has_recipe(&self, package: &str) -> bool {
        self.recipes_dir
            .join(package)
            .join(&self.recipe_file)
            .is_file()
    }
}

/// Available parallelism plus one, the discovery pool size.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get) + 1
}

/// Base build image settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Image repository; the tag is the target distribution.
    pub name: String,
}

/// Package repository settings used to compute APT sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptlySettings {
    /// Repository name prefix; the distribution is appended.
    pub repo: String,
    /// Public URL the repository is served from.
    pub repo_url: String,
}

/// Project settings loaded from `settings.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Build image.
    pub image: ImageSettings,
    /// Name prefix for every container created by the tool.
    pub container: String,
    /// Package repository.
    pub aptly: AptlySettings,
}

impl Settings {
    /// Parses settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the document is invalid or lacks a key.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| DebqueueError::Config {
            message: format!("cannot parse settings: {e}"),
        })
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading settings");
        let text = std::fs::read_to_string(path).map_err(|e| DebqueueError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&text)
    }

    /// APT source lines pointing at the published repository for `distribution`.
    #[must_use]
    pub fn apt_sources(&self, distribution: &str) -> Vec<String> {
        vec![format!(
            "deb [arch=amd64] {}/{}-{distribution} {distribution} main",
            self.aptly.repo_url, self.aptly.repo
        )]
    }
}
