//! In-memory package entity and recipe metadata.

use std::collections::BTreeSet;
use std::fmt;

use debqueue_common::constants::VERSION_MARKER;
use debqueue_common::error::{DebqueueError, Result};
use serde::Deserialize;

use crate::normalize::family_name;

/// Recipe revision, emitted either as a string or as a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Revision {
    /// Textual revision (`"1ubuntu2"`).
    Text(String),
    /// Numeric revision (`3`).
    Number(serde_json::Number),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Metadata emitted by `<tool> inspect` for one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecipeMetadata {
    /// Upstream version.
    pub version: String,
    /// Packaging revision.
    #[serde(default)]
    pub revision: Option<Revision>,
    /// Declared build-dependencies, `name[=constraint]`.
    #[serde(default)]
    pub build_depends: Vec<String>,
    /// Distributions the recipe supports.
    #[serde(default)]
    pub ubuntu_distribution: Vec<String>,
    /// Bucket for sharing a dependency-installation snapshot.
    #[serde(default)]
    pub build_depends_cache_key: Option<String>,
}

impl RecipeMetadata {
    /// Parses the JSON object printed by the recipe tool.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMetadata` if the text is not a JSON object with a
    /// string `version`, or if a field has the wrong shape.
    pub fn from_json(package: &str, text: &str) -> Result<Self> {
        let metadata: Self =
            serde_json::from_str(text).map_err(|e| DebqueueError::MalformedMetadata {
                package: package.to_owned(),
                message: e.to_string(),
            })?;
        if metadata.version.trim().is_empty() {
            return Err(DebqueueError::MalformedMetadata {
                package: package.to_owned(),
                message: "empty version".into(),
            });
        }
        Ok(metadata)
    }

    /// `version-revision`, or just the version without a revision.
    #[must_use]
    pub fn full_version(&self) -> String {
        match &self.revision {
            Some(revision) => format!("{}-{revision}", self.version),
            None => self.version.clone(),
        }
    }
}

/// Extracts the package name from a `name[=constraint]` entry.
fn dependency_name(entry: &str) -> &str {
    let end = entry
        .find(|c: char| matches!(c, '=' | '<' | '>' | '(' | ' '))
        .unwrap_or(entry.len());
    entry[..end].trim()
}

/// One package of the resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    identifier: String,
    version: Option<String>,
    build_dependencies: Vec<String>,
    available_versions: Option<BTreeSet<String>>,
    cache_key: Option<String>,
    supported_distributions: Vec<String>,
}

impl Package {
    /// Creates an entity for `raw_name`, normalized to its family.
    #[must_use]
    pub fn new(raw_name: &str) -> Self {
        Self {
            identifier: resolve_identity(raw_name),
            version: None,
            build_dependencies: Vec::new(),
            available_versions: None,
            cache_key: None,
            supported_distributions: Vec::new(),
        }
    }

    /// Normalized identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Resolved `version[-revision]`, once metadata is attached.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether recipe metadata has been attached.
    #[must_use]
    pub const fn has_metadata(&self) -> bool {
        self.version.is_some()
    }

    /// Tracked build-dependency identifiers, in declaration order.
    #[must_use]
    pub fn build_dependencies(&self) -> &[String] {
        &self.build_dependencies
    }

    /// Bucket for the shared dependency snapshot; defaults to the identifier.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        self.cache_key.as_deref().unwrap_or(&self.identifier)
    }

    /// Distributions declared by the recipe.
    #[must_use]
    pub fn supported_distributions(&self) -> &[String] {
        &self.supported_distributions
    }

    /// Versions already published, once availability has been checked.
    #[must_use]
    pub const fn available_versions(&self) -> Option<&BTreeSet<String>> {
        self.available_versions.as_ref()
    }

    /// Whether availability has been checked.
    #[must_use]
    pub const fn has_availability(&self) -> bool {
        self.available_versions.is_some()
    }

    /// Attaches recipe metadata.
    ///
    /// Dependencies not starting with `owned_prefix` are external and
    /// dropped; the prefix is stripped from the rest, which are then
    /// normalized and de-duplicated. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMetadata` if a dependency entry has no name.
    pub fn attach_metadata(&mut self, metadata: &RecipeMetadata, owned_prefix: &str) -> Result<()> {
        if self.has_metadata() {
            return Ok(());
        }

        let mut dependencies: Vec<String> = Vec::new();
        for entry in &metadata.build_depends {
            let name = dependency_name(entry);
            if name.is_empty() {
                return Err(DebqueueError::MalformedMetadata {
                    package: self.identifier.clone(),
                    message: format!("build dependency without a name: {entry:?}"),
                });
            }
            let Some(owned) = name.strip_prefix(owned_prefix) else {
                continue;
            };
            let identifier = resolve_identity(owned);
            if !dependencies.contains(&identifier) {
                dependencies.push(identifier);
            }
        }

        self.build_dependencies = dependencies;
        self.cache_key = metadata
            .build_depends_cache_key
            .as_ref()
            .map(|key| key.to_lowercase());
        self.supported_distributions = metadata.ubuntu_distribution.clone();
        self.version = Some(metadata.full_version());
        Ok(())
    }

    /// Records published versions parsed from lookup output lines.
    ///
    /// Equivalent to [`Package::attach_availability_as`] with the identifier
    /// as label.
    pub fn attach_availability<S: AsRef<str>>(&mut self, lines: &[S]) {
        let label = self.identifier.clone();
        self.attach_availability_as(&label, lines);
    }

    /// Records published versions, matching package labels against `label`.
    ///
    /// Accepted line shapes: a bare version; `<label> <version>` or
    /// `Version: <version>`; and four tokens whose second is `label`, in
    /// which case the third is the version. Other lines are ignored.
    /// A second call is a no-op.
    pub fn attach_availability_as<S: AsRef<str>>(&mut self, label: &str, lines: &[S]) {
        if self.has_availability() {
            return;
        }
        let versions = lines
            .iter()
            .filter_map(|line| parse_version_line(line.as_ref(), label))
            .map(str::to_owned)
            .collect();
        self.available_versions = Some(versions);
    }

    /// Whether `version` is already published.
    #[must_use]
    pub fn is_built(&self, version: &str) -> bool {
        self.available_versions
            .as_ref()
            .is_some_and(|versions| versions.contains(version))
    }

    /// Whether the resolved version is already published.
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.version().is_some_and(|version| self.is_built(version))
    }

    /// Whether the recipe supports `distribution`.
    #[must_use]
    pub fn supports_distribution(&self, distribution: &str) -> bool {
        self.supported_distributions.iter().any(|d| d == distribution)
    }
}

/// Normalizes a raw package name into its canonical identifier.
#[must_use]
pub fn resolve_identity(raw_name: &str) -> String {
    family_name(raw_name.trim()).to_owned()
}

fn parse_version_line<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [version] => Some(*version),
        [name, version] if *name == label || *name == VERSION_MARKER => Some(*version),
        [_, name, version, _] if *name == label => Some(*version),
        _ => None,
    }
}
