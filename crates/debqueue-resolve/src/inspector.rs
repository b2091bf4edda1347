//! Metadata inspection through the shared sandbox.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use debqueue_common::config::ResolveConfig;
use debqueue_common::constants::{
    APT_FOUND_EXIT_CODE, APT_UNKNOWN_EXIT_CODE, AVAILABILITY_COMMAND, VERSION_MARKER,
};
use debqueue_common::error::{DebqueueError, Result};
use debqueue_sandbox::{ExecOutput, Sandbox};

use crate::package::{Package, RecipeMetadata};
use crate::table::PackageTable;

/// Populates [`Package`] entities by running commands in the sandbox.
///
/// Results are memoized in the [`PackageTable`]; an identifier already
/// present there is never inspected again.
#[derive(Debug)]
pub struct Inspector<'a> {
    sandbox: &'a Sandbox,
    config: &'a ResolveConfig,
    table: &'a PackageTable,
    execs: AtomicUsize,
}

impl<'a> Inspector<'a> {
    /// Creates an inspector writing into `table`.
    #[must_use]
    pub const fn new(sandbox: &'a Sandbox, config: &'a ResolveConfig, table: &'a PackageTable) -> Self {
        Self {
            sandbox,
            config,
            table,
            execs: AtomicUsize::new(0),
        }
    }

    /// Number of sandbox commands issued so far.
    #[must_use]
    pub fn exec_count(&self) -> usize {
        self.execs.load(Ordering::Relaxed)
    }

    /// The table this inspector fills.
    #[must_use]
    pub const fn table(&self) -> &'a PackageTable {
        self.table
    }

    /// Resolves `identifier` into a fully populated package.
    ///
    /// Returns `Ok(None)` when the package has no recipe on disk.
    ///
    /// # Errors
    ///
    /// Returns `InspectionFailure` or `MalformedMetadata`; both are fatal
    /// for the run.
    pub fn inspect(&self, identifier: &str) -> Result<Option<Arc<Package>>> {
        if let Some(package) = self.table.get(identifier) {
            return Ok(Some(package));
        }

        let mut package = Package::new(identifier);
        let Some(metadata) = self.inspect_recipe(package.identifier())? else {
            return Ok(None);
        };
        package.attach_metadata(&metadata, &self.config.owned_prefix)?;

        let lines = self.inspect_availability(package.identifier())?;
        let label = self.apt_name(package.identifier());
        package.attach_availability_as(&label, &lines);

        tracing::debug!(
            package = package.identifier(),
            version = package.version(),
            dependencies = ?package.build_dependencies(),
            "package resolved"
        );
        Ok(Some(self.table.insert(package)))
    }

    /// Runs `<tool> inspect <identifier>/<recipe>` and parses its output.
    ///
    /// A recipe missing from the host recipes directory is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `InspectionFailure` on any non-zero exit and
    /// `MalformedMetadata` if the output cannot be parsed.
    pub fn inspect_recipe(&self, identifier: &str) -> Result<Option<RecipeMetadata>> {
        if !self.config.has_recipe(identifier) {
            tracing::debug!(package = identifier, "recipe not found");
            return Ok(None);
        }

        let command = vec![
            self.config.inspect_tool.clone(),
            "inspect".to_owned(),
            self.config.recipe_path(identifier),
        ];
        tracing::debug!(package = identifier, "inspecting recipe");
        let output = self.run(&command)?;
        if !output.success() {
            return Err(failure(identifier, &command, output));
        }

        RecipeMetadata::from_json(identifier, &output.stdout).map(Some)
    }

    /// Runs the availability lookup and returns its `Version:` lines.
    ///
    /// # Errors
    ///
    /// Returns `InspectionFailure` unless the lookup reports the package
    /// as found or as unknown.
    pub fn inspect_availability(&self, identifier: &str) -> Result<Vec<String>> {
        let mut command: Vec<String> = AVAILABILITY_COMMAND.iter().map(|s| (*s).to_owned()).collect();
        command.push(self.apt_name(identifier));

        tracing::debug!(package = identifier, "looking up published versions");
        let output = self.run(&command)?;
        match output.exit_code {
            APT_FOUND_EXIT_CODE | APT_UNKNOWN_EXIT_CODE => Ok(output
                .stdout
                .lines()
                .filter(|line| line.contains(VERSION_MARKER))
                .map(|line| line.trim().to_owned())
                .collect()),
            _ => Err(failure(identifier, &command, output)),
        }
    }

    fn apt_name(&self, identifier: &str) -> String {
        format!("{}{identifier}", self.config.owned_prefix)
    }

    fn run(&self, command: &[String]) -> Result<ExecOutput> {
        let _ = self.execs.fetch_add(1, Ordering::Relaxed);
        self.sandbox.exec(command)
    }
}

fn failure(identifier: &str, command: &[String], output: ExecOutput) -> DebqueueError {
    tracing::error!(
        package = identifier,
        exit_code = output.exit_code,
        stderr = %output.stderr.trim(),
        "sandbox command failed"
    );
    DebqueueError::InspectionFailure {
        package: identifier.to_owned(),
        command: command.join(" "),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}
