//! Deterministic build queue ordering.
//!
//! Runs after discovery, single-threaded, over the fully populated table.
//! Requested identifiers are visited in caller order, each one's
//! build-dependencies depth-first before itself. An identifier is decided
//! once: queued, skipped, or absent from the table.

use std::collections::HashSet;

use debqueue_common::error::{DebqueueError, Result};
use debqueue_common::types::SkipReason;

use crate::table::PackageTable;

/// Ordered build queue plus the skip decisions taken while building it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildQueue {
    /// Identifiers to build, dependencies first.
    pub entries: Vec<String>,
    /// Identifiers left out by a skip policy, in the order they were decided.
    pub skipped: Vec<(String, SkipReason)>,
}

/// Builds the queue for one distribution.
#[derive(Debug)]
pub struct BuildQueueBuilder<'a> {
    table: &'a PackageTable,
    distribution: &'a str,
    force_build: bool,
    queue: BuildQueue,
    finished: HashSet<String>,
    visiting: Vec<String>,
}

impl<'a> BuildQueueBuilder<'a> {
    /// Creates a builder over a fully discovered table.
    #[must_use]
    pub fn new(table: &'a PackageTable, distribution: &'a str, force_build: bool) -> Self {
        Self {
            table,
            distribution,
            force_build,
            queue: BuildQueue::default(),
            finished: HashSet::new(),
            visiting: Vec::new(),
        }
    }

    /// Visits every requested identifier and returns the finished queue.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` if build-dependencies loop back on themselves.
    pub fn build<S: AsRef<str>>(mut self, requested: &[S]) -> Result<BuildQueue> {
        for identifier in requested {
            self.visit(identifier.as_ref())?;
        }
        Ok(self.queue)
    }

    fn visit(&mut self, identifier: &str) -> Result<()> {
        if self.finished.contains(identifier) {
            return Ok(());
        }
        let Some(package) = self.table.get(identifier) else {
            return Ok(());
        };

        if let Some(start) = self.visiting.iter().position(|v| v == identifier) {
            let mut path = self.visiting[start..].to_vec();
            path.push(identifier.to_owned());
            return Err(DebqueueError::CycleDetected { path });
        }

        self.visiting.push(identifier.to_owned());
        for dependency in package.build_dependencies() {
            self.visit(dependency)?;
        }
        let _ = self.visiting.pop();
        let _ = self.finished.insert(identifier.to_owned());

        if !self.force_build {
            let reason = if !package.supports_distribution(self.distribution) {
                Some(SkipReason::DistributionMismatch)
            } else if package.is_uploaded() {
                Some(SkipReason::AlreadyUploaded)
            } else {
                None
            };
            if let Some(reason) = reason {
                self.skip(identifier, package.version(), reason);
                return Ok(());
            }
        }

        self.queue.entries.push(identifier.to_owned());
        Ok(())
    }

    fn skip(&mut self, identifier: &str, version: Option<&str>, reason: SkipReason) {
        tracing::info!(
            package = identifier,
            version,
            distribution = self.distribution,
            %reason,
            "skipping package"
        );
        self.queue.skipped.push((identifier.to_owned(), reason));
    }
}
