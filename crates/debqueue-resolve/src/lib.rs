//! # debqueue-resolve
//!
//! Answers "what must be built, in what order, and why" for a set of
//! recipe-based packages.
//!
//! - **Package**: identity, version, build-dependencies, published versions.
//! - **Inspector**: fills packages from commands run in the shared sandbox.
//! - **Walker**: concurrent discovery of the build-dependency closure.
//! - **Queue**: deterministic dependency-first ordering with skip policies.
//! - **Graph**: petgraph view of the discovered packages.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod graph;
pub mod inspector;
pub mod normalize;
pub mod package;
pub mod queue;
pub mod recipes;
pub mod table;
pub mod walker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use debqueue_common::config::ResolveConfig;
use debqueue_common::error::{DebqueueError, Result};
use debqueue_common::types::SkipReason;
use debqueue_sandbox::{Sandbox, SandboxBackend, SandboxPlan};

use crate::inspector::Inspector;
use crate::package::{Package, resolve_identity};
use crate::queue::BuildQueueBuilder;
use crate::table::PackageTable;
use crate::walker::DiscoveryStats;

/// Outcome of a resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    queue: Vec<String>,
    skipped: Vec<(String, SkipReason)>,
    table: PackageTable,
    stats: DiscoveryStats,
}

impl Resolution {
    /// Identifiers to build, dependencies first.
    #[must_use]
    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    /// Consumes the resolution, returning the queue.
    #[must_use]
    pub fn into_queue(self) -> Vec<String> {
        self.queue
    }

    /// Queued packages in queue order.
    #[must_use]
    pub fn packages(&self) -> Vec<Arc<Package>> {
        self.queue
            .iter()
            .filter_map(|identifier| self.table.get(identifier))
            .collect()
    }

    /// Packages left out by a skip policy.
    #[must_use]
    pub fn skipped(&self) -> &[(String, SkipReason)] {
        &self.skipped
    }

    /// Every package discovered during the run.
    #[must_use]
    pub const fn table(&self) -> &PackageTable {
        &self.table
    }

    /// Discovery counters.
    #[must_use]
    pub const fn stats(&self) -> DiscoveryStats {
        self.stats
    }
}

/// Normalizes and de-duplicates requested names, keeping caller order.
#[must_use]
pub fn requested_identifiers<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut identifiers: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let identifier = resolve_identity(name.as_ref());
        if !identifier.is_empty() && !identifiers.contains(&identifier) {
            identifiers.push(identifier);
        }
    }
    identifiers
}

/// Discovers packages and builds the queue using an already prepared sandbox.
///
/// # Errors
///
/// Returns the first fatal inspection error, `Interrupted` if `cancel` is
/// raised during discovery, or `CycleDetected`.
pub fn resolve_in_sandbox<S: AsRef<str>>(
    sandbox: &Sandbox,
    config: &ResolveConfig,
    names: &[S],
    cancel: &AtomicBool,
) -> Result<Resolution> {
    let requested = requested_identifiers(names);
    let table = PackageTable::new();
    let inspector = Inspector::new(sandbox, config, &table);

    let started = std::time::Instant::now();
    let stats = walker::discover(&inspector, &requested, config.workers, cancel)?;
    tracing::debug!(
        elapsed = ?started.elapsed(),
        execs = inspector.exec_count(),
        "inspection finished"
    );

    let queue = BuildQueueBuilder::new(&table, &config.distribution, config.force_build)
        .build(&requested)?;
    tracing::info!(queue = ?queue.entries, "build queue resolved");

    Ok(Resolution {
        queue: queue.entries,
        skipped: queue.skipped,
        table,
        stats,
    })
}

/// Resolves the build queue for `names`, managing the sandbox for the run.
///
/// The sandbox is prepared from `plan` and torn down before returning,
/// whether resolution succeeded or not. A `cancel` raised while the
/// sandbox is being prepared ends the run with `Interrupted`, even if
/// preparation itself failed.
///
/// # Errors
///
/// Returns sandbox preparation errors and any error of
/// [`resolve_in_sandbox`].
pub fn resolve_build_queue<S: AsRef<str>>(
    backend: Arc<dyn SandboxBackend>,
    plan: &SandboxPlan,
    config: &ResolveConfig,
    names: &[S],
    cancel: &AtomicBool,
) -> Result<Resolution> {
    tracing::info!(
        distribution = %config.distribution,
        force_build = config.force_build,
        packages = names.len(),
        "resolving build queue"
    );
    let prepared = Sandbox::prepare(backend, plan);
    if cancel.load(Ordering::SeqCst) {
        if let Err(error) = &prepared {
            tracing::debug!(%error, "sandbox preparation cut short by interrupt");
        }
        return Err(DebqueueError::Interrupted);
    }
    let mut sandbox = prepared?;
    let result = resolve_in_sandbox(&sandbox, config, names, cancel);
    sandbox.teardown();
    result
}
