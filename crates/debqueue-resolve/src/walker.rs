//! Concurrent discovery of the build-dependency closure.
//!
//! A fixed pool of workers drains a shared frontier. The frontier, the set
//! of identifiers already claimed for inspection, and the pending-work
//! counter live behind one mutex, so a worker's "claim and mark inspected"
//! step is atomic. `pending` counts identifiers pushed but not yet fully
//! processed; children are pushed before their parent completes, so it
//! only reaches zero once nothing can produce more work.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use debqueue_common::error::{DebqueueError, Result};

use crate::inspector::Inspector;

/// How often idle workers re-check the cancellation flag.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Counters describing a finished discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Distinct identifiers claimed for inspection.
    pub inspected: usize,
    /// Identifiers that resolved to a package.
    pub resolved: usize,
    /// Identifiers without a recipe.
    pub missing: usize,
}

#[derive(Debug, Default)]
struct Frontier {
    queue: VecDeque<String>,
    inspected: HashSet<String>,
    pending: usize,
    failure: Option<DebqueueError>,
    stats: DiscoveryStats,
}

#[derive(Debug, Default)]
struct WorkQueue {
    state: Mutex<Frontier>,
    ready: Condvar,
}

impl WorkQueue {
    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_all<I: IntoIterator<Item = String>>(&self, items: I) {
        let mut state = self.lock();
        let before = state.queue.len();
        state.queue.extend(items);
        state.pending += state.queue.len() - before;
        drop(state);
        self.ready.notify_all();
    }

    /// Claims the next identifier not yet inspected.
    ///
    /// Returns `None` once the run is complete, failed, or cancelled.
    fn claim(&self, cancel: &AtomicBool) -> Option<String> {
        let mut state = self.lock();
        loop {
            if state.failure.is_some() {
                return None;
            }
            if cancel.load(Ordering::Relaxed) {
                state.failure = Some(DebqueueError::Interrupted);
                drop(state);
                self.ready.notify_all();
                return None;
            }
            if let Some(identifier) = state.queue.pop_front() {
                if state.inspected.insert(identifier.clone()) {
                    state.stats.inspected += 1;
                    return Some(identifier);
                }
                state.pending -= 1;
                if state.pending == 0 {
                    self.ready.notify_all();
                }
                continue;
            }
            if state.pending == 0 {
                return None;
            }
            state = self
                .ready
                .wait_timeout(state, CANCEL_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn complete(&self, found: Option<bool>, error: Option<DebqueueError>) {
        let mut state = self.lock();
        state.pending -= 1;
        match found {
            Some(true) => state.stats.resolved += 1,
            Some(false) => state.stats.missing += 1,
            None => {}
        }
        if let Some(error) = error {
            if state.failure.is_none() {
                state.failure = Some(error);
            }
        }
        let wake = state.pending == 0 || state.failure.is_some();
        drop(state);
        if wake {
            self.ready.notify_all();
        }
    }
}

/// Discovers every package reachable from `roots` through build-dependencies.
///
/// Packages land in the inspector's table. Identifiers without a recipe are
/// skipped and not expanded.
///
/// # Errors
///
/// Returns the first fatal inspection error, or `Interrupted` if `cancel`
/// is raised. Remaining workers stop claiming work as soon as either
/// happens.
pub fn discover(
    inspector: &Inspector<'_>,
    roots: &[String],
    workers: usize,
    cancel: &AtomicBool,
) -> Result<DiscoveryStats> {
    let work = WorkQueue::default();
    work.push_all(roots.iter().cloned());

    let workers = workers.max(1);
    tracing::info!(roots = roots.len(), workers, "discovering build dependencies");

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let work = &work;
            let _ = scope.spawn(move || run_worker(worker, work, inspector, cancel));
        }
    });

    let state = work
        .state
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(error) = state.failure {
        return Err(error);
    }
    tracing::info!(
        inspected = state.stats.inspected,
        resolved = state.stats.resolved,
        missing = state.stats.missing,
        "discovery complete"
    );
    Ok(state.stats)
}

fn run_worker(worker: usize, work: &WorkQueue, inspector: &Inspector<'_>, cancel: &AtomicBool) {
    while let Some(identifier) = work.claim(cancel) {
        tracing::trace!(worker, package = %identifier, "claimed");
        match inspector.inspect(&identifier) {
            Ok(Some(package)) => {
                work.push_all(package.build_dependencies().iter().cloned());
                work.complete(Some(true), None);
            }
            Ok(None) => work.complete(Some(false), None),
            Err(error) => work.complete(None, Some(error)),
        }
    }
    tracing::trace!(worker, "worker exiting");
}
