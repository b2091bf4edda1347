//! Memo table holding one [`Package`] per identifier for a run.

use std::sync::Arc;

use dashmap::DashMap;

use crate::package::Package;

/// Concurrent identifier → package map shared by discovery workers.
///
/// Entries are immutable once inserted; the first insertion for an
/// identifier wins and later ones get the existing entity back.
#[derive(Debug, Clone, Default)]
pub struct PackageTable {
    packages: Arc<DashMap<String, Arc<Package>>>,
}

impl PackageTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity for `identifier`, if it has been resolved.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<Arc<Package>> {
        self.packages.get(identifier).map(|entry| Arc::clone(entry.value()))
    }

    /// Inserts a fully populated entity unless one already exists.
    pub fn insert(&self, package: Package) -> Arc<Package> {
        let entry = self
            .packages
            .entry(package.identifier().to_owned())
            .or_insert_with(|| Arc::new(package));
        Arc::clone(entry.value())
    }

    /// Whether `identifier` has been resolved.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.packages.contains_key(identifier)
    }

    /// Number of resolved packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether no package has been resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Resolved identifiers in lexical order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.packages.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
