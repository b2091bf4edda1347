//! Dependency graph export using `petgraph`.
//!
//! Mirrors the discovered table as a directed graph whose edges point from
//! a dependency to its dependant, so topological order is build order.

use std::collections::HashMap;

use debqueue_common::error::{DebqueueError, Result};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::table::PackageTable;

/// A graph of discovered packages.
#[derive(Debug, Default)]
pub struct PackageGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl PackageGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph of every package in `table`.
    ///
    /// Edges to identifiers absent from the table are dropped.
    #[must_use]
    pub fn from_table(table: &PackageTable) -> Self {
        let mut graph = Self::new();
        let identifiers = table.identifiers();
        for identifier in &identifiers {
            let _ = graph.add_package(identifier);
        }
        for identifier in &identifiers {
            let Some(package) = table.get(identifier) else {
                continue;
            };
            for dependency in package.build_dependencies() {
                if table.contains(dependency) {
                    graph.add_dependency(identifier, dependency);
                }
            }
        }
        graph
    }

    /// Adds a package node, returning the existing one if present.
    pub fn add_package(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_owned());
        let _ = self.nodes.insert(name.to_owned(), idx);
        idx
    }

    /// Adds an edge: `dependant` build-depends on `dependency`.
    pub fn add_dependency(&mut self, dependant: &str, dependency: &str) {
        let from = self.add_package(dependency);
        let to = self.add_package(dependant);
        let _ = self.graph.update_edge(from, to, ());
    }

    /// Number of packages in the graph.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns every package with dependencies before dependants.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` naming one package on a cycle.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(DebqueueError::CycleDetected {
                path: self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .into_iter()
                    .collect(),
            }),
        }
    }

    /// Renders the graph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        format!("{:?}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }
}
