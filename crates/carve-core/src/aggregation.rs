//! Merging per-unit tables into one global dependency graph

use crate::error::{CarveError, Result};
use crate::graph::DependencyGraph;
use crate::model::{ClassNode, DependencyEdge, UnitGraph};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Keyed union of node and edge tables.
///
/// `merge` is commutative and associative: node collisions resolve to the
/// row whose module sorts first and edge weights are summed, so any merge
/// order yields the same tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphAccumulator {
    nodes: BTreeMap<String, ClassNode>,
    edges: BTreeMap<(String, String), u64>,
}

impl GraphAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_unit(unit: &UnitGraph) -> Self {
        let mut acc = GraphAccumulator::new();
        acc.add_unit(unit);
        acc
    }

    pub fn add_unit(&mut self, unit: &UnitGraph) {
        for node in &unit.nodes {
            self.add_node(node.clone());
        }
        for edge in &unit.edges {
            self.add_edge(edge);
        }
    }

    pub fn add_node(&mut self, node: ClassNode) {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => {
                if *existing != node {
                    warn!(
                        "Class {} found in modules {} and {}; keeping {}",
                        node.id,
                        existing.module,
                        node.module,
                        existing.module.as_str().min(node.module.as_str())
                    );
                    if precedence(&node) < precedence(existing) {
                        *existing = node;
                    }
                }
            }
            None => {
                self.nodes.insert(node.id.clone(), node);
            }
        }
    }

    pub fn add_edge(&mut self, edge: &DependencyEdge) {
        if edge.weight == 0 {
            return;
        }
        *self
            .edges
            .entry((edge.source.clone(), edge.target.clone()))
            .or_insert(0) += edge.weight;
    }

    pub fn merge(mut self, other: GraphAccumulator) -> GraphAccumulator {
        for (_, node) in other.nodes {
            self.add_node(node);
        }
        for ((source, target), weight) in other.edges {
            *self.edges.entry((source, target)).or_insert(0) += weight;
        }
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Build the aggregated graph.
    ///
    /// Edges whose endpoints have no node in any unit are dropped. Fails
    /// when no node or no edge survives.
    pub fn finish(self) -> Result<DependencyGraph> {
        let edges = self
            .edges
            .into_iter()
            .map(|((source, target), weight)| DependencyEdge { source, target, weight });
        let (graph, dangling) = DependencyGraph::from_tables(self.nodes.into_values(), edges);

        if !dangling.is_empty() {
            debug!(
                "Dropped {} edges pointing at classes without artifacts",
                dangling.len()
            );
        }
        if graph.node_count() == 0 || graph.edge_count() == 0 {
            return Err(CarveError::EmptyGraph {
                nodes: graph.node_count(),
                edges: graph.edge_count(),
            });
        }
        Ok(graph)
    }
}

fn precedence(node: &ClassNode) -> (&str, &str, bool) {
    (node.module.as_str(), node.label.as_str(), node.is_interface)
}

/// Aggregate unit tables into one graph as a parallel reduction.
pub fn aggregate_units(units: &[UnitGraph]) -> Result<DependencyGraph> {
    let acc = units
        .par_iter()
        .map(GraphAccumulator::from_unit)
        .reduce(GraphAccumulator::new, GraphAccumulator::merge);

    info!(
        "Aggregating {} units: {} classes, {} dependencies",
        units.len(),
        acc.node_count(),
        acc.edge_count()
    );

    let graph = acc.finish()?;
    info!(
        "Aggregated graph has {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}
