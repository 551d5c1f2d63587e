//! Graph wrapper using petgraph::StableDiGraph keyed by canonical class name

use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use std::collections::HashMap;

/// The class dependency graph, a weighted simple digraph.
///
/// Nodes are unique by canonical name and edges unique by `(source, target)`.
/// Adding an edge that already exists sums the weights.
#[derive(Clone)]
pub struct DependencyGraph {
    inner: StableDiGraph<ClassNode, u64>,
    by_name: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            inner: StableDiGraph::new(),
            by_name: HashMap::new(),
        }
    }

    /// Build a graph from node and edge tables.
    ///
    /// Returns the graph and the edges that were dropped because one of
    /// their endpoints has no node row.
    pub fn from_tables(
        nodes: impl IntoIterator<Item = ClassNode>,
        edges: impl IntoIterator<Item = DependencyEdge>,
    ) -> (Self, Vec<DependencyEdge>) {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.add_node(node);
        }
        let mut dangling = Vec::new();
        for edge in edges {
            if !graph.add_edge(&edge.source, &edge.target, edge.weight) {
                dangling.push(edge);
            }
        }
        (graph, dangling)
    }

    /// Add a node. If a node with the same name exists, the existing
    /// attributes are kept and its id is returned.
    pub fn add_node(&mut self, node: ClassNode) -> NodeId {
        if let Some(&idx) = self.by_name.get(&node.id) {
            return NodeId(idx.index() as u64);
        }
        let name = node.id.clone();
        let idx = self.inner.add_node(node);
        self.by_name.insert(name, idx);
        NodeId(idx.index() as u64)
    }

    /// Add `weight` to the edge `source -> target`, creating it if needed.
    ///
    /// Returns `false` without touching the graph when either endpoint is
    /// missing or the weight is zero.
    pub fn add_edge(&mut self, source: &str, target: &str, weight: u64) -> bool {
        if weight == 0 {
            return false;
        }
        let (Some(&s), Some(&t)) = (self.by_name.get(source), self.by_name.get(target)) else {
            return false;
        };
        match self.inner.find_edge(s, t) {
            Some(edge) => {
                if let Some(w) = self.inner.edge_weight_mut(edge) {
                    *w += weight;
                }
            }
            None => {
                self.inner.add_edge(s, t, weight);
            }
        }
        true
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&ClassNode> {
        self.inner.node_weight(NodeIndex::new(id.0 as usize))
    }

    /// Look up a node ID by canonical class name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).map(|idx| NodeId(idx.index() as u64))
    }

    /// Look up a node by canonical class name.
    pub fn node_by_name(&self, name: &str) -> Option<&ClassNode> {
        self.by_name.get(name).and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> u64 {
        self.inner.edge_references().map(|edge| *edge.weight()).sum()
    }

    /// Iterate over all node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_indices().map(|idx| NodeId(idx.index() as u64))
    }

    /// Iterate over all nodes in insertion order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &ClassNode> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Weight of the edge `source -> target`, if present.
    pub fn edge_weight(&self, source: NodeId, target: NodeId) -> Option<u64> {
        let s = NodeIndex::new(source.0 as usize);
        let t = NodeIndex::new(target.0 as usize);
        self.inner
            .find_edge(s, t)
            .and_then(|edge| self.inner.edge_weight(edge).copied())
    }

    /// Outgoing edges of a node as `(target, weight)` pairs.
    pub fn edges_from(&self, source: NodeId) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        let idx = NodeIndex::new(source.0 as usize);
        self.inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (NodeId(edge.target().index() as u64), *edge.weight()))
    }

    /// Incoming edges of a node as `(source, weight)` pairs.
    pub fn edges_to(&self, target: NodeId) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        let idx = NodeIndex::new(target.0 as usize);
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (NodeId(edge.source().index() as u64), *edge.weight()))
    }

    /// Iterate over all edges as `(source, target, weight)`.
    pub fn edge_triples(&self) -> impl Iterator<Item = (NodeId, NodeId, u64)> + '_ {
        self.inner.edge_references().map(|edge| {
            (
                NodeId(edge.source().index() as u64),
                NodeId(edge.target().index() as u64),
                *edge.weight(),
            )
        })
    }

    /// Node table sorted by class name.
    pub fn node_table(&self) -> Vec<ClassNode> {
        let mut nodes: Vec<ClassNode> = self.all_nodes().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Edge table sorted by `(source, target)`.
    pub fn edge_table(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .inner
            .edge_references()
            .filter_map(|edge| {
                let source = self.inner.node_weight(edge.source())?;
                let target = self.inner.node_weight(edge.target())?;
                Some(DependencyEdge::new(&source.id, &target.id, *edge.weight()))
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        edges
    }

    /// Both tables, sorted.
    pub fn tables(&self) -> GraphTables {
        GraphTables {
            nodes: self.node_table(),
            edges: self.edge_table(),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
