//! Restricting the aggregated graph to the analysis scope

use std::collections::{HashMap, HashSet};

use carve_core::{full_match_regex, AnalysisConfig, CarveError, ClassNode, DependencyGraph, NodeId, Result};
use petgraph::unionfind::UnionFind;
use regex::Regex;
use tracing::info;

/// Which modules take part in the analysis.
#[derive(Debug, Clone)]
pub struct AnalysisScope {
    monolith: String,
    feature_patterns: Vec<String>,
    features: Vec<Regex>,
    exclude_interfaces: bool,
}

impl AnalysisScope {
    pub fn new<S: AsRef<str>>(monolith: impl Into<String>, features: &[S]) -> Result<Self> {
        let feature_patterns: Vec<String> = features.iter().map(|f| f.as_ref().to_string()).collect();
        let features = feature_patterns
            .iter()
            .map(|pattern| full_match_regex(pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(AnalysisScope {
            monolith: monolith.into(),
            feature_patterns,
            features,
            exclude_interfaces: false,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        Ok(Self::new(config.monolith_module.clone(), &config.feature_modules)?
            .exclude_interfaces(config.exclude_interfaces))
    }

    pub fn exclude_interfaces(mut self, exclude: bool) -> Self {
        self.exclude_interfaces = exclude;
        self
    }

    pub fn monolith(&self) -> &str {
        &self.monolith
    }

    pub fn feature_patterns(&self) -> &[String] {
        &self.feature_patterns
    }

    /// The monolith itself or a module whose identifier fully matches a feature pattern.
    pub fn module_in_scope(&self, module: &str) -> bool {
        module == self.monolith || self.features.iter().any(|re| re.is_match(module))
    }

    fn admits(&self, node: &ClassNode) -> bool {
        self.module_in_scope(&node.module) && !(self.exclude_interfaces && node.is_interface)
    }

    /// Keep in-scope nodes, then only the largest connected component of
    /// what remains (edges taken as undirected).
    pub fn restrict(&self, graph: &DependencyGraph) -> Result<ScopedGraph> {
        self.restrict_excluding(graph, &HashSet::new())
    }

    /// Like [`AnalysisScope::restrict`], with `excluded` nodes removed before
    /// the largest component is taken.
    pub fn restrict_excluding(&self, graph: &DependencyGraph, excluded: &HashSet<NodeId>) -> Result<ScopedGraph> {
        let mut admitted: Vec<(NodeId, &ClassNode)> = graph
            .node_ids()
            .filter(|id| !excluded.contains(id))
            .filter_map(|id| graph.node(id).map(|node| (id, node)))
            .filter(|(_, node)| self.admits(node))
            .collect();
        if admitted.is_empty() {
            return Err(CarveError::EmptyScope {
                monolith: self.monolith.clone(),
                features: self.feature_patterns.clone(),
            });
        }
        admitted.sort_by(|a, b| a.1.id.cmp(&b.1.id));

        let position: HashMap<NodeId, usize> =
            admitted.iter().enumerate().map(|(i, (id, _))| (*id, i)).collect();
        let mut components = UnionFind::<usize>::new(admitted.len());
        for (source, target, _) in graph.edge_triples() {
            if let (Some(&s), Some(&t)) = (position.get(&source), position.get(&target)) {
                components.union(s, t);
            }
        }

        // Size per root, and the first (smallest-named) member seen per root
        let labels = components.into_labeling();
        let mut sizes: HashMap<usize, (usize, usize)> = HashMap::new();
        for (i, &root) in labels.iter().enumerate() {
            sizes.entry(root).or_insert((0, i)).0 += 1;
        }
        let keep = sizes
            .iter()
            .max_by(|(_, a), (_, b)| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(&root, _)| root);

        let nodes: Vec<NodeId> = admitted
            .iter()
            .zip(&labels)
            .filter(|(_, root)| Some(**root) == keep)
            .map(|((id, _), _)| *id)
            .collect();

        let scoped = ScopedGraph::new(graph, nodes);
        info!(
            "Analysis scope: {} of {} classes in scope modules ({} excluded), {} in the largest component ({} components)",
            admitted.len(),
            graph.node_count(),
            excluded.len(),
            scoped.len(),
            sizes.len()
        );
        Ok(scoped)
    }
}

/// Nodes of the analysis scope, indexed `0..n` in class-name order, with
/// the directed edges among them.
#[derive(Debug, Clone)]
pub struct ScopedGraph {
    nodes: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    edges: Vec<(usize, usize, u64)>,
}

impl ScopedGraph {
    /// `nodes` must already be sorted by class name.
    fn new(graph: &DependencyGraph, nodes: Vec<NodeId>) -> Self {
        let index: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut edges = Vec::new();
        for (i, &id) in nodes.iter().enumerate() {
            for (target, weight) in graph.edges_from(id) {
                if let Some(&j) = index.get(&target) {
                    edges.push((i, j, weight));
                }
            }
        }
        edges.sort_unstable();
        ScopedGraph { nodes, index, edges }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn node_id(&self, index: usize) -> NodeId {
        self.nodes[index]
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Directed `(source, target, weight)` triples over scoped indices.
    pub fn edges(&self) -> &[(usize, usize, u64)] {
        &self.edges
    }
}
