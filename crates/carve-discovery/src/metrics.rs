//! Conductance and cut edges of communities

use carve_core::{DependencyEdge, DependencyGraph};

use crate::louvain::Partition;
use crate::scope::{AnalysisScope, ScopedGraph};

/// Outgoing-edge statistics of one community, measured in the full graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommunityMetrics {
    pub cut_weight: u64,
    pub total_weight: u64,
    pub monolith_cut_weight: u64,
    pub contains_monolith: bool,
    /// Sorted edges into monolith classes outside the community. Empty
    /// unless the community contains a monolith class.
    pub cut_edges: Vec<DependencyEdge>,
}

impl CommunityMetrics {
    pub fn conductance(&self) -> f64 {
        conductance(self.cut_weight, self.total_weight)
    }
}

/// `cut / total`, defined as 0 when there is no outgoing weight.
pub fn conductance(cut: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        cut as f64 / total as f64
    }
}

/// Metrics for every community of `partition`, indexed by community id.
///
/// A target outside the clustered component belongs to no community, so an
/// edge to it crosses the cut whenever its module is in scope.
pub fn community_metrics(
    graph: &DependencyGraph,
    scope: &AnalysisScope,
    scoped: &ScopedGraph,
    partition: &Partition,
) -> Vec<CommunityMetrics> {
    let mut metrics = vec![CommunityMetrics::default(); partition.count];
    let mut blocking: Vec<Vec<DependencyEdge>> = vec![Vec::new(); partition.count];

    for (index, &id) in scoped.nodes().iter().enumerate() {
        let Some(source) = graph.node(id) else {
            continue;
        };
        let community = partition.communities[index];
        let entry = &mut metrics[community];
        if source.module == scope.monolith() {
            entry.contains_monolith = true;
        }

        for (target_id, weight) in graph.edges_from(id) {
            entry.total_weight += weight;
            let Some(target) = graph.node(target_id) else {
                continue;
            };
            let target_community = scoped.index_of(target_id).map(|j| partition.communities[j]);
            if target_community == Some(community) {
                continue;
            }
            if scope.module_in_scope(&target.module) {
                entry.cut_weight += weight;
            }
            if target.module == scope.monolith() {
                entry.monolith_cut_weight += weight;
                blocking[community].push(DependencyEdge::new(&source.id, &target.id, weight));
            }
        }
    }

    for (entry, mut edges) in metrics.iter_mut().zip(blocking) {
        if entry.contains_monolith {
            edges.sort();
            entry.cut_edges = edges;
        }
    }
    metrics
}
