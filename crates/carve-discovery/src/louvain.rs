//! Greedy multi-level modularity clustering (Louvain).
//!
//! 1. **Local moving**: every node starts in its own community and is moved to
//!    the neighboring community with the largest modularity gain, until a
//!    full pass moves nothing.
//! 2. **Contraction**: each community becomes a single node. Intra-community
//!    weight becomes a self-loop, inter-community weights are summed.
//! 3. Repeat on the contracted graph until a level moves nothing or a single
//!    community remains, then expand the assignment back onto the original
//!    nodes.
//!
//! Ties are broken deterministically: a node stays put unless some community
//! is strictly better, and among equally good targets the lowest id wins.
//!
//! Blondel et al. (2008). "Fast unfolding of communities in large networks."

use std::collections::BTreeMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::debug;

/// Gains closer than this are treated as equal.
const GAIN_EPSILON: f64 = 1e-12;

/// Undirected weighted graph with explicit self-loops.
#[derive(Debug, Clone)]
pub struct WeightedGraph {
    /// Neighbors sorted by index, self-loops excluded.
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degrees: Vec<f64>,
    /// Each undirected edge once plus every self-loop.
    total_weight: f64,
}

/// Symmetrize directed edges: `w(u, v) = w(u -> v) + w(v -> u)`, one
/// undirected edge per connected pair and one self-loop per looping node.
pub fn symmetrize(node_count: usize, edges: &[(usize, usize, u64)]) -> UnGraph<(), f64> {
    let mut graph = UnGraph::with_capacity(node_count, edges.len());
    for _ in 0..node_count {
        graph.add_node(());
    }
    for &(source, target, weight) in edges {
        let (a, b) = (NodeIndex::new(source), NodeIndex::new(target));
        match graph.find_edge(a, b) {
            Some(edge) => graph[edge] += weight as f64,
            None => {
                graph.add_edge(a, b, weight as f64);
            }
        }
    }
    graph
}

impl WeightedGraph {
    pub fn from_directed(node_count: usize, edges: &[(usize, usize, u64)]) -> Self {
        Self::from_undirected(&symmetrize(node_count, edges))
    }

    /// Node `i` of the result is `NodeIndex::new(i)` of `graph`.
    pub fn from_undirected<N>(graph: &UnGraph<N, f64>) -> Self {
        let n = graph.node_count();
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let mut self_loops = vec![0.0; n];
        for edge in graph.edge_references() {
            let (i, j) = (edge.source().index(), edge.target().index());
            let weight = *edge.weight();
            if i == j {
                self_loops[i] += weight;
            } else {
                *adjacency[i].entry(j).or_insert(0.0) += weight;
                *adjacency[j].entry(i).or_insert(0.0) += weight;
            }
        }
        Self::from_parts(
            adjacency.into_iter().map(|n| n.into_iter().collect()).collect(),
            self_loops,
        )
    }

    fn from_parts(adjacency: Vec<Vec<(usize, f64)>>, self_loops: Vec<f64>) -> Self {
        let degrees: Vec<f64> = adjacency
            .iter()
            .zip(&self_loops)
            .map(|(neighbors, self_loop)| neighbors.iter().map(|(_, w)| w).sum::<f64>() + 2.0 * self_loop)
            .collect();
        let total_weight = degrees.iter().sum::<f64>() / 2.0;
        WeightedGraph {
            adjacency,
            self_loops,
            degrees,
            total_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn degree(&self, node: usize) -> f64 {
        self.degrees[node]
    }

    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    /// Collapse every community into one node. `communities` must be dense `0..count`.
    fn contract(&self, communities: &[usize], count: usize) -> WeightedGraph {
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];
        for (node, neighbors) in self.adjacency.iter().enumerate() {
            let c = communities[node];
            self_loops[c] += self.self_loops[node];
            for &(other, weight) in neighbors {
                let d = communities[other];
                if c == d {
                    if node < other {
                        self_loops[c] += weight;
                    }
                } else {
                    *adjacency[c].entry(d).or_insert(0.0) += weight;
                }
            }
        }
        Self::from_parts(
            adjacency.into_iter().map(|n| n.into_iter().collect()).collect(),
            self_loops,
        )
    }
}

/// Modularity of an assignment: `sum_c [L_c / m - resolution * (d_c / 2m)^2]`.
pub fn modularity(graph: &WeightedGraph, communities: &[usize], resolution: f64) -> f64 {
    let m = graph.total_weight;
    if m == 0.0 {
        return 0.0;
    }
    let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
    let mut degree: BTreeMap<usize, f64> = BTreeMap::new();
    for node in 0..graph.len() {
        let c = communities[node];
        *degree.entry(c).or_insert(0.0) += graph.degrees[node];
        let mut inside = graph.self_loops[node];
        for &(other, weight) in &graph.adjacency[node] {
            if node < other && communities[other] == c {
                inside += weight;
            }
        }
        *internal.entry(c).or_insert(0.0) += inside;
    }
    degree
        .iter()
        .map(|(c, d)| {
            let l = internal.get(c).copied().unwrap_or(0.0);
            l / m - resolution * (d / (2.0 * m)).powi(2)
        })
        .sum()
}

/// Terminal clustering result over the original node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Community id per node, dense `0..count`, numbered by first appearance.
    pub communities: Vec<usize>,
    pub count: usize,
    /// Levels that moved at least one node.
    pub levels: usize,
    pub modularity: f64,
}

impl Partition {
    /// Node indices per community, each list ascending.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.count];
        for (node, &c) in self.communities.iter().enumerate() {
            members[c].push(node);
        }
        members
    }
}

/// Louvain community detection.
#[derive(Debug, Clone)]
pub struct Louvain {
    resolution: f64,
    /// Cap on local-moving passes per level.
    max_passes: usize,
    max_levels: usize,
}

impl Louvain {
    pub fn new() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 1000,
            max_levels: 64,
        }
    }

    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    pub fn with_max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels;
        self
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn detect(&self, graph: &WeightedGraph) -> Partition {
        let n = graph.len();
        if graph.total_weight == 0.0 {
            // No edges at all: every node is its own community
            return Partition {
                communities: (0..n).collect(),
                count: n,
                levels: 0,
                modularity: 0.0,
            };
        }

        let mut assignment: Vec<usize> = (0..n).collect();
        let mut current = graph.clone();
        let mut levels = 0;

        while levels < self.max_levels {
            let (local, moved) = self.local_moving(&current);
            if !moved {
                break;
            }
            let (local, count) = renumber(&local);
            for community in assignment.iter_mut() {
                *community = local[*community];
            }
            levels += 1;
            debug!(
                "Louvain level {}: {} nodes -> {} communities, modularity {:.6}",
                levels,
                current.len(),
                count,
                modularity(graph, &assignment, self.resolution)
            );
            if count <= 1 || count == current.len() {
                break;
            }
            current = current.contract(&local, count);
        }

        let (communities, count) = renumber(&assignment);
        let modularity = modularity(graph, &communities, self.resolution);
        Partition {
            communities,
            count,
            levels,
            modularity,
        }
    }

    /// Repeated passes of single-node moves. Returns the assignment and
    /// whether any node moved.
    fn local_moving(&self, graph: &WeightedGraph) -> (Vec<usize>, bool) {
        let n = graph.len();
        let m = graph.total_weight;
        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_degrees = graph.degrees.clone();
        let mut any_moved = false;

        for _pass in 0..self.max_passes {
            let mut moved = false;
            for node in 0..n {
                #[cfg(test)]
                let before = modularity(graph, &communities, self.resolution);
                let own = communities[node];
                let k_i = graph.degrees[node];
                community_degrees[own] -= k_i;

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(neighbor, weight) in &graph.adjacency[node] {
                    *links.entry(communities[neighbor]).or_insert(0.0) += weight;
                }

                let gain = |community: usize, k_i_in: f64| {
                    k_i_in / m - self.resolution * community_degrees[community] * k_i / (2.0 * m * m)
                };
                let mut best = own;
                let mut best_gain = gain(own, links.get(&own).copied().unwrap_or(0.0));
                for (&community, &k_i_in) in &links {
                    let candidate = gain(community, k_i_in);
                    if candidate > best_gain + GAIN_EPSILON {
                        best = community;
                        best_gain = candidate;
                    }
                }

                community_degrees[best] += k_i;
                if best != own {
                    communities[node] = best;
                    moved = true;
                    any_moved = true;

                    #[cfg(test)]
                    {
                        let after = modularity(graph, &communities, self.resolution);
                        assert!(
                            after > before,
                            "moving node {node} from {own} to {best} lowered modularity: {before} -> {after}"
                        );
                    }
                }
            }
            if !moved {
                break;
            }
        }

        (communities, any_moved)
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Self::new()
    }
}

/// Dense ids `0..count` in order of first appearance.
fn renumber(communities: &[usize]) -> (Vec<usize>, usize) {
    let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
    let renumbered = communities
        .iter()
        .map(|c| {
            let next = ids.len();
            *ids.entry(*c).or_insert(next)
        })
        .collect();
    (renumbered, ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> WeightedGraph {
        WeightedGraph::from_directed(
            6,
            &[(0, 1, 5), (1, 2, 5), (2, 0, 5), (3, 4, 5), (4, 5, 5), (5, 3, 5), (2, 3, 1)],
        )
    }

    #[test]
    fn test_symmetrized_weights() {
        let graph = WeightedGraph::from_directed(3, &[(0, 1, 2), (1, 0, 3), (2, 2, 4)]);
        assert_eq!(graph.neighbors(0), &[(1, 5.0)]);
        assert_eq!(graph.degree(2), 8.0);
        assert_eq!(graph.total_weight(), 9.0);
    }

    #[test]
    fn test_two_triangles_split() {
        let partition = Louvain::new().detect(&two_triangles());
        assert_eq!(partition.communities, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(partition.count, 2);
        assert!(partition.modularity > 0.4);
    }

    #[test]
    fn test_triangle_single_community() {
        let graph = WeightedGraph::from_directed(3, &[(0, 1, 1), (1, 2, 1), (2, 0, 1)]);
        let partition = Louvain::new().detect(&graph);
        assert_eq!(partition.communities, vec![0, 0, 0]);
    }

    #[test]
    fn test_edgeless_graph_is_identity() {
        let graph = WeightedGraph::from_directed(4, &[]);
        let partition = Louvain::new().detect(&graph);
        assert_eq!(partition.communities, vec![0, 1, 2, 3]);
        assert_eq!(partition.levels, 0);
        assert_eq!(partition.modularity, 0.0);
    }

    #[test]
    fn test_disconnected_pairs() {
        let graph = WeightedGraph::from_directed(4, &[(0, 1, 1), (2, 3, 1)]);
        let partition = Louvain::new().detect(&graph);
        assert_eq!(partition.communities, vec![0, 0, 1, 1]);
        assert_eq!(partition.members(), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_modularity_of_singletons_is_not_positive() {
        let graph = two_triangles();
        let singletons: Vec<usize> = (0..6).collect();
        assert!(modularity(&graph, &singletons, 1.0) <= 0.0);
    }

    #[test]
    fn test_contraction_preserves_weight() {
        let graph = two_triangles();
        let contracted = graph.contract(&[0, 0, 0, 1, 1, 1], 2);
        assert_eq!(contracted.total_weight(), graph.total_weight());
        assert_eq!(contracted.neighbors(0), &[(1, 1.0)]);
        assert_eq!(contracted.self_loops, vec![15.0, 15.0]);
    }

    #[test]
    fn test_symmetrize_merges_opposite_directions() {
        let graph = symmetrize(3, &[(0, 1, 2), (1, 0, 3), (1, 2, 1), (2, 2, 4)]);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        let pair = graph.find_edge(NodeIndex::new(1), NodeIndex::new(0)).unwrap();
        assert_eq!(graph[pair], 5.0);
    }

    #[test]
    fn test_every_accepted_move_raises_modularity() {
        // local_moving asserts the increase after each accepted move
        let graphs = [
            two_triangles(),
            WeightedGraph::from_directed(5, &[(0, 1, 3), (1, 2, 1), (2, 3, 3), (3, 4, 1), (4, 0, 2), (1, 1, 2)]),
            WeightedGraph::from_directed(4, &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 0, 1), (0, 2, 1)]),
            two_triangles().contract(&[0, 1, 1, 2, 2, 2], 3),
        ];
        for graph in &graphs {
            for resolution in [0.5, 1.0, 2.0] {
                let (communities, moved) = Louvain::new().with_resolution(resolution).local_moving(graph);
                if moved {
                    let singletons: Vec<usize> = (0..graph.len()).collect();
                    assert!(
                        modularity(graph, &communities, resolution) > modularity(graph, &singletons, resolution)
                    );
                }
            }
        }
        assert!(Louvain::new().local_moving(&two_triangles()).1);
    }

    #[test]
    fn test_renumber_by_first_appearance() {
        assert_eq!(renumber(&[4, 2, 4, 7]), (vec![0, 1, 0, 2], 3));
    }
}
