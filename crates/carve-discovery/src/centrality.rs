//! Weighted PageRank over the clustered component

use crate::report::RankedClass;

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-9;

/// PageRank over directed weighted edges `(source, target, weight)` on nodes
/// `0..node_count`. Ranks sum to 1; the mass of nodes without outgoing
/// weight is spread uniformly.
pub fn pagerank(node_count: usize, edges: &[(usize, usize, u64)]) -> Vec<f64> {
    if node_count == 0 {
        return Vec::new();
    }
    let n = node_count as f64;
    let mut out_weight = vec![0.0; node_count];
    for &(source, _, weight) in edges {
        out_weight[source] += weight as f64;
    }

    let mut ranks = vec![1.0 / n; node_count];
    for _ in 0..MAX_ITERATIONS {
        let dangling: f64 = ranks
            .iter()
            .zip(&out_weight)
            .filter(|(_, out)| **out == 0.0)
            .map(|(rank, _)| rank)
            .sum();
        let base = (1.0 - DAMPING) / n + DAMPING * dangling / n;
        let mut next = vec![base; node_count];
        for &(source, target, weight) in edges {
            next[target] += DAMPING * ranks[source] * weight as f64 / out_weight[source];
        }

        let delta: f64 = next.iter().zip(&ranks).map(|(a, b)| (a - b).abs()).sum();
        ranks = next;
        if delta < TOLERANCE {
            break;
        }
    }
    ranks
}

/// Classes ranked strictly above the rank at `ceil(n * percentile)` of the
/// ascending rank list, highest first.
pub fn core_classes(names: &[&str], ranks: &[f64], percentile: f64) -> Vec<RankedClass> {
    if ranks.is_empty() {
        return Vec::new();
    }
    let mut sorted = ranks.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = ((ranks.len() as f64 * percentile).ceil() as usize).min(ranks.len() - 1);
    let threshold = sorted[position];

    let mut cores: Vec<RankedClass> = names
        .iter()
        .zip(ranks)
        .filter(|(_, rank)| **rank > threshold)
        .map(|(name, rank)| RankedClass {
            class: name.to_string(),
            rank: *rank,
        })
        .collect();
    cores.sort_by(|a, b| b.rank.total_cmp(&a.rank).then_with(|| a.class.cmp(&b.class)));
    cores
}
