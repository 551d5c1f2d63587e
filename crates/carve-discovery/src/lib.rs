//! Module discovery: clusters the aggregated class graph into extraction candidates

pub mod centrality;
pub mod engine;
pub mod labels;
pub mod louvain;
pub mod metrics;
pub mod report;
pub mod scope;

#[cfg(test)]
pub mod tests;

pub use centrality::{core_classes, pagerank};
pub use engine::ModuleDiscovery;
pub use labels::{community_labels, split_camel_case};
pub use louvain::{modularity, Louvain, Partition, WeightedGraph};
pub use metrics::{community_metrics, conductance, CommunityMetrics};
pub use report::{DiscoveryReport, ModuleCandidate, RankedClass};
pub use scope::{AnalysisScope, ScopedGraph};
