//! The discovery pipeline: scope, cluster, label, score

use std::collections::{BTreeMap, HashSet};

use carve_core::{AnalysisConfig, DependencyGraph, Result};
use tracing::info;

use crate::centrality::{core_classes, pagerank};
use crate::labels::community_labels;
use crate::louvain::{Louvain, WeightedGraph};
use crate::metrics::community_metrics;
use crate::report::{DiscoveryReport, ModuleCandidate};
use crate::scope::{AnalysisScope, ScopedGraph};

/// Proposes extractable modules from an aggregated dependency graph.
#[derive(Debug, Clone)]
pub struct ModuleDiscovery {
    scope: AnalysisScope,
    louvain: Louvain,
    label_terms: usize,
    core_percentile: f64,
    exclude_cores: bool,
}

impl ModuleDiscovery {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        Ok(ModuleDiscovery {
            scope: AnalysisScope::from_config(config)?,
            louvain: Louvain::new().with_resolution(config.resolution),
            label_terms: config.label_terms,
            core_percentile: config.core_percentile,
            exclude_cores: config.exclude_cores,
        })
    }

    /// Remove core classes from the clustered component.
    pub fn exclude_cores(mut self, exclude: bool) -> Self {
        self.exclude_cores = exclude;
        self
    }

    pub fn scope(&self) -> &AnalysisScope {
        &self.scope
    }

    pub fn run(&self, graph: &DependencyGraph) -> Result<DiscoveryReport> {
        let mut scoped = self.scope.restrict(graph)?;
        let ranks = pagerank(scoped.len(), scoped.edges());
        let cores = core_classes(&class_names(graph, &scoped), &ranks, self.core_percentile);
        if self.exclude_cores && !cores.is_empty() {
            let excluded: HashSet<_> = cores.iter().filter_map(|core| graph.node_id(&core.class)).collect();
            scoped = self.scope.restrict_excluding(graph, &excluded)?;
            info!("Excluded {} core classes before clustering", excluded.len());
        }
        let names = class_names(graph, &scoped);

        let weighted = WeightedGraph::from_directed(scoped.len(), scoped.edges());
        let partition = self.louvain.detect(&weighted);
        info!(
            "Clustered {} classes into {} communities over {} levels (modularity {:.4})",
            scoped.len(),
            partition.count,
            partition.levels,
            partition.modularity
        );

        let members = partition.members();
        let simple_names: Vec<Vec<&str>> = members
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|&i| graph.node(scoped.node_id(i)))
                    .map(|node| node.label.as_str())
                    .collect()
            })
            .collect();
        let labels = community_labels(&simple_names, self.label_terms);
        let metrics = community_metrics(graph, &self.scope, &scoped, &partition);

        let mut candidates: Vec<ModuleCandidate> = members
            .iter()
            .zip(labels)
            .zip(metrics)
            .enumerate()
            .map(|(community, ((nodes, label), metrics))| {
                let mut members_by_module: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for node in nodes.iter().filter_map(|&i| graph.node(scoped.node_id(i))) {
                    members_by_module
                        .entry(node.module.clone())
                        .or_default()
                        .push(node.id.clone());
                }
                ModuleCandidate {
                    community,
                    label,
                    conductance: metrics.conductance(),
                    cut_weight: metrics.cut_weight,
                    total_weight: metrics.total_weight,
                    monolith_cut_weight: metrics.monolith_cut_weight,
                    contains_monolith: metrics.contains_monolith,
                    members: nodes.iter().map(|&i| names[i].to_string()).collect(),
                    members_by_module,
                    cut_edges: metrics.cut_edges,
                }
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.conductance
                .total_cmp(&b.conductance)
                .then(a.community.cmp(&b.community))
        });

        let extractable = candidates.iter().filter(|c| c.is_freely_extractable()).count();
        info!(
            "Discovery found {} candidates ({} freely extractable), {} core classes",
            candidates.len(),
            extractable,
            cores.len()
        );

        Ok(DiscoveryReport {
            monolith_module: self.scope.monolith().to_string(),
            feature_modules: self.scope.feature_patterns().to_vec(),
            scoped_nodes: scoped.len(),
            scoped_edges: scoped.edges().len(),
            modularity: partition.modularity,
            levels: partition.levels,
            candidates,
            cores,
            cores_excluded: self.exclude_cores,
        })
    }
}

fn class_names<'g>(graph: &'g DependencyGraph, scoped: &ScopedGraph) -> Vec<&'g str> {
    scoped
        .nodes()
        .iter()
        .map(|&id| graph.node(id).map_or("", |node| node.id.as_str()))
        .collect()
}
