//! Discovery output handed to rendering and export tooling

use std::collections::BTreeMap;

use carve_core::DependencyEdge;
use serde::{Deserialize, Serialize};

/// Result of one discovery run over an aggregated graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub monolith_module: String,
    pub feature_modules: Vec<String>,
    /// Classes in the clustered component.
    pub scoped_nodes: usize,
    /// Edges among the clustered classes.
    pub scoped_edges: usize,
    pub modularity: f64,
    /// Clustering levels that moved at least one class.
    pub levels: usize,
    /// Best extraction candidates first (ascending conductance).
    pub candidates: Vec<ModuleCandidate>,
    /// Most central classes, highest rank first.
    pub cores: Vec<RankedClass>,
    /// Whether `cores` were removed before clustering.
    #[serde(default)]
    pub cores_excluded: bool,
}

impl DiscoveryReport {
    pub fn candidate(&self, community: usize) -> Option<&ModuleCandidate> {
        self.candidates.iter().find(|c| c.community == community)
    }

    /// The candidate a class was assigned to.
    pub fn candidate_of(&self, class: &str) -> Option<&ModuleCandidate> {
        self.candidates
            .iter()
            .find(|c| c.members.binary_search_by(|m| m.as_str().cmp(class)).is_ok())
    }
}

/// A community proposed as an extractable module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleCandidate {
    /// Community id in the terminal partition.
    pub community: usize,
    pub label: String,
    /// `cut_weight / total_weight`, 0 when the community has no outgoing weight.
    pub conductance: f64,
    /// Outgoing weight into other communities or unclustered in-scope classes.
    pub cut_weight: u64,
    /// All outgoing weight of the members.
    pub total_weight: u64,
    /// Outgoing weight to monolith classes outside the community.
    pub monolith_cut_weight: u64,
    pub contains_monolith: bool,
    /// Sorted class names.
    pub members: Vec<String>,
    /// Members grouped by their current module.
    pub members_by_module: BTreeMap<String, Vec<String>>,
    /// Dependencies on the monolith that block extraction; only listed for
    /// communities that contain monolith classes.
    pub cut_edges: Vec<DependencyEdge>,
}

impl ModuleCandidate {
    /// Nothing ties this community to the rest of the monolith.
    pub fn is_freely_extractable(&self) -> bool {
        self.cut_edges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub class: String,
    pub rank: f64,
}
