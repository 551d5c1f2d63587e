//! Core data structures for the class dependency graph

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stable identifier for a node inside one [`crate::DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

/// A class in the dependency graph.
///
/// Serialized with the column names of the node tables exchanged with
/// import/export tooling (`Id`, `Label`, `IsInterface`, `Module`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassNode {
    /// Canonical dotted class name. Nested classes collapse into their top-level class.
    #[serde(rename = "Id")]
    pub id: String,
    /// Simple name (the segment after the last dot).
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "IsInterface")]
    pub is_interface: bool,
    /// Compilation unit the class was extracted from.
    #[serde(rename = "Module")]
    pub module: String,
}

impl ClassNode {
    /// Build a node, deriving the label from the canonical name.
    pub fn new(id: impl Into<String>, is_interface: bool, module: impl Into<String>) -> Self {
        let id = id.into();
        let label = simple_name(&id).to_string();
        ClassNode {
            id,
            label,
            is_interface,
            module: module.into(),
        }
    }
}

/// A weighted, directed dependency between two classes.
///
/// `weight` counts the distinct reference sites observed from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Weight")]
    pub weight: u64,
}

impl DependencyEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: u64) -> Self {
        DependencyEdge {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }
}

/// What to do with a reference from a class to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelfReferencePolicy {
    /// Self references never become edges.
    #[default]
    Drop,
    /// Self references are kept as self-loop edges.
    Keep,
}

/// Node and edge tables produced for one compilation unit.
///
/// Edges may point at classes compiled in other units; those targets have no
/// row in `nodes` until the units are aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnitGraph {
    pub module: String,
    pub nodes: Vec<ClassNode>,
    pub edges: Vec<DependencyEdge>,
}

impl UnitGraph {
    /// Build unit tables from keyed maps. Rows come out sorted by key.
    pub fn from_maps(
        module: impl Into<String>,
        nodes: BTreeMap<String, ClassNode>,
        edges: BTreeMap<(String, String), u64>,
    ) -> Self {
        UnitGraph {
            module: module.into(),
            nodes: nodes.into_values().collect(),
            edges: edges
                .into_iter()
                .map(|((source, target), weight)| DependencyEdge { source, target, weight })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Sorted node and edge tables of an aggregated graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphTables {
    pub nodes: Vec<ClassNode>,
    pub edges: Vec<DependencyEdge>,
}

/// Simple name of a dotted class name: the segment after the last dot,
/// ignoring any generic marker.
pub fn simple_name(name: &str) -> &str {
    let name = name.split('<').next().unwrap_or(name);
    match name.rfind('.') {
        Some(dot) => &name[dot + 1..],
        None => name,
    }
}
