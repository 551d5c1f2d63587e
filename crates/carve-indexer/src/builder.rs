//! Per-compilation-unit graph building
//!
//! Every artifact is parsed independently on the rayon pool and folded
//! into a keyed accumulator; accumulators merge by summing, so the unit
//! tables do not depend on scheduling order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use carve_core::{CarveError, ClassNode, ExtractConfig, SelfReferencePolicy, UnitGraph};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ClassFileError, Result as ParseResult};
use crate::extractor::{extract_references, ClassReferences};
use crate::scope::ScopeFilter;

/// Builds the node and edge tables of one compilation unit.
#[derive(Debug, Clone)]
pub struct UnitGraphBuilder {
    module: String,
    filter: ScopeFilter,
    self_references: SelfReferencePolicy,
}

impl UnitGraphBuilder {
    pub fn new(module: impl Into<String>, filter: ScopeFilter) -> Self {
        UnitGraphBuilder {
            module: module.into(),
            filter,
            self_references: SelfReferencePolicy::default(),
        }
    }

    pub fn from_config(module: impl Into<String>, config: &ExtractConfig) -> carve_core::Result<Self> {
        Ok(Self::new(module, ScopeFilter::from_config(config)?).self_references(config.self_references))
    }

    pub fn self_references(mut self, policy: SelfReferencePolicy) -> Self {
        self.self_references = policy;
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Read and analyze class files from disk.
    pub fn build(&self, paths: &[PathBuf]) -> carve_core::Result<UnitGraph> {
        if paths.is_empty() {
            return Err(CarveError::NoArtifacts {
                module: self.module.clone(),
            });
        }
        let acc = paths
            .par_iter()
            .map(|path| (path.as_path(), read_and_extract(path)))
            .fold(UnitAccumulator::default, |acc, (path, result)| {
                self.absorb(acc, &path.display(), result)
            })
            .reduce(UnitAccumulator::default, UnitAccumulator::merge);
        Ok(self.finish(acc, paths.len()))
    }

    /// Analyze in-memory class artifacts.
    pub fn build_from_bytes<B: AsRef<[u8]> + Sync>(&self, artifacts: &[B]) -> carve_core::Result<UnitGraph> {
        if artifacts.is_empty() {
            return Err(CarveError::NoArtifacts {
                module: self.module.clone(),
            });
        }
        let acc = artifacts
            .par_iter()
            .enumerate()
            .map(|(i, bytes)| (i, extract_references(bytes.as_ref())))
            .fold(UnitAccumulator::default, |acc, (i, result)| {
                self.absorb(acc, &format!("artifact #{i}"), result)
            })
            .reduce(UnitAccumulator::default, UnitAccumulator::merge);
        Ok(self.finish(acc, artifacts.len()))
    }

    fn absorb(
        &self,
        mut acc: UnitAccumulator,
        origin: &dyn std::fmt::Display,
        result: ParseResult<ClassReferences>,
    ) -> UnitAccumulator {
        match result {
            Ok(class) => {
                acc.parsed += 1;
                self.add_class(&mut acc, class);
            }
            Err(e) => {
                warn!("Skipping {} in {}: {}", origin, self.module, e);
                acc.skipped += 1;
            }
        }
        acc
    }

    fn add_class(&self, acc: &mut UnitAccumulator, class: ClassReferences) {
        if !self.filter.is_in_scope(&class.name) {
            return;
        }
        acc.add_node(
            &class.name,
            NodeState {
                is_interface: class.is_interface && !class.is_nested,
                top_level: !class.is_nested,
            },
        );

        for (target, count) in class.references {
            if target == class.name && self.self_references == SelfReferencePolicy::Drop {
                continue;
            }
            if !self.filter.is_in_scope(&target) {
                continue;
            }
            *acc.edges.entry((class.name.clone(), target)).or_insert(0) += count as u64;
        }
    }

    fn finish(&self, acc: UnitAccumulator, artifacts: usize) -> UnitGraph {
        let nodes = acc
            .nodes
            .into_iter()
            .map(|(name, state)| {
                let node = ClassNode::new(name.clone(), state.is_interface, self.module.clone());
                (name, node)
            })
            .collect();
        let unit = UnitGraph::from_maps(self.module.clone(), nodes, acc.edges);

        info!(
            "Unit {}: {} artifacts ({} skipped), {} classes, {} dependencies",
            self.module,
            artifacts,
            acc.skipped,
            unit.nodes.len(),
            unit.edges.len()
        );
        debug!("Unit {}: {} artifacts parsed", self.module, acc.parsed);
        unit
    }
}

fn read_and_extract(path: &Path) -> ParseResult<ClassReferences> {
    let bytes = std::fs::read(path).map_err(|source| ClassFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    extract_references(&bytes)
}

/// Interface-ness of a canonical class. Nested artifacts collapse into
/// their top-level class but never decide whether it is an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeState {
    is_interface: bool,
    top_level: bool,
}

impl NodeState {
    fn merge(self, other: NodeState) -> NodeState {
        match (self.top_level, other.top_level) {
            (true, false) => self,
            (false, true) => other,
            _ => NodeState {
                is_interface: self.is_interface || other.is_interface,
                top_level: self.top_level,
            },
        }
    }
}

#[derive(Debug, Default)]
struct UnitAccumulator {
    nodes: BTreeMap<String, NodeState>,
    edges: BTreeMap<(String, String), u64>,
    parsed: usize,
    skipped: usize,
}

impl UnitAccumulator {
    fn add_node(&mut self, name: &str, state: NodeState) {
        match self.nodes.get_mut(name) {
            Some(existing) => *existing = existing.merge(state),
            None => {
                self.nodes.insert(name.to_string(), state);
            }
        }
    }

    fn merge(mut self, other: UnitAccumulator) -> UnitAccumulator {
        for (name, state) in other.nodes {
            self.add_node(&name, state);
        }
        for (key, weight) in other.edges {
            *self.edges.entry(key).or_insert(0) += weight;
        }
        self.parsed += other.parsed;
        self.skipped += other.skipped;
        self
    }
}
