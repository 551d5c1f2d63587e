//! Carve Core: class dependency graph model, aggregation and persisted tables

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;


#[cfg(test)]
pub mod test_utils;

pub use aggregation::{aggregate_units, GraphAccumulator};
pub use cache::{
    clear_output, load_graph, load_units, report_path, save_graph, save_report, save_unit, unit_path,
    OUTPUT_DIR,
};
pub use config::{AnalysisConfig, CarveConfig, ExtractConfig, CONFIG_FILE, DEFAULT_IGNORED_CLASSES};
pub use error::{full_match_regex, CarveError, Result};
pub use graph::DependencyGraph;
pub use model::{
    simple_name, ClassNode, DependencyEdge, GraphTables, NodeId, SelfReferencePolicy, UnitGraph,
};
