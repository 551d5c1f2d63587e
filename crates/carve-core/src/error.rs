//! Pipeline and configuration errors

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for carve library operations.
pub type Result<T, E = CarveError> = std::result::Result<T, E>;

/// Fatal errors that abort a run before clustering.
///
/// Per-artifact parse failures are not represented here; they are logged
/// and the artifact is skipped by the indexer.
#[derive(Debug, Error)]
pub enum CarveError {
    #[error("no class artifacts were supplied for module `{module}`")]
    NoArtifacts { module: String },

    #[error(
        "aggregated dependency graph is empty ({nodes} nodes, {edges} edges); \
         check that the package prefix matches the analyzed classes and that every module was extracted"
    )]
    EmptyGraph { nodes: usize, edges: usize },

    #[error(
        "no classes left to cluster: monolith `{monolith}` and feature modules {features:?} \
         matched nothing in the aggregated graph"
    )]
    EmptyScope {
        monolith: String,
        features: Vec<String>,
    },

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Compile a pattern so that it must match the whole input.
pub fn full_match_regex(pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(&format!("^(?:{pattern})$")).map_err(|source| CarveError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
