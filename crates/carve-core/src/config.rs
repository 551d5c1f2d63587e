//! `carve.toml` configuration model

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CarveError, Result};
use crate::model::SelfReferencePolicy;

/// Default configuration file name looked up in the project root.
pub const CONFIG_FILE: &str = "carve.toml";

/// Simple-name patterns for generated code and injected boilerplate.
pub const DEFAULT_IGNORED_CLASSES: &[&str] = &[
    ".*Dagger.*",
    ".*Hilt.*",
    ".*Inject.*",
    ".*ViewBinding$",
    ".*_Factory$",
    ".*_.*",
    "^R$",
    "^R\\$.*",
    "^LiveLiterals$",
    ".*Binding$",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CarveConfig {
    pub extract: ExtractConfig,
    pub analysis: AnalysisConfig,
}

/// Settings consumed by the per-unit graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Only classes whose canonical name starts with this prefix are kept.
    pub package_prefix: String,
    /// Full-match regexes applied to simple class names.
    pub ignored_classes: Vec<String>,
    pub self_references: SelfReferencePolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            package_prefix: String::new(),
            ignored_classes: DEFAULT_IGNORED_CLASSES.iter().map(|s| s.to_string()).collect(),
            self_references: SelfReferencePolicy::default(),
        }
    }
}

/// Settings consumed by module discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub monolith_module: String,
    /// Full-match regexes applied to module identifiers.
    pub feature_modules: Vec<String>,
    pub exclude_interfaces: bool,
    /// Modularity resolution; higher values produce smaller communities.
    pub resolution: f64,
    /// Number of tokens joined into a community label.
    pub label_terms: usize,
    /// Rank percentile above which classes are reported as cores.
    pub core_percentile: f64,
    /// Remove core classes from the clustered component.
    pub exclude_cores: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            monolith_module: String::new(),
            feature_modules: Vec::new(),
            exclude_interfaces: false,
            resolution: 1.0,
            label_terms: 3,
            core_percentile: 0.95,
            exclude_cores: false,
        }
    }
}

impl CarveConfig {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self> {
        let config: CarveConfig = toml::from_str(contents).map_err(|source| CarveError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CarveError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents, path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `carve.toml` from `root` if it exists, otherwise use defaults.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = config_path(root);
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, root.display());
            Ok(Self::default())
        }
    }

    /// Range checks that do not depend on the analyzed graph.
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if !(analysis.resolution.is_finite() && analysis.resolution > 0.0) {
            return Err(CarveError::InvalidConfig(format!(
                "analysis.resolution must be a positive number, got {}",
                analysis.resolution
            )));
        }
        if analysis.label_terms == 0 {
            return Err(CarveError::InvalidConfig(
                "analysis.label_terms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&analysis.core_percentile) {
            return Err(CarveError::InvalidConfig(format!(
                "analysis.core_percentile must be within [0, 1], got {}",
                analysis.core_percentile
            )));
        }
        Ok(())
    }
}

/// Path of the configuration file for a project root.
pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}
