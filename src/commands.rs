//! CLI command implementations

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use carve_core::{CarveConfig, DependencyGraph, UnitGraph};
use carve_discovery::{DiscoveryReport, ModuleDiscovery};
use carve_indexer::{discover_class_files, UnitGraphBuilder};
use clap::Args;

/// Flags that override the `[extract]` section of the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct ExtractOverrides {
    /// Package prefix of the analyzed classes
    #[arg(long)]
    pub prefix: Option<String>,

    /// Ignored simple-name pattern, repeatable; replaces the configured list
    #[arg(long = "ignore")]
    pub ignore: Vec<String>,
}

/// Flags that override the `[analysis]` section of the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct AnalysisOverrides {
    /// Module identifier of the monolith
    #[arg(long)]
    pub monolith: Option<String>,

    /// Feature module pattern, repeatable; replaces the configured list
    #[arg(long = "feature")]
    pub feature: Vec<String>,

    /// Remove core classes before clustering
    #[arg(long)]
    pub exclude_cores: bool,
}

/// One `<module>=<classes dir>` argument of `carve run`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitArg {
    pub module: String,
    pub classes: PathBuf,
}

pub fn parse_unit(value: &str) -> Result<UnitArg, String> {
    match value.split_once('=') {
        Some((module, classes)) if !module.is_empty() && !classes.is_empty() => Ok(UnitArg {
            module: module.to_string(),
            classes: PathBuf::from(classes),
        }),
        _ => Err(format!("expected <module>=<classes dir>, got `{value}`")),
    }
}

/// Read the config file (or defaults) and apply command-line overrides.
pub fn load_config(
    path: Option<&Path>,
    extract: &ExtractOverrides,
    analysis: &AnalysisOverrides,
) -> anyhow::Result<CarveConfig> {
    let mut config = match path {
        Some(path) => CarveConfig::load(path)?,
        None => CarveConfig::discover(Path::new("."))?,
    };

    if let Some(prefix) = &extract.prefix {
        config.extract.package_prefix = prefix.clone();
    }
    if !extract.ignore.is_empty() {
        config.extract.ignored_classes = extract.ignore.clone();
    }
    if let Some(monolith) = &analysis.monolith {
        config.analysis.monolith_module = monolith.clone();
    }
    if !analysis.feature.is_empty() {
        config.analysis.feature_modules = analysis.feature.clone();
    }
    if analysis.exclude_cores {
        config.analysis.exclude_cores = true;
    }
    config.validate()?;
    Ok(config)
}

pub fn extract(out: &Path, config: &CarveConfig, module: &str, classes: &[PathBuf]) -> anyhow::Result<UnitGraph> {
    tracing::info!("Extracting unit {} from {} directories", module, classes.len());

    let files = discover_class_files(classes)?;
    let builder = UnitGraphBuilder::from_config(module, &config.extract)?;
    let unit = builder.build(&files)?;
    let path = carve_core::save_unit(out, &unit)?;

    tracing::info!(
        "Unit {}: {} nodes, {} edges written to {}",
        module,
        unit.nodes.len(),
        unit.edges.len(),
        path.display()
    );
    Ok(unit)
}

pub fn aggregate(out: &Path) -> anyhow::Result<DependencyGraph> {
    let units = carve_core::load_units(out)?;
    if units.is_empty() {
        bail!(
            "no unit tables under {}; run `carve extract` for every module first",
            out.display()
        );
    }
    tracing::info!("Aggregating {} units", units.len());

    let graph = carve_core::aggregate_units(&units)?;
    carve_core::save_graph(out, &graph)?;

    tracing::info!(
        "Aggregated graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn analyze(out: &Path, config: &CarveConfig) -> anyhow::Result<()> {
    let graph = carve_core::load_graph(out)?
        .with_context(|| format!("no aggregated graph in {}; run `carve aggregate` first", out.display()))?;
    let report = discover(out, config, &graph)?;
    print_summary(&report);
    Ok(())
}

pub fn run(out: &Path, config: &CarveConfig, units: &[UnitArg]) -> anyhow::Result<()> {
    let mut grouped: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
    for unit in units {
        grouped.entry(unit.module.as_str()).or_default().push(unit.classes.clone());
    }

    // Stale tables of modules not named on this run would leak into aggregation
    let units_dir = carve_core::cache::units_dir(out);
    carve_core::clear_output(&units_dir)
        .with_context(|| format!("failed to clear {}", units_dir.display()))?;
    for (module, classes) in &grouped {
        extract(out, config, module, classes)?;
    }
    let graph = aggregate(out)?;
    let report = discover(out, config, &graph)?;
    print_summary(&report);
    Ok(())
}

fn discover(out: &Path, config: &CarveConfig, graph: &DependencyGraph) -> anyhow::Result<DiscoveryReport> {
    if config.analysis.monolith_module.is_empty() {
        bail!("no monolith module configured; set analysis.monolith_module or pass --monolith");
    }
    let discovery = ModuleDiscovery::new(&config.analysis)?;
    let report = discovery.run(graph)?;
    let path = carve_core::save_report(out, &report)?;
    tracing::info!("Report written to {}", path.display());
    Ok(report)
}

fn print_summary(report: &DiscoveryReport) {
    println!(
        "{} classes in scope, {} candidates, modularity {:.4}",
        report.scoped_nodes,
        report.candidates.len(),
        report.modularity
    );
    for candidate in &report.candidates {
        println!(
            "{:>4}  {:<40} conductance {:.3}  classes {:>4}  cut edges {:>3}{}",
            candidate.community,
            candidate.label,
            candidate.conductance,
            candidate.members.len(),
            candidate.cut_edges.len(),
            if candidate.contains_monolith { "" } else { "  (outside monolith)" }
        );
    }
    if !report.cores.is_empty() {
        let cores: Vec<&str> = report.cores.iter().map(|c| c.class.as_str()).collect();
        let note = if report.cores_excluded { " (excluded from clustering)" } else { "" };
        println!("core classes{}: {}", note, cores.join(", "));
    }
}

pub fn clear(out: &Path) -> anyhow::Result<()> {
    tracing::info!("Clearing output directory: {}", out.display());

    carve_core::clear_output(out)?;

    tracing::info!("Output cleared");
    Ok(())
}
