//! On-disk storage of unit tables, aggregated tables and reports

use crate::graph::DependencyGraph;
use crate::model::{GraphTables, UnitGraph};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default output directory: .carve/
pub const OUTPUT_DIR: &str = ".carve";

/// Per-unit tables live in this subdirectory.
pub const UNITS_DIR: &str = "units";

pub const NODES_TABLE: &str = "nodes.json";
pub const EDGES_TABLE: &str = "edges.json";

/// Binary snapshot of the aggregated tables, read back by `analyze`.
pub const GRAPH_SNAPSHOT: &str = "graph.bin";

pub const MANIFEST: &str = "manifest.json";
pub const REPORT: &str = "report.json";

/// Get the directory holding per-unit tables.
pub fn units_dir(out: &Path) -> PathBuf {
    out.join(UNITS_DIR)
}

/// Get the table file path for a module.
///
/// Bytes outside `[A-Za-z0-9._-]` are percent-encoded, so distinct module
/// identifiers such as `:app` and `app` never share a file.
pub fn unit_path(out: &Path, module: &str) -> PathBuf {
    let mut file_name = String::with_capacity(module.len() + 5);
    for byte in module.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            file_name.push(byte as char);
        } else {
            file_name.push_str(&format!("%{byte:02X}"));
        }
    }
    file_name.push_str(".json");
    units_dir(out).join(file_name)
}

pub fn report_path(out: &Path) -> PathBuf {
    out.join(REPORT)
}

/// Ensure a directory exists
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Persist one unit's tables.
pub fn save_unit(out: &Path, unit: &UnitGraph) -> anyhow::Result<PathBuf> {
    ensure_dir(&units_dir(out))?;
    let path = unit_path(out, &unit.module);
    write_json(&path, unit)?;
    tracing::debug!("Unit tables for {} saved: {}", unit.module, path.display());
    Ok(path)
}

/// Load every persisted unit, sorted by module identifier.
pub fn load_units(out: &Path) -> anyhow::Result<Vec<UnitGraph>> {
    let dir = units_dir(out);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut units = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let unit: UnitGraph = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse unit tables {}", path.display()))?;
        units.push(unit);
    }
    units.sort_by(|a, b| a.module.cmp(&b.module));
    Ok(units)
}

/// Persist the aggregated graph as sorted JSON tables plus a binary snapshot.
pub fn save_graph(out: &Path, graph: &DependencyGraph) -> anyhow::Result<()> {
    ensure_dir(out)?;
    let tables = graph.tables();

    write_json(&out.join(NODES_TABLE), &tables.nodes)?;
    write_json(&out.join(EDGES_TABLE), &tables.edges)?;

    let snapshot = bincode::serialize(&tables)?;
    std::fs::write(out.join(GRAPH_SNAPSHOT), snapshot)?;

    let manifest = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "node_count": tables.nodes.len(),
        "edge_count": tables.edges.len(),
        "generated_at": chrono::Utc::now().to_rfc3339()
    });
    write_json(&out.join(MANIFEST), &manifest)?;

    tracing::debug!("Aggregated graph saved to {}", out.display());
    Ok(())
}

/// Load the aggregated graph snapshot, if one was saved.
pub fn load_graph(out: &Path) -> anyhow::Result<Option<DependencyGraph>> {
    let path = out.join(GRAPH_SNAPSHOT);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let tables: GraphTables = bincode::deserialize(&bytes)
        .with_context(|| format!("corrupt graph snapshot {}", path.display()))?;
    let (graph, dangling) = DependencyGraph::from_tables(tables.nodes, tables.edges);
    if !dangling.is_empty() {
        anyhow::bail!(
            "graph snapshot {} has {} edges without endpoints",
            path.display(),
            dangling.len()
        );
    }

    tracing::debug!("Aggregated graph loaded from: {}", path.display());
    Ok(Some(graph))
}

/// Persist any serializable report next to the tables.
pub fn save_report<T: Serialize>(out: &Path, report: &T) -> anyhow::Result<PathBuf> {
    ensure_dir(out)?;
    let path = report_path(out);
    write_json(&path, report)?;
    Ok(path)
}

/// Clear the output directory
pub fn clear_output(out: &Path) -> std::io::Result<()> {
    if out.exists() {
        std::fs::remove_dir_all(out)?;
    }
    Ok(())
}
