//! Integration tests for Carve
//!
//! Compiled class files go through extraction, aggregation and discovery,
//! both through the library crates and through the `carve` binary.

use std::path::Path;
use std::process::Command;

use carve_core::{aggregate_units, AnalysisConfig, CarveConfig, DependencyEdge, UnitGraph};
use carve_discovery::{DiscoveryReport, ModuleDiscovery};
use carve_indexer::test_utils::ClassFileWriter;
use carve_indexer::{discover_class_files, UnitGraphBuilder};
use tempfile::TempDir;

/// A class holding one field per referenced class.
fn class_with_fields(name: &str, references: &[&str]) -> ClassFileWriter {
    references.iter().enumerate().fold(ClassFileWriter::new(name), |writer, (i, target)| {
        writer.field(&format!("f{i}"), &format!("L{target};"))
    })
}

/// Two tightly knit groups in the monolith, joined by one reference, plus
/// a feature module screen that uses the profile group.
fn write_fixture(root: &Path) {
    let app = root.join("app");
    let feed = root.join("feed");
    let billing = [
        "com/example/billing/InvoiceMapper",
        "com/example/billing/InvoiceRepository",
        "com/example/billing/InvoiceService",
    ];
    let profile = [
        "com/example/profile/ProfileMapper",
        "com/example/profile/ProfileRepository",
        "com/example/profile/ProfileService",
    ];

    for group in [&billing, &profile] {
        for name in group.iter() {
            let mut others: Vec<&str> = group.iter().copied().filter(|other| other != name).collect();
            if *name == "com/example/profile/ProfileService" {
                others.push("com/example/billing/InvoiceService");
            }
            class_with_fields(name, &others).write_to(&app).unwrap();
        }
    }
    // Generated code never makes it into the graph
    class_with_fields("com/example/billing/InvoiceService_Factory", &["com/example/billing/InvoiceService"])
        .write_to(&app)
        .unwrap();

    class_with_fields("com/example/feed/FeedScreen", &["com/example/profile/ProfileService"])
        .write_to(&feed)
        .unwrap();
}

fn config() -> CarveConfig {
    let mut config = CarveConfig::default();
    config.extract.package_prefix = "com.example".to_string();
    config.analysis = AnalysisConfig {
        monolith_module: "app".to_string(),
        feature_modules: vec!["feature-.*".to_string()],
        ..AnalysisConfig::default()
    };
    config
}

fn extract(root: &Path, module: &str, dir: &str, config: &CarveConfig) -> UnitGraph {
    let files = discover_class_files(&[root.join(dir)]).unwrap();
    UnitGraphBuilder::from_config(module, &config.extract)
        .unwrap()
        .build(&files)
        .unwrap()
}

fn assert_expected_candidates(report: &DiscoveryReport) {
    assert_eq!(report.scoped_nodes, 7);
    assert_eq!(report.candidates.len(), 2);

    let billing = &report.candidates[0];
    assert_eq!(billing.label, "invoice-mapper-repository");
    assert_eq!(billing.conductance, 0.0);
    assert_eq!(billing.total_weight, 6);
    assert!(billing.is_freely_extractable());

    let profile = &report.candidates[1];
    assert_eq!(profile.label, "profile-feed-screen");
    assert_eq!(profile.total_weight, 8);
    assert_eq!(profile.conductance, 1.0 / 8.0);
    assert_eq!(
        profile.cut_edges,
        vec![DependencyEdge::new(
            "com.example.profile.ProfileService",
            "com.example.billing.InvoiceService",
            1
        )]
    );
    assert_eq!(
        profile.members_by_module["feature-feed"],
        vec!["com.example.feed.FeedScreen".to_string()]
    );
}

#[test]
fn test_pipeline_from_class_files() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let config = config();

    let app = extract(dir.path(), "app", "app", &config);
    let feed = extract(dir.path(), "feature-feed", "feed", &config);
    assert_eq!(app.nodes.len(), 6);
    assert!(app.nodes.iter().all(|n| !n.id.contains("_Factory")));
    // The feature unit points at a class it has no artifact for
    assert_eq!(feed.nodes.len(), 1);
    assert_eq!(feed.edges.len(), 1);

    let graph = aggregate_units(&[app, feed]).unwrap();
    assert_eq!(graph.node_count(), 7);
    assert_eq!(graph.edge_count(), 14);

    let report = ModuleDiscovery::new(&config.analysis).unwrap().run(&graph).unwrap();
    assert_expected_candidates(&report);
}

#[test]
fn test_persisted_tables_reload_identically() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let out = dir.path().join(".carve");
    let config = config();

    for (module, classes) in [("app", "app"), ("feature-feed", "feed")] {
        let unit = extract(dir.path(), module, classes, &config);
        carve_core::save_unit(&out, &unit).unwrap();
    }
    let units = carve_core::load_units(&out).unwrap();
    assert_eq!(
        units.iter().map(|u| u.module.as_str()).collect::<Vec<_>>(),
        vec!["app", "feature-feed"]
    );

    let graph = aggregate_units(&units).unwrap();
    carve_core::save_graph(&out, &graph).unwrap();
    let reloaded = carve_core::load_graph(&out).unwrap().unwrap();
    assert_eq!(reloaded.tables(), graph.tables());

    let nodes: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("nodes.json")).unwrap()).unwrap();
    assert_eq!(nodes[0]["Id"], "com.example.billing.InvoiceMapper");
    assert_eq!(nodes[0]["Module"], "app");
}

#[test]
fn test_extraction_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let config = config();

    let first = extract(dir.path(), "app", "app", &config);
    let second = extract(dir.path(), "app", "app", &config);
    assert_eq!(first, second);
}

#[test]
fn test_cli_run_writes_report() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    let out = dir.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_carve"))
        .current_dir(dir.path())
        .arg("--out")
        .arg(&out)
        .args(["run", "--unit", "app=app", "--unit", "feature-feed=feed"])
        .args(["--prefix", "com.example", "--monolith", "app", "--feature", "feature-.*"])
        .status()
        .expect("failed to run carve");
    assert!(status.success());

    let report: DiscoveryReport =
        serde_json::from_str(&std::fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
    assert_expected_candidates(&report);
    assert!(out.join("graph.bin").exists());
    assert!(out.join("units").join("feature-feed.json").exists());
}

#[test]
fn test_cli_staged_commands() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());
    std::fs::write(
        dir.path().join("carve.toml"),
        "[extract]\npackage_prefix = \"com.example\"\n\n[analysis]\nmonolith_module = \"app\"\nfeature_modules = [\"feature-.*\"]\n",
    )
    .unwrap();

    let carve = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_carve"))
            .current_dir(dir.path())
            .args(args)
            .status()
            .expect("failed to run carve")
    };

    // Nothing aggregated yet
    assert!(!carve(&["analyze"]).success());

    assert!(carve(&["extract", "--module", "app", "--classes", "app"]).success());
    assert!(carve(&["extract", "--module", "feature-feed", "--classes", "feed"]).success());
    assert!(carve(&["aggregate"]).success());
    assert!(carve(&["analyze"]).success());
    assert!(dir.path().join(".carve").join("report.json").exists());

    assert!(carve(&["clear"]).success());
    assert!(!dir.path().join(".carve").exists());
}

#[test]
fn test_cli_rejects_unmatched_scope() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path());

    let status = Command::new(env!("CARGO_BIN_EXE_carve"))
        .current_dir(dir.path())
        .args(["run", "--unit", "app=app", "--prefix", "com.example", "--monolith", "legacy"])
        .status()
        .expect("failed to run carve");
    assert!(!status.success());
}
