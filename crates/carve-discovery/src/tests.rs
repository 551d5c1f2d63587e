//! Unit tests for carve-discovery

use crate::*;
use carve_core::{AnalysisConfig, CarveError, ClassNode, DependencyEdge, DependencyGraph};
use proptest::prelude::*;

fn class(name: &str) -> String {
    format!("com.example.{name}")
}

fn build_graph(nodes: &[(&str, &str)], edges: &[(&str, &str, u64)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (name, module) in nodes {
        graph.add_node(ClassNode::new(class(name), false, *module));
    }
    for (source, target, weight) in edges {
        graph.add_edge(&class(source), &class(target), *weight);
    }
    graph
}

fn config(monolith: &str, features: &[&str]) -> AnalysisConfig {
    AnalysisConfig {
        monolith_module: monolith.to_string(),
        feature_modules: features.iter().map(|f| f.to_string()).collect(),
        ..AnalysisConfig::default()
    }
}

fn member_names(candidate: &ModuleCandidate) -> Vec<&str> {
    candidate
        .members
        .iter()
        .map(|m| m.trim_start_matches("com.example."))
        .collect()
}

fn two_triangles() -> DependencyGraph {
    let nodes: Vec<(&str, &str)> = ["A", "B", "C", "D", "E", "F"].iter().map(|n| (*n, "app")).collect();
    build_graph(
        &nodes,
        &[
            ("A", "B", 5),
            ("B", "C", 5),
            ("C", "A", 5),
            ("D", "E", 5),
            ("E", "F", 5),
            ("F", "D", 5),
            ("C", "D", 1),
        ],
    )
}

#[test]
fn test_two_triangles_become_two_candidates() {
    let report = ModuleDiscovery::new(&config("app", &[])).unwrap().run(&two_triangles()).unwrap();

    assert_eq!(report.scoped_nodes, 6);
    assert_eq!(report.scoped_edges, 7);
    assert_eq!(report.levels, 1);
    assert_eq!(report.candidates.len(), 2);

    // Sorted best first: the triangle with no way out leads
    let def = &report.candidates[0];
    assert_eq!(member_names(def), vec!["D", "E", "F"]);
    assert_eq!(def.community, 1);
    assert_eq!(def.conductance, 0.0);
    assert_eq!(def.total_weight, 15);
    assert!(def.is_freely_extractable());

    let abc = &report.candidates[1];
    assert_eq!(member_names(abc), vec!["A", "B", "C"]);
    assert_eq!(abc.conductance, 1.0 / 16.0);
    assert_eq!(abc.cut_weight, 1);
    assert_eq!(abc.total_weight, 16);
    assert_eq!(abc.monolith_cut_weight, 1);
    assert_eq!(abc.cut_edges, vec![DependencyEdge::new(class("C"), class("D"), 1)]);
    assert_eq!(abc.label, "a-b-c");
    assert!(report.modularity > 0.4);
}

#[test]
fn test_sink_community_has_zero_conductance() {
    let graph = build_graph(&[("Caller", "app"), ("Sink", "app")], &[("Caller", "Sink", 3)]);
    let scope = AnalysisScope::new("app", &[] as &[&str]).unwrap();
    let scoped = scope.restrict(&graph).unwrap();
    let partition = Partition {
        communities: vec![0, 1],
        count: 2,
        levels: 0,
        modularity: 0.0,
    };

    let metrics = community_metrics(&graph, &scope, &scoped, &partition);
    assert_eq!(metrics[0].total_weight, 3);
    assert_eq!(metrics[0].conductance(), 1.0);
    assert_eq!(metrics[1].total_weight, 0);
    assert_eq!(metrics[1].conductance(), 0.0);
}

#[test]
fn test_restrict_keeps_largest_component() {
    let graph = build_graph(
        &[("A", "app"), ("B", "app"), ("C", "app"), ("D", "app"), ("E", "app")],
        &[("A", "B", 1), ("C", "B", 1), ("D", "E", 4)],
    );
    let scope = AnalysisScope::new("app", &[] as &[&str]).unwrap();
    let scoped = scope.restrict(&graph).unwrap();
    let kept: Vec<&str> = scoped
        .nodes()
        .iter()
        .map(|&id| graph.node(id).unwrap().label.as_str())
        .collect();
    assert_eq!(kept, vec!["A", "B", "C"]);
    assert_eq!(scoped.edges(), &[(0, 1, 1), (2, 1, 1)]);
}

#[test]
fn test_component_tie_prefers_smallest_name() {
    let graph = build_graph(
        &[("Zeta", "app"), ("Omega", "app"), ("Alpha", "app"), ("Beta", "app")],
        &[("Zeta", "Omega", 9), ("Beta", "Alpha", 1)],
    );
    let scope = AnalysisScope::new("app", &[] as &[&str]).unwrap();
    let scoped = scope.restrict(&graph).unwrap();
    let kept: Vec<&str> = scoped
        .nodes()
        .iter()
        .map(|&id| graph.node(id).unwrap().label.as_str())
        .collect();
    assert_eq!(kept, vec!["Alpha", "Beta"]);
}

#[test]
fn test_empty_scope_is_an_error() {
    let discovery = ModuleDiscovery::new(&config("legacy", &["feature-.*"])).unwrap();
    let err = discovery.run(&two_triangles()).unwrap_err();
    assert!(matches!(err, CarveError::EmptyScope { ref monolith, .. } if monolith == "legacy"));
}

#[test]
fn test_invalid_feature_pattern() {
    let err = ModuleDiscovery::new(&config("app", &["feature-("])).unwrap_err();
    assert!(matches!(err, CarveError::InvalidPattern { .. }));
}

#[test]
fn test_feature_modules_join_scope() {
    let graph = build_graph(
        &[
            ("Home", "app"),
            ("Feed", "feature-feed"),
            ("FeedItem", "feature-feed"),
            ("Logger", "lib-logging"),
        ],
        &[
            ("Home", "Feed", 2),
            ("Feed", "FeedItem", 4),
            ("Home", "Logger", 3),
            ("Feed", "Logger", 1),
        ],
    );
    let scope = AnalysisScope::new("app", &["feature-.*"]).unwrap();
    assert!(scope.module_in_scope("feature-feed"));
    assert!(!scope.module_in_scope("my-feature-feed"));
    assert!(!scope.module_in_scope("lib-logging"));

    let report = ModuleDiscovery::new(&config("app", &["feature-.*"])).unwrap().run(&graph).unwrap();
    assert_eq!(report.scoped_nodes, 3);
    for candidate in &report.candidates {
        assert!(candidate.members.iter().all(|m| !m.ends_with("Logger")));
    }

    // Edges into the library count toward the total but never toward the cut
    let total: u64 = report.candidates.iter().map(|c| c.total_weight).sum();
    assert_eq!(total, 10);
    let cut: u64 = report.candidates.iter().map(|c| c.cut_weight).sum();
    assert!(cut <= 2);
}

#[test]
fn test_members_grouped_by_module() {
    let graph = build_graph(
        &[("Home", "app"), ("Feed", "feature-feed")],
        &[("Home", "Feed", 2), ("Feed", "Home", 2)],
    );
    let report = ModuleDiscovery::new(&config("app", &["feature-.*"])).unwrap().run(&graph).unwrap();
    assert_eq!(report.candidates.len(), 1);
    let candidate = &report.candidates[0];
    assert!(candidate.contains_monolith);
    assert_eq!(candidate.members_by_module["app"], vec![class("Home")]);
    assert_eq!(candidate.members_by_module["feature-feed"], vec![class("Feed")]);
    assert_eq!(report.candidate_of(&class("Feed")).map(|c| c.community), Some(0));
}

#[test]
fn test_feature_only_community_lists_no_cut_edges() {
    let graph = build_graph(
        &[
            ("Home", "app"),
            ("Settings", "app"),
            ("Feed", "feature-feed"),
            ("FeedItem", "feature-feed"),
        ],
        &[
            ("Home", "Settings", 6),
            ("Settings", "Home", 6),
            ("Feed", "FeedItem", 6),
            ("FeedItem", "Feed", 6),
            ("Feed", "Home", 1),
        ],
    );
    let report = ModuleDiscovery::new(&config("app", &["feature-.*"])).unwrap().run(&graph).unwrap();
    assert_eq!(report.candidates.len(), 2);

    let feed = report.candidate_of(&class("Feed")).unwrap();
    assert!(!feed.contains_monolith);
    assert_eq!(feed.monolith_cut_weight, 1);
    assert!(feed.cut_edges.is_empty());
    assert_eq!(feed.total_weight, 13);
    assert_eq!(feed.conductance, 1.0 / 13.0);
}

#[test]
fn test_excluded_interfaces_still_count_as_cut() {
    let mut graph = build_graph(
        &[("Service", "app"), ("Client", "app")],
        &[("Client", "Service", 2), ("Service", "Client", 2)],
    );
    graph.add_node(ClassNode::new(class("Api"), true, "app"));
    graph.add_edge(&class("Service"), &class("Api"), 1);

    let mut analysis = config("app", &[]);
    analysis.exclude_interfaces = true;
    let report = ModuleDiscovery::new(&analysis).unwrap().run(&graph).unwrap();

    assert_eq!(report.scoped_nodes, 2);
    let candidate = &report.candidates[0];
    assert_eq!(candidate.cut_weight, 1);
    assert_eq!(candidate.cut_edges, vec![DependencyEdge::new(class("Service"), class("Api"), 1)]);
    assert!(!candidate.is_freely_extractable());
}

#[test]
fn test_labels_use_distinctive_tokens() {
    let graph = build_graph(
        &[
            ("PaymentService", "app"),
            ("PaymentGateway", "app"),
            ("UserService", "app"),
            ("UserProfile", "app"),
        ],
        &[
            ("PaymentService", "PaymentGateway", 8),
            ("PaymentGateway", "PaymentService", 8),
            ("UserService", "UserProfile", 8),
            ("UserProfile", "UserService", 8),
            ("UserService", "PaymentService", 1),
        ],
    );
    let report = ModuleDiscovery::new(&config("app", &[])).unwrap().run(&graph).unwrap();
    let payment = report.candidate_of(&class("PaymentGateway")).unwrap();
    let user = report.candidate_of(&class("UserProfile")).unwrap();
    // "Service" appears on both sides and ranks last
    assert_eq!(payment.label, "payment-gateway-service");
    assert_eq!(user.label, "user-profile-service");
}

#[test]
fn test_hub_is_reported_as_core() {
    let graph = build_graph(
        &[("Hub", "app"), ("One", "app"), ("Two", "app"), ("Three", "app"), ("Four", "app")],
        &[("One", "Hub", 1), ("Two", "Hub", 1), ("Three", "Hub", 1), ("Four", "Hub", 1)],
    );
    let mut analysis = config("app", &[]);
    analysis.core_percentile = 0.5;
    let report = ModuleDiscovery::new(&analysis).unwrap().run(&graph).unwrap();
    let cores: Vec<&str> = report.cores.iter().map(|c| c.class.as_str()).collect();
    assert_eq!(cores, vec![class("Hub").as_str()]);
}

/// Two triangles joined by one edge, and a hub every class depends on.
fn triangles_with_hub() -> DependencyGraph {
    let names = ["A", "B", "C", "D", "E", "F", "Hub"];
    let nodes: Vec<(&str, &str)> = names.iter().map(|n| (*n, "app")).collect();
    let mut edges = vec![
        ("A", "B", 5),
        ("B", "C", 5),
        ("C", "A", 5),
        ("D", "E", 5),
        ("E", "F", 5),
        ("F", "D", 5),
        ("C", "D", 1),
    ];
    for name in &names[..6] {
        edges.push((*name, "Hub", 2));
    }
    build_graph(&nodes, &edges)
}

#[test]
fn test_cores_stay_in_clustering_by_default() {
    let mut analysis = config("app", &[]);
    analysis.core_percentile = 0.7;
    let report = ModuleDiscovery::new(&analysis).unwrap().run(&triangles_with_hub()).unwrap();

    assert!(!report.cores_excluded);
    assert_eq!(report.cores.len(), 1);
    assert_eq!(report.cores[0].class, class("Hub"));
    assert_eq!(report.scoped_nodes, 7);
    assert!(report.candidate_of(&class("Hub")).is_some());
}

#[test]
fn test_excluded_cores_leave_the_clustered_component() {
    let mut analysis = config("app", &[]);
    analysis.core_percentile = 0.7;
    analysis.exclude_cores = true;
    let report = ModuleDiscovery::new(&analysis).unwrap().run(&triangles_with_hub()).unwrap();

    assert!(report.cores_excluded);
    assert_eq!(report.cores.len(), 1);
    assert_eq!(report.cores[0].class, class("Hub"));
    assert_eq!(report.scoped_nodes, 6);
    assert_eq!(report.scoped_edges, 7);
    assert!(report.candidate_of(&class("Hub")).is_none());

    assert_eq!(report.candidates.len(), 2);
    let abc = report.candidate_of(&class("A")).unwrap();
    assert_eq!(member_names(abc), vec!["A", "B", "C"]);
    // The hub still lives in the monolith, so edges into it are cut edges
    let hub_edges = abc.cut_edges.iter().filter(|e| e.target == class("Hub")).count();
    assert_eq!(hub_edges, 3);
    assert_eq!(member_names(report.candidate_of(&class("D")).unwrap()), vec!["D", "E", "F"]);
}

#[test]
fn test_report_serializes() {
    let report = ModuleDiscovery::new(&config("app", &[])).unwrap().run(&two_triangles()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["monolith_module"], "app");
    assert_eq!(json["candidates"][1]["cut_edges"][0]["Source"], "com.example.C");
    let back: DiscoveryReport = serde_json::from_value(json).unwrap();
    assert_eq!(back.candidates.len(), report.candidates.len());
    assert_eq!(back.candidates[0].members, report.candidates[0].members);
}

fn arbitrary_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize, u64)>)> {
    (2usize..9).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n, 1u64..6), 0..24)))
}

proptest! {
    #[test]
    fn prop_partition_covers_scope_and_conductance_is_bounded((n, edges) in arbitrary_edges()) {
        let names: Vec<String> = (0..n).map(|i| format!("C{i}")).collect();
        let nodes: Vec<(&str, &str)> = names.iter().map(|name| (name.as_str(), "app")).collect();
        let edges: Vec<(&str, &str, u64)> = edges
            .iter()
            .map(|&(s, t, w)| (names[s].as_str(), names[t].as_str(), w))
            .collect();
        let graph = build_graph(&nodes, &edges);

        let report = ModuleDiscovery::new(&config("app", &[])).unwrap().run(&graph).unwrap();
        let mut members: Vec<&String> = report.candidates.iter().flat_map(|c| &c.members).collect();
        let clustered = members.len();
        members.sort();
        members.dedup();
        prop_assert_eq!(members.len(), clustered);
        prop_assert_eq!(clustered, report.scoped_nodes);

        for candidate in &report.candidates {
            prop_assert!((0.0..=1.0).contains(&candidate.conductance));
            prop_assert!(candidate.cut_weight <= candidate.total_weight);
            prop_assert_eq!(candidate.conductance == 0.0, candidate.cut_weight == 0);
        }
    }

    #[test]
    fn prop_clustering_never_loses_modularity((n, edges) in arbitrary_edges()) {
        let graph = WeightedGraph::from_directed(n, &edges);
        let partition = Louvain::new().detect(&graph);
        let singletons: Vec<usize> = (0..n).collect();
        prop_assert!(partition.modularity >= modularity(&graph, &singletons, 1.0) - 1e-9);
        prop_assert_eq!(partition.communities.len(), n);
        prop_assert!(partition.communities.iter().all(|&c| c < partition.count));
    }
}
