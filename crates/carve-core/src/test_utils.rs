//! Test fixtures for unit tables and graphs

use crate::model::{ClassNode, DependencyEdge, UnitGraph};

/// Build unit tables from `(class, is_interface)` rows and `(source, target, weight)` edges.
pub fn unit(module: &str, classes: &[(&str, bool)], edges: &[(&str, &str, u64)]) -> UnitGraph {
    let mut nodes: Vec<ClassNode> = classes
        .iter()
        .map(|(name, is_interface)| ClassNode::new(*name, *is_interface, module))
        .collect();
    nodes.sort();
    let mut edges: Vec<DependencyEdge> = edges
        .iter()
        .map(|(s, t, w)| DependencyEdge::new(*s, *t, *w))
        .collect();
    edges.sort();
    UnitGraph {
        module: module.to_string(),
        nodes,
        edges,
    }
}

/// `Foo -> Bar (2)`, `Bar -> Baz (1)` in one module.
pub fn chain_unit() -> UnitGraph {
    unit(
        "app",
        &[("com.example.Foo", false), ("com.example.Bar", false), ("com.example.Baz", false)],
        &[("com.example.Foo", "com.example.Bar", 2), ("com.example.Bar", "com.example.Baz", 1)],
    )
}

/// Two modules with a cross-module edge and one edge into a class without artifacts.
pub fn split_units() -> Vec<UnitGraph> {
    vec![
        unit(
            "app",
            &[("com.example.app.Main", false), ("com.example.app.Router", false)],
            &[
                ("com.example.app.Main", "com.example.app.Router", 3),
                ("com.example.app.Main", "com.example.feed.FeedScreen", 1),
                ("com.example.app.Router", "com.example.generated.Missing", 4),
            ],
        ),
        unit(
            "feed",
            &[("com.example.feed.FeedScreen", false), ("com.example.feed.FeedSource", true)],
            &[("com.example.feed.FeedScreen", "com.example.feed.FeedSource", 2)],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_rows_sorted() {
        let unit = chain_unit();
        let ids: Vec<&str> = unit.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["com.example.Bar", "com.example.Baz", "com.example.Foo"]);
        assert_eq!(unit.edges[0].source, "com.example.Bar");
    }
}
