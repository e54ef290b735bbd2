mod fixtures;

use assert_matches::assert_matches;
use diagram_graph_core::{
    algorithms, Boundary, BoundaryType, ChangeOperation, Edge, EdgeType, EntityKind, EntityLookup,
    Graph, GraphBatch, GraphLookup, GraphStore, Node, NodeType, NodeUpdate, PathConfig, Position,
    Rect, Rule, SearchOptions, Size, StoreError, ValidationCode, ValidationIssue, Validator,
};
use fixtures::sample_graphs::*;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

#[test]
fn test_connected_nodes_scenario() {
    let mut store = GraphStore::new();
    store.add_node(node("A", 0.0, 0.0)).unwrap();
    store.add_node(node("B", 10.0, 0.0)).unwrap();
    store.add_edge(link("e1", "A", "B")).unwrap();

    let connected: Vec<String> = store
        .get_connected_nodes("A")
        .into_iter()
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(connected, vec!["B".to_string()]);
    assert_eq!(store.get_connected_edges("A").len(), 1);
}

#[test]
fn test_checkpoint_scenario() {
    let mut store = GraphStore::new();
    store.add_node(node("X", 0.0, 0.0)).unwrap();
    store.create_checkpoint("c1");
    store.add_node(node("Y", 10.0, 0.0)).unwrap();
    store.add_node(node("Z", 20.0, 0.0)).unwrap();

    store.restore_to_checkpoint("c1").unwrap();

    let graph = store.get_graph();
    assert_eq!(graph.nodes, vec![node("X", 0.0, 0.0)]);
    assert!(graph.edges.is_empty());

    // The undone states are redoable
    store.redo().unwrap();
    assert!(store.get_node("Y").is_some());
}

#[test]
fn test_undo_redo_round_trip() {
    let mut store = GraphStore::new();
    let mutations = 20;

    for i in 0..mutations {
        match i % 4 {
            0 | 1 => store
                .add_node(node(&format!("n{}", i), i as f64, 0.0))
                .unwrap(),
            2 => store
                .add_edge(link(&format!("e{}", i), &format!("n{}", i - 2), &format!("n{}", i - 1)))
                .unwrap(),
            _ => store
                .update_node(
                    &format!("n{}", i - 3),
                    NodeUpdate::position(Position::new(-(i as f64), 5.0)),
                )
                .unwrap(),
        }
    }
    let after = store.get_graph();

    for _ in 0..mutations {
        store.undo().unwrap();
    }
    assert!(store.get_graph().is_empty());
    assert_matches!(store.undo(), Err(StoreError::NothingToUndo));

    for _ in 0..mutations {
        store.redo().unwrap();
    }
    let replayed = store.get_graph();
    assert_eq!(replayed.nodes, after.nodes);
    assert_eq!(replayed.edges, after.edges);
    assert!(replayed.same_entities(&after));
}

#[test]
fn test_cascade_leaves_no_dangling_references() {
    let mut store = create_store(create_threat_model_graph());

    let cascaded = store.delete_node("web").unwrap();
    assert_eq!(cascaded, vec!["call", "req", "write"]);

    for edge in store.edges().values() {
        assert!(!edge.involves("web"));
    }
    assert!(store.validate().is_valid());
    assert!(store.get_connected_edges("browser").is_empty());
}

#[test]
fn test_validator_edge_targets() {
    let validator = Validator::default();
    let graph = Graph::with_entities(
        vec![node("A", 0.0, 0.0), node("B", 1.0, 0.0)],
        vec![],
        vec![],
    );
    let graph_lookup = GraphLookup::new(&graph);
    let lookup: &dyn EntityLookup = &graph_lookup;

    let empty = Edge::new("e1", EdgeType::Https, "A", vec![]);
    let result = validator.validate_edge(&empty, Some(lookup));
    assert!(!result.is_valid());
    assert!(result.has_code(&ValidationCode::EdgeNoTargets));

    let good = link("e2", "A", "B");
    assert!(validator.is_edge_valid(&good, Some(lookup)));
}

#[test]
fn test_validator_negative_boundary_height() {
    let validator = Validator::default();
    let boundary = Boundary::new(
        "b1",
        BoundaryType::TrustBoundary,
        "Zone",
        Position::new(0.0, 0.0),
        Size::new(10.0, -5.0),
    );

    let result = validator.validate_boundary(&boundary, None);
    assert!(!result.is_valid());
    assert!(result.has_code(&ValidationCode::BoundaryInvalidHeight));
}

#[test]
fn test_failing_custom_rule_blocks_mutation() {
    let mut store = GraphStore::new();
    store.validator_mut().add_node_rule(Rule::new("always_fails", |_node: &Node, _ctx| {
        Err(anyhow::anyhow!("lookup service unavailable"))
    }));

    let err = store.add_node(node("a", 0.0, 0.0)).unwrap_err();
    assert_eq!(err.codes(), vec!["VALIDATOR_ERROR"]);
    assert!(store.nodes().is_empty());
}

#[test]
fn test_custom_rule_warning_does_not_block() {
    let mut store = GraphStore::new();
    store.validator_mut().add_node_rule(Rule::new("prefer_owner", |node: &Node, _ctx| {
        Ok(if node.properties.contains_key("owner") {
            vec![]
        } else {
            vec![ValidationIssue::warning(
                ValidationCode::Custom("NODE_MISSING_OWNER".to_string()),
                "Node has no owner",
            )]
        })
    }));

    store.add_node(node("a", 0.0, 0.0)).unwrap();
    let report = store.validation_report();
    assert!(report.is_valid);
    assert!(report.warning_count >= 1);
}

#[test]
fn test_json_round_trip_through_load() {
    let original = create_store(create_threat_model_graph());
    let json = serde_json::to_string_pretty(&original.get_graph()).unwrap();

    let parsed: Graph = serde_json::from_str(&json).unwrap();
    let mut restored = GraphStore::new();
    restored.load_graph(parsed).unwrap();

    let (before, after) = (original.get_graph(), restored.get_graph());
    assert_eq!(after.nodes, before.nodes);
    assert_eq!(after.edges, before.edges);
    assert_eq!(after.boundaries, before.boundaries);
    assert_eq!(after.metadata.name, "Checkout");
}

#[test]
fn test_unknown_type_is_rejected_on_load() {
    let json = r#"{
        "nodes": [
            {"id": "n1", "type": "mainframe", "name": "Legacy", "position": {"x": 0, "y": 0}}
        ]
    }"#;
    let graph: Graph = serde_json::from_str(json).unwrap();
    assert_eq!(graph.nodes[0].node_type, NodeType::Unknown);

    let mut store = GraphStore::new();
    let err = store.load_graph(graph).unwrap_err();
    assert_matches!(&err, StoreError::InvalidGraph { .. });
    assert!(err.codes().contains(&"NODE_INVALID_TYPE"));
}

#[test]
fn test_duplicate_ids_rejected_on_load() {
    let mut graph = create_chain_graph(2);
    graph.edges.push(link("n0", "n0", "n1"));

    let mut store = GraphStore::new();
    let err = store.load_graph(graph).unwrap_err();
    assert_eq!(err.codes(), vec!["DUPLICATE_ID"]);
    assert!(store.nodes().is_empty());
}

#[test]
fn test_batch_is_one_notification_and_one_undo() {
    let mut store = create_store(create_chain_graph(3));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    store.add_change_listener(move |event| {
        sink.lock().unwrap().push((event.kind, event.operation))
    });

    let report = store.apply_batch(GraphBatch {
        add_nodes: vec![node("n3", 150.0, 0.0)],
        add_edges: vec![link("e3", "n2", "n3")],
        delete_edges: vec!["e1".to_string()],
        delete_nodes: vec!["n0".to_string()],
        ..Default::default()
    });
    assert!(report.is_clean());
    assert_eq!(report.applied, 4);
    assert_eq!(
        *events.lock().unwrap(),
        vec![(EntityKind::Graph, ChangeOperation::Batch)]
    );

    store.undo().unwrap();
    assert!(store.get_graph().same_entities(&create_chain_graph(3)));
}

#[test]
fn test_region_and_nearest_queries() {
    let store = create_store(create_threat_model_graph());

    let in_zone: Vec<&str> = store
        .get_nodes_in_region(&Rect::new(0.0, 0.0, 200.0, 100.0))
        .into_iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(in_zone, vec!["api", "web"]);

    assert!(store.get_nodes_in_region(&Rect::new(0.0, 0.0, -1.0, 10.0)).is_empty());

    let nearest = store.find_nearest_node(Position::new(140.0, 45.0), 50.0).unwrap();
    assert_eq!(nearest.id, "api");
    assert!(store.find_nearest_node(Position::new(140.0, 45.0), -1.0).is_none());
}

#[test]
fn test_boundary_queries_match_clustering() {
    let store = create_store(create_threat_model_graph());

    let in_dc: Vec<&str> = store
        .nodes_in_boundary("dc")
        .unwrap()
        .into_iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(in_dc, vec!["api", "db", "web"]);

    let around_db: Vec<&str> = store
        .boundaries_containing("db")
        .into_iter()
        .map(|b| b.id.as_str())
        .collect();
    assert_eq!(around_db, vec!["db-zone", "dc"]);

    // Clustering picks the tighter zone
    let clusters = algorithms::cluster_by_boundaries(&store.get_graph());
    assert_eq!(clusters.by_boundary["db-zone"], vec!["db"]);
    assert_eq!(clusters.by_boundary["dc"], vec!["api", "web"]);
    assert_eq!(clusters.unbounded, vec!["browser"]);
}

#[test]
fn test_algorithm_scenarios() {
    let cycles = algorithms::detect_cycles(&create_triangle_graph());
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes.len(), 3);
    assert_eq!(cycles[0].edges.len(), 3);

    let components = algorithms::find_connected_components(&create_two_triangles_graph());
    assert_eq!(components.len(), 2);
    assert!(components.iter().all(|c| c.len() == 3));
}

#[test]
fn test_cycle_detection_on_long_chain_and_ring() {
    let chain = create_chain_graph(50_000);
    assert!(algorithms::detect_cycles(&chain).is_empty());

    let mut ring = chain;
    ring.edges.push(link("e0", "n49999", "n0"));
    let cycles = algorithms::detect_cycles(&ring);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes.len(), 50_000);
    assert_eq!(cycles[0].edges.len(), 50_000);
    assert_eq!(cycles[0].nodes[0], "n0");
    assert_eq!(cycles[0].edges.last().map(String::as_str), Some("e0"));
}

#[test]
fn test_nearest_with_unbounded_radius() {
    let mut store = GraphStore::new();
    store.add_node(node("origin", 0.0, 0.0)).unwrap();
    store.add_node(node("far", 90_000.0, -90_000.0)).unwrap();

    let hit = store.find_nearest_node(Position::new(0.0, 0.0), f64::MAX).unwrap();
    assert_eq!(hit.id, "origin");

    let hit = store.find_nearest_node(Position::new(80_000.0, -80_000.0), f64::MAX).unwrap();
    assert_eq!(hit.id, "far");
}

#[test]
fn test_long_chain_path_limits() {
    let graph = create_chain_graph(30);

    let paths = algorithms::find_data_flow_paths(&graph, "n0", "n29", PathConfig::default());
    assert!(paths.is_empty(), "29 hops exceeds the default depth cap");

    let path = algorithms::shortest_path(&graph, "n0", "n29").unwrap();
    assert_eq!(path.len(), 29);
}

#[test]
fn test_search_through_store() {
    let store = create_store(create_threat_model_graph());

    let by_property: Vec<&str> = store
        .search_nodes(&SearchOptions::new("POSTGRES"))
        .into_iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(by_property, vec!["db"]);

    let fuzzy = store.search_nodes(&SearchOptions::new("ordapi").fuzzy());
    assert_eq!(fuzzy.len(), 1);
    assert_eq!(fuzzy[0].id, "api");

    assert!(store.search_nodes(&SearchOptions::new("")).is_empty());
}
