// Helper functions to generate test graphs with various configurations

use diagram_graph_core::{
    Boundary, BoundaryType, Edge, EdgeType, Graph, GraphStore, Node, NodeType, Position, Size,
};

pub fn node(id: &str, x: f64, y: f64) -> Node {
    Node::new(id, NodeType::Process, format!("Node {}", id), Position::new(x, y))
}

pub fn link(id: &str, from: &str, to: &str) -> Edge {
    Edge::link(id, EdgeType::Https, from, to)
}

/// Create a graph of `count` nodes n0 -> n1 -> ... laid out on a line
pub fn create_chain_graph(count: usize) -> Graph {
    let nodes = (0..count)
        .map(|i| node(&format!("n{}", i), i as f64 * 50.0, 0.0))
        .collect();
    let edges = (1..count)
        .map(|i| link(&format!("e{}", i), &format!("n{}", i - 1), &format!("n{}", i)))
        .collect();
    Graph::with_entities(nodes, edges, vec![])
}

/// Create a graph with a single directed cycle: A → B → C → A
pub fn create_triangle_graph() -> Graph {
    Graph::with_entities(
        vec![node("A", 0.0, 0.0), node("B", 100.0, 0.0), node("C", 50.0, 80.0)],
        vec![link("ab", "A", "B"), link("bc", "B", "C"), link("ca", "C", "A")],
        vec![],
    )
}

/// Create two disjoint triangles with no edges between them
pub fn create_two_triangles_graph() -> Graph {
    Graph::with_entities(
        vec![
            node("a1", 0.0, 0.0),
            node("a2", 10.0, 0.0),
            node("a3", 5.0, 10.0),
            node("b1", 500.0, 0.0),
            node("b2", 510.0, 0.0),
            node("b3", 505.0, 10.0),
        ],
        vec![
            link("ea1", "a1", "a2"),
            link("ea2", "a2", "a3"),
            link("ea3", "a3", "a1"),
            link("eb1", "b1", "b2"),
            link("eb2", "b2", "b3"),
            link("eb3", "b3", "b1"),
        ],
        vec![],
    )
}

/// Create a small threat model: a browser outside a trust boundary talking to
/// services inside it, with a nested network zone around the datastore
pub fn create_threat_model_graph() -> Graph {
    let mut graph = Graph::with_entities(
        vec![
            Node::new("browser", NodeType::ExternalEntity, "Browser", Position::new(-200.0, 0.0)),
            Node::new("web", NodeType::Process, "Web Frontend", Position::new(50.0, 50.0))
                .with_property("language", "rust"),
            Node::new("api", NodeType::Service, "Order API", Position::new(150.0, 50.0))
                .with_property("owner", "checkout"),
            Node::new("db", NodeType::Datastore, "Orders DB", Position::new(250.0, 150.0))
                .with_property("engine", "postgres"),
        ],
        vec![
            Edge::link("req", EdgeType::Https, "browser", "web"),
            Edge::link("call", EdgeType::Grpc, "web", "api"),
            Edge::new(
                "write",
                EdgeType::Grpc,
                "api",
                vec!["db".to_string(), "web".to_string()],
            ),
        ],
        vec![
            Boundary::new(
                "dc",
                BoundaryType::TrustBoundary,
                "Data Center",
                Position::new(0.0, 0.0),
                Size::new(400.0, 300.0),
            ),
            Boundary::new(
                "db-zone",
                BoundaryType::NetworkZone,
                "Database Zone",
                Position::new(200.0, 100.0),
                Size::new(100.0, 100.0),
            ),
        ],
    );
    graph.metadata.name = "Checkout".to_string();
    graph
}

/// Create a store already loaded with `graph`
pub fn create_store(graph: Graph) -> GraphStore {
    let mut store = GraphStore::new();
    store
        .load_graph(graph)
        .expect("fixture graph should be valid");
    store
}
