use anyhow::Result;
use diagram_graph_core::{
    algorithms, Boundary, BoundaryType, Edge, EdgeType, GraphStore, Node, NodeType, Position,
    SearchOptions, Size, StoreConfig,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Optional JSON config as the first argument
    let config = match env::args().nth(1) {
        Some(path) => StoreConfig::load(Path::new(&path))?,
        None => StoreConfig::default(),
    };

    println!("Diagram Graph Core - Store Demo");
    println!("===============================\n");

    let mut store = GraphStore::with_config(config);

    store.add_node(Node::new(
        "browser",
        NodeType::ExternalEntity,
        "Browser",
        Position::new(0.0, 0.0),
    ))?;
    store.add_node(Node::new(
        "web",
        NodeType::Process,
        "Web Frontend",
        Position::new(200.0, 0.0),
    ))?;
    store.add_node(
        Node::new("orders", NodeType::Service, "Order Service", Position::new(400.0, 0.0))
            .with_property("owner", "checkout"),
    )?;
    store.add_node(Node::new(
        "db",
        NodeType::Datastore,
        "Orders DB",
        Position::new(400.0, 200.0),
    ))?;

    store.add_edge(Edge::link("e1", EdgeType::Https, "browser", "web"))?;
    store.add_edge(Edge::link("e2", EdgeType::Grpc, "web", "orders"))?;
    store.add_edge(Edge::link("e3", EdgeType::Grpc, "orders", "db"))?;

    store.add_boundary(Boundary::new(
        "backend",
        BoundaryType::TrustBoundary,
        "Backend",
        Position::new(150.0, -50.0),
        Size::new(300.0, 300.0),
    ))?;

    println!("✓ Built sample diagram");
    println!("  Nodes: {}", store.nodes().len());
    println!("  Edges: {}", store.edges().len());
    println!("  Boundaries: {}", store.boundaries().len());

    // A rejected mutation leaves the store untouched
    if let Err(e) = store.add_edge(Edge::new("bad", EdgeType::Https, "web", vec![])) {
        println!("\n✗ Rejected: {}", e);
    }

    let inside: Vec<&str> = store
        .nodes_in_boundary("backend")?
        .into_iter()
        .map(|n| n.name.as_str())
        .collect();
    println!("\n🔒 Inside 'Backend': {}", inside.join(", "));

    for path in store.find_data_flow_paths("browser", "db") {
        println!("\n➡  Data flow: {}", path.nodes.join(" -> "));
    }

    let hits = store.search_nodes(&SearchOptions::new("order"));
    println!("\n🔍 Search 'order': {} match(es)", hits.len());

    store.create_checkpoint("baseline");
    store.delete_node("orders")?;
    println!("\n✓ Deleted 'orders' (edges left: {})", store.edges().len());
    store.restore_to_checkpoint("baseline")?;
    println!("✓ Restored checkpoint (edges: {})", store.edges().len());

    let stats = algorithms::graph_statistics(&store.get_graph());
    println!("\n📊 Statistics:");
    println!("  └─ Components: {}", stats.component_count);
    println!("  └─ Average degree: {:.2}", stats.average_degree);
    println!("  └─ Density: {:.3}", stats.density);

    let report = store.validation_report();
    println!(
        "\n✅ Validation: {} error(s), {} warning(s)\n",
        report.error_count, report.warning_count
    );

    Ok(())
}
