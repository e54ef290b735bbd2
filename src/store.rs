use crate::algorithms::{self, DataFlowPath};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::event::{ChangeEvent, ChangeListener, ChangeOperation, EntityKind, ListenerId};
use crate::graph::{EntityLookup, Graph, GraphBatch, GraphMetadata};
use crate::history::{History, Snapshot};
use crate::id_generator::IdGenerator;
use crate::search::{self, SearchOptions};
use crate::spatial::QuadTree;
use crate::validation::{ValidationIssue, ValidationReport, ValidationResult, Validator};
use crate::{
    Boundary, BoundaryUpdate, Edge, EdgeUpdate, Node, NodeType, NodeUpdate, Position, Rect,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Outcome of `GraphStore::apply_batch`
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Synthetic id carried by the batch notification
    pub id: String,
    pub applied: usize,
    /// Items that failed and were skipped, in application order
    pub skipped: Vec<SkippedItem>,
}

impl BatchReport {
    /// Whether every item was applied
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SkippedItem {
    pub kind: EntityKind,
    pub id: String,
    pub error: StoreError,
}

/// The single source of truth for a diagram.
///
/// Every mutation is validated first and either commits completely or returns
/// an error and leaves the store untouched. A committed mutation updates the
/// primary map, then the type and adjacency indices, then the spatial index,
/// then records history, then notifies listeners. Owned by one writer at a
/// time; concurrent readers should work on `get_graph()` instead.
pub struct GraphStore {
    /// Primary collections indexed by id
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Edge>,
    boundaries: HashMap<String, Boundary>,

    /// Secondary indices mirroring the primary collections
    nodes_by_type: HashMap<NodeType, HashSet<String>>,
    edges_by_source: HashMap<String, HashSet<String>>,
    edges_by_target: HashMap<String, HashSet<String>>,

    spatial: QuadTree,
    history: History,
    validator: Validator,
    metadata: GraphMetadata,

    listeners: Vec<(ListenerId, ChangeListener)>,
    next_listener: u64,

    ids: IdGenerator,
    config: StoreConfig,
}

impl GraphStore {
    /// Create an empty store with default settings
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let mut store = Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            boundaries: HashMap::new(),
            nodes_by_type: HashMap::new(),
            edges_by_source: HashMap::new(),
            edges_by_target: HashMap::new(),
            spatial: QuadTree::new(config.spatial.world),
            history: History::new(config.history.clone()),
            validator: Validator::new(config.limits.clone()),
            metadata: GraphMetadata::default(),
            listeners: Vec::new(),
            next_listener: 0,
            ids: IdGenerator::new(),
            config,
        };
        let baseline = store.get_graph();
        store.history.reset(&baseline);
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    /// Access the validator, e.g. to register extra rules
    pub fn validator_mut(&mut self) -> &mut Validator {
        &mut self.validator
    }

    // ========== Node Operations ==========

    /// Add a node. Fails if validation reports an error or the id is in use.
    pub fn add_node(&mut self, node: Node) -> Result<(), StoreError> {
        let id = node.id.clone();
        self.add_node_unrecorded(node)?;
        self.commit(EntityKind::Node, &id, ChangeOperation::Add);
        Ok(())
    }

    /// Apply a partial update to a node
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Result<(), StoreError> {
        if self.update_node_unrecorded(id, &update)? {
            self.commit(EntityKind::Node, id, ChangeOperation::Update);
        }
        Ok(())
    }

    /// Delete a node and every edge that references it.
    /// Returns the ids of the cascaded edges.
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<String>, StoreError> {
        let cascaded = self.delete_node_unrecorded(id)?;
        debug!(id, cascaded = cascaded.len(), "cascaded edge deletes");
        self.commit(EntityKind::Node, id, ChangeOperation::Delete);
        Ok(cascaded)
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &HashMap<String, Node> {
        &self.nodes
    }

    /// Nodes of one type, sorted by id
    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<&Node> {
        let Some(ids) = self.nodes_by_type.get(&node_type) else {
            return Vec::new();
        };
        self.sorted_nodes(ids.iter().map(String::as_str))
    }

    fn add_node_unrecorded(&mut self, node: Node) -> Result<(), StoreError> {
        let result = self.validator.validate_node(&node, self.lookup());
        Self::gate(EntityKind::Node, &node.id, result)?;
        if self.has_id(&node.id) {
            return Err(StoreError::DuplicateId { id: node.id });
        }

        self.index_node(node);
        Ok(())
    }

    fn update_node_unrecorded(
        &mut self,
        id: &str,
        update: &NodeUpdate,
    ) -> Result<bool, StoreError> {
        let current = self.nodes.get(id).ok_or_else(|| not_found(EntityKind::Node, id))?;
        let updated = current.merged(update);
        if &updated == current {
            return Ok(false);
        }

        let result = self.validator.validate_node(&updated, self.lookup());
        Self::gate(EntityKind::Node, id, result)?;

        if let Some(previous) = self.nodes.remove(id) {
            self.unindex_node(&previous);
        }
        self.index_node(updated);
        Ok(true)
    }

    fn delete_node_unrecorded(&mut self, id: &str) -> Result<Vec<String>, StoreError> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| not_found(EntityKind::Node, id))?;

        let mut incident: Vec<String> = self
            .edges_by_source
            .get(id)
            .into_iter()
            .chain(self.edges_by_target.get(id))
            .flatten()
            .cloned()
            .collect();
        incident.sort();
        incident.dedup();

        for edge_id in &incident {
            self.unindex_edge(edge_id);
        }
        self.unindex_node(&node);
        Ok(incident)
    }

    fn index_node(&mut self, node: Node) {
        let id = node.id.clone();
        let (node_type, position) = (node.node_type, node.position);

        self.nodes.insert(id.clone(), node);
        self.nodes_by_type
            .entry(node_type)
            .or_default()
            .insert(id.clone());
        self.spatial.insert(id, position);
    }

    /// Drop a node from the secondary and spatial indices
    fn unindex_node(&mut self, node: &Node) {
        if let Some(ids) = self.nodes_by_type.get_mut(&node.node_type) {
            ids.remove(&node.id);
            if ids.is_empty() {
                self.nodes_by_type.remove(&node.node_type);
            }
        }
        self.spatial.remove(&node.id);
    }

    // ========== Edge Operations ==========

    /// Add an edge. Its source and targets must name existing nodes.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), StoreError> {
        let id = edge.id.clone();
        self.add_edge_unrecorded(edge)?;
        self.commit(EntityKind::Edge, &id, ChangeOperation::Add);
        Ok(())
    }

    pub fn update_edge(&mut self, id: &str, update: EdgeUpdate) -> Result<(), StoreError> {
        if self.update_edge_unrecorded(id, &update)? {
            self.commit(EntityKind::Edge, id, ChangeOperation::Update);
        }
        Ok(())
    }

    pub fn delete_edge(&mut self, id: &str) -> Result<(), StoreError> {
        self.unindex_edge(id)
            .ok_or_else(|| not_found(EntityKind::Edge, id))?;
        self.commit(EntityKind::Edge, id, ChangeOperation::Delete);
        Ok(())
    }

    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edges(&self) -> &HashMap<String, Edge> {
        &self.edges
    }

    /// Edges whose source is `node_id`, sorted by id
    pub fn get_outgoing_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.sorted_edges(self.edges_by_source.get(node_id).into_iter().flatten())
    }

    /// Edges listing `node_id` among their targets, sorted by id
    pub fn get_incoming_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.sorted_edges(self.edges_by_target.get(node_id).into_iter().flatten())
    }

    /// Edges touching `node_id` in either direction, sorted by id
    pub fn get_connected_edges(&self, node_id: &str) -> Vec<&Edge> {
        let outgoing = self.edges_by_source.get(node_id).into_iter().flatten();
        let incoming = self.edges_by_target.get(node_id).into_iter().flatten();
        let ids: HashSet<&String> = outgoing.chain(incoming).collect();
        self.sorted_edges(ids)
    }

    /// Nodes sharing an edge with `node_id`, excluding itself, sorted by id
    pub fn get_connected_nodes(&self, node_id: &str) -> Vec<&Node> {
        let neighbors: HashSet<&str> = self
            .get_connected_edges(node_id)
            .into_iter()
            .flat_map(Edge::endpoints)
            .filter(|id| *id != node_id)
            .collect();
        self.sorted_nodes(neighbors)
    }

    fn add_edge_unrecorded(&mut self, edge: Edge) -> Result<(), StoreError> {
        let result = self.validator.validate_edge(&edge, self.lookup());
        Self::gate(EntityKind::Edge, &edge.id, result)?;
        if self.has_id(&edge.id) {
            return Err(StoreError::DuplicateId { id: edge.id });
        }

        self.index_edge(edge);
        Ok(())
    }

    fn update_edge_unrecorded(
        &mut self,
        id: &str,
        update: &EdgeUpdate,
    ) -> Result<bool, StoreError> {
        let current = self.edges.get(id).ok_or_else(|| not_found(EntityKind::Edge, id))?;
        let updated = current.merged(update);
        if &updated == current {
            return Ok(false);
        }

        let result = self.validator.validate_edge(&updated, self.lookup());
        Self::gate(EntityKind::Edge, id, result)?;

        self.unindex_edge(id);
        self.index_edge(updated);
        Ok(true)
    }

    fn index_edge(&mut self, edge: Edge) {
        self.edges_by_source
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.id.clone());
        for target in &edge.targets {
            self.edges_by_target
                .entry(target.clone())
                .or_default()
                .insert(edge.id.clone());
        }
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Remove an edge from the primary map and both adjacency indices
    fn unindex_edge(&mut self, id: &str) -> Option<Edge> {
        let edge = self.edges.remove(id)?;

        if let Some(ids) = self.edges_by_source.get_mut(&edge.source) {
            ids.remove(id);
            if ids.is_empty() {
                self.edges_by_source.remove(&edge.source);
            }
        }
        for target in &edge.targets {
            if let Some(ids) = self.edges_by_target.get_mut(target) {
                ids.remove(id);
                if ids.is_empty() {
                    self.edges_by_target.remove(target);
                }
            }
        }

        Some(edge)
    }

    // ========== Boundary Operations ==========

    pub fn add_boundary(&mut self, boundary: Boundary) -> Result<(), StoreError> {
        let id = boundary.id.clone();
        self.add_boundary_unrecorded(boundary)?;
        self.commit(EntityKind::Boundary, &id, ChangeOperation::Add);
        Ok(())
    }

    pub fn update_boundary(&mut self, id: &str, update: BoundaryUpdate) -> Result<(), StoreError> {
        if self.update_boundary_unrecorded(id, &update)? {
            self.commit(EntityKind::Boundary, id, ChangeOperation::Update);
        }
        Ok(())
    }

    pub fn delete_boundary(&mut self, id: &str) -> Result<(), StoreError> {
        self.boundaries
            .remove(id)
            .ok_or_else(|| not_found(EntityKind::Boundary, id))?;
        self.commit(EntityKind::Boundary, id, ChangeOperation::Delete);
        Ok(())
    }

    pub fn get_boundary(&self, id: &str) -> Option<&Boundary> {
        self.boundaries.get(id)
    }

    pub fn boundaries(&self) -> &HashMap<String, Boundary> {
        &self.boundaries
    }

    /// Nodes whose position lies inside the boundary's rectangle, sorted by id
    pub fn nodes_in_boundary(&self, boundary_id: &str) -> Result<Vec<&Node>, StoreError> {
        let boundary = self
            .boundaries
            .get(boundary_id)
            .ok_or_else(|| not_found(EntityKind::Boundary, boundary_id))?;
        Ok(self.get_nodes_in_region(&boundary.rect()))
    }

    /// Boundaries containing the node's position, sorted by id.
    /// Empty for an unknown node.
    pub fn boundaries_containing(&self, node_id: &str) -> Vec<&Boundary> {
        let Some(node) = self.nodes.get(node_id) else {
            return Vec::new();
        };
        let mut containing: Vec<&Boundary> = self
            .boundaries
            .values()
            .filter(|b| b.contains(&node.position))
            .collect();
        containing.sort_by(|a, b| a.id.cmp(&b.id));
        containing
    }

    fn add_boundary_unrecorded(&mut self, boundary: Boundary) -> Result<(), StoreError> {
        let result = self
            .validator
            .validate_boundary(&boundary, self.lookup());
        Self::gate(EntityKind::Boundary, &boundary.id, result)?;
        if self.has_id(&boundary.id) {
            return Err(StoreError::DuplicateId { id: boundary.id });
        }

        self.boundaries.insert(boundary.id.clone(), boundary);
        Ok(())
    }

    fn update_boundary_unrecorded(
        &mut self,
        id: &str,
        update: &BoundaryUpdate,
    ) -> Result<bool, StoreError> {
        let current = self
            .boundaries
            .get(id)
            .ok_or_else(|| not_found(EntityKind::Boundary, id))?;
        let updated = current.merged(update);
        if &updated == current {
            return Ok(false);
        }

        let result = self
            .validator
            .validate_boundary(&updated, self.lookup());
        Self::gate(EntityKind::Boundary, id, result)?;

        self.boundaries.insert(id.to_string(), updated);
        Ok(true)
    }

    // ========== Spatial Queries ==========

    /// Nodes inside `region` (edges inclusive), sorted by id.
    /// A degenerate region matches nothing.
    pub fn get_nodes_in_region(&self, region: &Rect) -> Vec<&Node> {
        let hits = self.spatial.query(region);
        self.sorted_nodes(hits.into_iter().map(|(id, _)| id))
    }

    /// Closest node within `max_distance`, ties broken by id
    pub fn find_nearest_node(&self, point: Position, max_distance: f64) -> Option<&Node> {
        self.spatial
            .nearest(point, max_distance)
            .into_iter()
            .find_map(|(id, _)| self.nodes.get(id))
    }

    // ========== Batch Operations ==========

    /// Apply grouped changes as one logical operation: one history entry and one
    /// notification. Items that fail are skipped and reported; the rest apply.
    pub fn apply_batch(&mut self, batch: GraphBatch) -> BatchReport {
        let mut report = BatchReport {
            id: format!("batch-{}", Ulid::new()),
            applied: 0,
            skipped: Vec::new(),
        };

        let mut outcome = |kind: EntityKind, id: &str, result: Result<(), StoreError>| {
            match result {
                Ok(()) => report.applied += 1,
                Err(error) => report.skipped.push(SkippedItem {
                    kind,
                    id: id.to_string(),
                    error,
                }),
            }
        };

        for node in batch.add_nodes {
            let id = node.id.clone();
            outcome(EntityKind::Node, &id, self.add_node_unrecorded(node));
        }
        for edge in batch.add_edges {
            let id = edge.id.clone();
            outcome(EntityKind::Edge, &id, self.add_edge_unrecorded(edge));
        }
        for boundary in batch.add_boundaries {
            let id = boundary.id.clone();
            outcome(EntityKind::Boundary, &id, self.add_boundary_unrecorded(boundary));
        }

        for (id, update) in &batch.update_nodes {
            let result = self.update_node_unrecorded(id, update).map(|_| ());
            outcome(EntityKind::Node, id, result);
        }
        for (id, update) in &batch.update_edges {
            let result = self.update_edge_unrecorded(id, update).map(|_| ());
            outcome(EntityKind::Edge, id, result);
        }
        for (id, update) in &batch.update_boundaries {
            let result = self.update_boundary_unrecorded(id, update).map(|_| ());
            outcome(EntityKind::Boundary, id, result);
        }

        for id in &batch.delete_edges {
            let result = self
                .unindex_edge(id)
                .map(|_| ())
                .ok_or_else(|| not_found(EntityKind::Edge, id));
            outcome(EntityKind::Edge, id, result);
        }
        for id in &batch.delete_nodes {
            let result = self.delete_node_unrecorded(id).map(|_| ());
            outcome(EntityKind::Node, id, result);
        }
        for id in &batch.delete_boundaries {
            let result = self
                .boundaries
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| not_found(EntityKind::Boundary, id));
            outcome(EntityKind::Boundary, id, result);
        }

        if !report.skipped.is_empty() {
            warn!(
                batch = %report.id,
                skipped = report.skipped.len(),
                "batch items skipped"
            );
        }
        if report.applied > 0 {
            self.commit(EntityKind::Graph, &report.id, ChangeOperation::Batch);
        }
        report
    }

    // ========== History ==========

    /// Restore the previous committed state
    pub fn undo(&mut self) -> Result<(), StoreError> {
        let snapshot = self.history.undo().cloned().ok_or(StoreError::NothingToUndo)?;
        self.restore(&snapshot, ChangeOperation::Undo);
        Ok(())
    }

    /// Re-apply the most recently undone state
    pub fn redo(&mut self) -> Result<(), StoreError> {
        let snapshot = self.history.redo().cloned().ok_or(StoreError::NothingToRedo)?;
        self.restore(&snapshot, ChangeOperation::Redo);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of retained undo states, including the current one
    pub fn history_len(&self) -> usize {
        self.history.undo_len()
    }

    /// Name the current state. Discards anything that could be redone.
    pub fn create_checkpoint(&mut self, name: &str) {
        let graph = self.get_graph();
        self.history.create_checkpoint(name, &graph);
        info!(name, "checkpoint created");
    }

    /// Return to the most recent checkpoint called `name`
    pub fn restore_to_checkpoint(&mut self, name: &str) -> Result<(), StoreError> {
        let snapshot = self
            .history
            .restore_to_checkpoint(name)
            .cloned()
            .ok_or_else(|| StoreError::CheckpointNotFound {
                name: name.to_string(),
            })?;
        self.restore(&snapshot, ChangeOperation::Restore);
        info!(name, "checkpoint restored");
        Ok(())
    }

    /// Checkpoint names, oldest first
    pub fn checkpoints(&self) -> Vec<&str> {
        self.history.checkpoints()
    }

    fn restore(&mut self, snapshot: &Snapshot, operation: ChangeOperation) {
        self.rebuild(
            snapshot.nodes.clone(),
            snapshot.edges.clone(),
            snapshot.boundaries.clone(),
        );
        self.metadata.touch();
        debug!(snapshot = %snapshot.id, ?operation, "state restored");
        self.notify(ChangeEvent::new(
            EntityKind::Graph,
            snapshot.id.to_string(),
            operation,
        ));
    }

    // ========== Whole-graph Operations ==========

    /// Export the current state, each collection sorted by id
    pub fn get_graph(&self) -> Graph {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        let mut boundaries: Vec<Boundary> = self.boundaries.values().cloned().collect();
        boundaries.sort_by(|a, b| a.id.cmp(&b.id));

        Graph {
            nodes,
            edges,
            boundaries,
            metadata: self.metadata.clone(),
        }
    }

    /// Replace all state with `graph`.
    ///
    /// The whole graph is validated first; on any error nothing changes and
    /// `InvalidGraph` carries the full result. On success history restarts
    /// from the loaded state and the warnings are returned.
    pub fn load_graph(&mut self, graph: Graph) -> Result<Vec<ValidationIssue>, StoreError> {
        let result = self.validator.validate_graph(&graph);
        if result.has_errors() {
            warn!(
                name = %graph.metadata.name,
                errors = result.errors().len(),
                "graph load rejected"
            );
            return Err(StoreError::InvalidGraph { result });
        }

        let Graph {
            nodes,
            edges,
            boundaries,
            metadata,
        } = graph;
        self.rebuild(nodes, edges, boundaries);
        self.metadata = metadata;
        self.ids = IdGenerator::from_existing_ids(self.all_ids());

        let baseline = self.get_graph();
        self.history.reset(&baseline);

        let (_, warnings) = result.into_parts();
        info!(
            name = %self.metadata.name,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            boundaries = self.boundaries.len(),
            warnings = warnings.len(),
            "graph loaded"
        );
        self.notify(ChangeEvent::new(
            EntityKind::Graph,
            self.metadata.name.clone(),
            ChangeOperation::Load,
        ));
        Ok(warnings)
    }

    /// Remove every entity as one undoable change
    pub fn clear(&mut self) {
        if self.nodes.is_empty() && self.edges.is_empty() && self.boundaries.is_empty() {
            return;
        }
        self.rebuild(Vec::new(), Vec::new(), Vec::new());
        let name = self.metadata.name.clone();
        self.commit(EntityKind::Graph, &name, ChangeOperation::Clear);
    }

    /// Validate the current state as a whole graph
    pub fn validate(&self) -> ValidationResult {
        self.validator.validate_graph(&self.get_graph())
    }

    pub fn validation_report(&self) -> ValidationReport {
        self.validator.validation_report(&self.get_graph())
    }

    /// Generate an id not used by any node, edge or boundary
    pub fn generate_id(&mut self) -> String {
        let (nodes, edges, boundaries) = (&self.nodes, &self.edges, &self.boundaries);
        self.ids.next_unused(|id| {
            nodes.contains_key(id) || edges.contains_key(id) || boundaries.contains_key(id)
        })
    }

    /// Node search over names and property values
    pub fn search_nodes(&self, options: &SearchOptions) -> Vec<&Node> {
        search::search_nodes(
            self.nodes.values(),
            options,
            self.config.search.default_limit,
        )
    }

    /// Directed paths between two nodes, bounded by the configured path limits
    pub fn find_data_flow_paths(&self, from: &str, to: &str) -> Vec<DataFlowPath> {
        algorithms::find_data_flow_paths(&self.get_graph(), from, to, self.config.paths)
    }

    // ========== Change Notification ==========

    /// Register a listener called once per committed mutation or batch
    pub fn add_change_listener(
        &mut self,
        listener: impl FnMut(&ChangeEvent) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    // ========== Internals ==========

    /// Record the committed state and tell listeners about it
    fn commit(&mut self, kind: EntityKind, id: &str, operation: ChangeOperation) {
        self.metadata.touch();
        let graph = self.get_graph();
        self.history.record(&graph);
        debug!(%kind, id, ?operation, "mutation committed");
        self.notify(ChangeEvent::new(kind, id, operation));
    }

    fn notify(&mut self, event: ChangeEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Turn a validation result into a rejection if it carries errors
    fn gate(kind: EntityKind, id: &str, result: ValidationResult) -> Result<(), StoreError> {
        if !result.has_errors() {
            return Ok(());
        }
        let (errors, _) = result.into_parts();
        let codes: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
        warn!(%kind, id, ?codes, "mutation rejected");
        Err(StoreError::Rejected {
            kind,
            id: id.to_string(),
            issues: errors,
        })
    }

    /// Replace every collection and index without validation
    fn rebuild(&mut self, nodes: Vec<Node>, edges: Vec<Edge>, boundaries: Vec<Boundary>) {
        self.nodes.clear();
        self.edges.clear();
        self.boundaries.clear();
        self.nodes_by_type.clear();
        self.edges_by_source.clear();
        self.edges_by_target.clear();
        self.spatial.clear();

        for node in nodes {
            self.index_node(node);
        }
        for edge in edges {
            self.index_edge(edge);
        }
        for boundary in boundaries {
            self.boundaries.insert(boundary.id.clone(), boundary);
        }
    }

    fn lookup(&self) -> Option<&dyn EntityLookup> {
        Some(self)
    }

    fn all_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .keys()
            .chain(self.edges.keys())
            .chain(self.boundaries.keys())
            .map(String::as_str)
    }

    fn sorted_nodes<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = ids.into_iter().filter_map(|id| self.nodes.get(id)).collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    fn sorted_edges<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = ids.into_iter().filter_map(|id| self.edges.get(id)).collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityLookup for GraphStore {
    fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn has_id(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
            || self.edges.contains_key(id)
            || self.boundaries.contains_key(id)
    }
}

fn not_found(kind: EntityKind, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationCode;
    use crate::{BoundaryType, EdgeType, Size};
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex};

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node::new(id, NodeType::Process, format!("Node {}", id), Position::new(x, y))
    }

    fn link(id: &str, from: &str, to: &str) -> Edge {
        Edge::link(id, EdgeType::Https, from, to)
    }

    fn store_with_chain() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node(node("a", 0.0, 0.0)).unwrap();
        store.add_node(node("b", 10.0, 0.0)).unwrap();
        store.add_node(node("c", 20.0, 0.0)).unwrap();
        store.add_edge(link("ab", "a", "b")).unwrap();
        store.add_edge(link("bc", "b", "c")).unwrap();
        store
    }

    fn recorded_events(store: &mut GraphStore) -> Arc<Mutex<Vec<ChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.add_change_listener(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_connected_nodes_and_edges() {
        let mut store = GraphStore::new();
        store.add_node(node("A", 0.0, 0.0)).unwrap();
        store.add_node(node("B", 10.0, 0.0)).unwrap();
        store.add_edge(link("e1", "A", "B")).unwrap();

        let connected: Vec<&str> = store
            .get_connected_nodes("A")
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(connected, vec!["B"]);
        assert_eq!(store.get_connected_edges("A").len(), 1);
        assert_eq!(store.get_outgoing_edges("A").len(), 1);
        assert!(store.get_incoming_edges("A").is_empty());
    }

    #[test]
    fn test_rejection_leaves_store_unchanged() {
        let mut store = GraphStore::new();
        let mut bad = node("n1", 0.0, 0.0);
        bad.name = String::new();

        let err = store.add_node(bad).unwrap_err();
        assert_matches!(err, StoreError::Rejected { kind: EntityKind::Node, .. });
        assert_eq!(err.codes(), vec!["NODE_MISSING_NAME"]);
        assert!(store.nodes().is_empty());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut store = GraphStore::new();
        store.add_node(node("a", 0.0, 0.0)).unwrap();

        let err = store.add_edge(link("e1", "a", "ghost")).unwrap_err();
        assert_eq!(err.codes(), vec!["EDGE_TARGET_NOT_FOUND"]);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_ids_shared_across_kinds() {
        let mut store = GraphStore::new();
        store.add_node(node("x", 0.0, 0.0)).unwrap();

        let boundary = Boundary::new(
            "x",
            BoundaryType::TrustBoundary,
            "Zone",
            Position::new(0.0, 0.0),
            Size::new(10.0, 10.0),
        );
        assert_matches!(
            store.add_boundary(boundary),
            Err(StoreError::DuplicateId { id }) if id == "x"
        );
    }

    #[test]
    fn test_delete_node_cascades() {
        let mut store = store_with_chain();
        store
            .add_edge(Edge::new(
                "fan",
                EdgeType::Grpc,
                "a",
                vec!["b".to_string(), "c".to_string()],
            ))
            .unwrap();

        let cascaded = store.delete_node("b").unwrap();
        assert_eq!(cascaded, vec!["ab", "bc", "fan"]);
        assert!(store.edges().is_empty());
        assert!(store.get_connected_edges("a").is_empty());
        assert!(store.get_connected_edges("c").is_empty());
        assert!(store.get_nodes_in_region(&Rect::new(5.0, -1.0, 10.0, 2.0)).is_empty());
        assert!(store.validate().is_valid());
    }

    #[test]
    fn test_update_node_moves_indices() {
        let mut store = store_with_chain();

        store
            .update_node(
                "a",
                NodeUpdate {
                    node_type: Some(NodeType::Datastore),
                    position: Some(Position::new(500.0, 500.0)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(store
            .get_nodes_by_type(NodeType::Process)
            .iter()
            .all(|n| n.id != "a"));
        assert_eq!(store.get_nodes_by_type(NodeType::Datastore)[0].id, "a");
        assert_eq!(
            store.find_nearest_node(Position::new(499.0, 499.0), 5.0).map(|n| n.id.as_str()),
            Some("a")
        );
        assert!(store.find_nearest_node(Position::new(0.0, 0.0), 5.0).is_none());
    }

    #[test]
    fn test_rejected_update_keeps_old_value() {
        let mut store = store_with_chain();
        let update = NodeUpdate::position(Position::new(f64::NAN, 0.0));

        assert_matches!(store.update_node("a", update), Err(StoreError::Rejected { .. }));
        assert_eq!(store.get_node("a").unwrap().position, Position::new(0.0, 0.0));
    }

    #[test]
    fn test_update_edge_reindexes_targets() {
        let mut store = store_with_chain();
        store
            .update_edge("ab", EdgeUpdate::targets(vec!["c".to_string()]))
            .unwrap();

        assert!(store.get_incoming_edges("b").iter().all(|e| e.id != "ab"));
        let incoming: Vec<&str> = store
            .get_incoming_edges("c")
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(incoming, vec!["ab", "bc"]);

        assert_matches!(
            store.update_edge("ab", EdgeUpdate::targets(vec![])),
            Err(StoreError::Rejected { .. })
        );
    }

    #[test]
    fn test_not_found() {
        let mut store = GraphStore::new();
        assert_matches!(
            store.delete_node("nope"),
            Err(StoreError::NotFound { kind: EntityKind::Node, .. })
        );
        assert_matches!(
            store.update_boundary("nope", BoundaryUpdate::default()),
            Err(StoreError::NotFound { kind: EntityKind::Boundary, .. })
        );
        assert_matches!(store.delete_edge("nope"), Err(StoreError::NotFound { .. }));
    }

    #[test]
    fn test_listeners_receive_events() {
        let mut store = GraphStore::new();
        let events = recorded_events(&mut store);

        store.add_node(node("a", 0.0, 0.0)).unwrap();
        store.update_node("a", NodeUpdate::name("Renamed")).unwrap();
        store.undo().unwrap();

        let events = events.lock().unwrap();
        let ops: Vec<ChangeOperation> = events.iter().map(|e| e.operation).collect();
        assert_eq!(
            ops,
            vec![ChangeOperation::Add, ChangeOperation::Update, ChangeOperation::Undo]
        );
        assert_eq!(events[0].kind, EntityKind::Node);
        assert_eq!(events[2].kind, EntityKind::Graph);
    }

    #[test]
    fn test_remove_listener() {
        let mut store = GraphStore::new();
        let events = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&events);
        let id = store.add_change_listener(move |_| *sink.lock().unwrap() += 1);

        store.add_node(node("a", 0.0, 0.0)).unwrap();
        assert!(store.remove_change_listener(id));
        assert!(!store.remove_change_listener(id));
        store.add_node(node("b", 0.0, 0.0)).unwrap();

        assert_eq!(*events.lock().unwrap(), 1);
    }

    #[test]
    fn test_undo_redo() {
        let mut store = GraphStore::new();
        assert_matches!(store.undo(), Err(StoreError::NothingToUndo));

        store.add_node(node("a", 0.0, 0.0)).unwrap();
        store.add_node(node("b", 0.0, 0.0)).unwrap();

        store.undo().unwrap();
        assert!(store.get_node("b").is_none());
        assert!(store.get_node("a").is_some());

        store.undo().unwrap();
        assert!(store.nodes().is_empty());
        assert_matches!(store.undo(), Err(StoreError::NothingToUndo));

        store.redo().unwrap();
        store.redo().unwrap();
        assert_eq!(store.nodes().len(), 2);
        assert_matches!(store.redo(), Err(StoreError::NothingToRedo));
    }

    #[test]
    fn test_undo_restores_indices() {
        let mut store = store_with_chain();
        store.delete_node("b").unwrap();
        store.undo().unwrap();

        assert_eq!(store.get_connected_edges("b").len(), 2);
        assert_eq!(store.get_nodes_by_type(NodeType::Process).len(), 3);
        assert_eq!(
            store.find_nearest_node(Position::new(10.0, 0.0), 1.0).map(|n| n.id.as_str()),
            Some("b")
        );
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut store = GraphStore::new();
        store.add_node(node("X", 0.0, 0.0)).unwrap();
        store.create_checkpoint("c1");
        store.add_node(node("Y", 10.0, 0.0)).unwrap();
        store.add_node(node("Z", 20.0, 0.0)).unwrap();

        store.restore_to_checkpoint("c1").unwrap();
        let ids: Vec<String> = store.get_graph().nodes.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["X"]);
        assert_eq!(store.checkpoints(), vec!["c1"]);

        assert_matches!(
            store.restore_to_checkpoint("missing"),
            Err(StoreError::CheckpointNotFound { name }) if name == "missing"
        );
    }

    #[test]
    fn test_batch_applies_in_order_and_reports_skips() {
        let mut store = GraphStore::new();
        let events = recorded_events(&mut store);

        let batch = GraphBatch {
            add_nodes: vec![node("a", 0.0, 0.0), node("b", 10.0, 0.0)],
            // Edges are added after all nodes, so this resolves
            add_edges: vec![link("ab", "a", "b"), link("bad", "a", "ghost")],
            update_nodes: vec![("a".to_string(), NodeUpdate::name("Alpha"))],
            delete_nodes: vec!["missing".to_string()],
            ..Default::default()
        };

        let report = store.apply_batch(batch);
        assert_eq!(report.applied, 4);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].id, "bad");
        assert_matches!(report.skipped[1].error, StoreError::NotFound { .. });
        assert!(!report.is_clean());

        assert_eq!(store.get_node("a").unwrap().name, "Alpha");
        assert!(store.get_edge("ab").is_some());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, ChangeOperation::Batch);
        assert_eq!(events[0].id, report.id);
        assert!(report.id.starts_with("batch-"));

        // One undo reverts the whole batch
        drop(events);
        store.undo().unwrap();
        assert!(store.nodes().is_empty());
    }

    #[test]
    fn test_batch_deletes_edges_before_nodes() {
        let mut store = store_with_chain();
        let batch = GraphBatch {
            delete_edges: vec!["ab".to_string()],
            delete_nodes: vec!["b".to_string()],
            ..Default::default()
        };

        let report = store.apply_batch(batch);
        assert!(report.is_clean());
        assert!(store.edges().is_empty());
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn test_load_graph_is_atomic() {
        let mut store = store_with_chain();
        let mut graph = Graph::with_entities(
            vec![node("p", 0.0, 0.0)],
            vec![link("pq", "p", "q")],
            vec![],
        );
        graph.metadata.name = "broken".to_string();

        let err = store.load_graph(graph).unwrap_err();
        assert_matches!(
            &err,
            StoreError::InvalidGraph { result }
                if result.has_code(&ValidationCode::EdgeTargetNotFound)
        );
        assert_eq!(store.nodes().len(), 3);
    }

    #[test]
    fn test_load_graph_resets_history_and_returns_warnings() {
        let mut store = store_with_chain();
        let graph = Graph::with_entities(vec![node("lonely", 0.0, 0.0)], vec![], vec![]);

        let warnings = store.load_graph(graph).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.code == ValidationCode::IsolatedNodes));
        assert_eq!(store.nodes().len(), 1);
        assert!(!store.can_undo());
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn test_clear_is_undoable() {
        let mut store = store_with_chain();
        store.clear();
        assert!(store.get_graph().is_empty());

        store.undo().unwrap();
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn test_boundary_containment() {
        let mut store = store_with_chain();
        store
            .add_boundary(Boundary::new(
                "zone",
                BoundaryType::NetworkZone,
                "DMZ",
                Position::new(-5.0, -5.0),
                Size::new(20.0, 10.0),
            ))
            .unwrap();

        let inside: Vec<&str> = store
            .nodes_in_boundary("zone")
            .unwrap()
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(inside, vec!["a", "b"]);
        assert_eq!(store.boundaries_containing("a")[0].id, "zone");
        assert!(store.boundaries_containing("c").is_empty());
        assert_matches!(store.nodes_in_boundary("nope"), Err(StoreError::NotFound { .. }));
    }

    #[test]
    fn test_generate_id_skips_existing() {
        let mut store = GraphStore::new();
        store.add_node(node("00", 0.0, 0.0)).unwrap();

        let id = store.generate_id();
        assert_eq!(id, "01");
        store.add_node(node(&id, 1.0, 1.0)).unwrap();
        assert_eq!(store.generate_id(), "02");
    }

    #[test]
    fn test_search_uses_configured_limit() {
        let mut config = StoreConfig::default();
        config.search.default_limit = 2;
        let mut store = GraphStore::with_config(config);
        for i in 0..5 {
            store.add_node(node(&format!("n{}", i), i as f64, 0.0)).unwrap();
        }

        assert_eq!(store.search_nodes(&SearchOptions::new("node")).len(), 2);
        assert_eq!(store.search_nodes(&SearchOptions::new("node").limit(10)).len(), 5);
    }

    #[test]
    fn test_store_paths_use_config() {
        let store = store_with_chain();
        let paths = store.find_data_flow_paths("a", "c");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].edges, vec!["ab", "bc"]);
    }

    #[test]
    fn test_store_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<GraphStore>();
    }
}
