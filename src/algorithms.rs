//! Stateless graph algorithms over a `Graph` value.
//!
//! Direction matters and differs by algorithm:
//! - traversal, components and closeness treat every edge as undirected
//! - path enumeration, shortest path, cycles and betweenness follow
//!   directed arcs from an edge's source to each of its targets
//!
//! Edges naming a node that is not in the graph are ignored. Neighbors are
//! visited in id order so every result is deterministic.

use crate::config::PathConfig;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};

/// Adjacency views of a graph, borrowed from it
struct Adjacency<'a> {
    /// Node ids in sorted order
    nodes: Vec<&'a str>,
    /// node -> (target, edge id), sorted
    outgoing: HashMap<&'a str, Vec<(&'a str, &'a str)>>,
    /// node -> neighbors in either direction, sorted and deduplicated
    undirected: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> Adjacency<'a> {
    fn new(graph: &'a Graph) -> Self {
        let mut nodes: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        nodes.sort_unstable();
        nodes.dedup();
        let known: HashSet<&str> = nodes.iter().copied().collect();

        let mut outgoing: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
        let mut undirected: HashMap<&str, Vec<&str>> = HashMap::new();

        for edge in &graph.edges {
            for (source, target) in edge.arcs() {
                if !known.contains(source) || !known.contains(target) {
                    continue;
                }
                outgoing
                    .entry(source)
                    .or_default()
                    .push((target, edge.id.as_str()));
                undirected.entry(source).or_default().push(target);
                undirected.entry(target).or_default().push(source);
            }
        }

        for arcs in outgoing.values_mut() {
            arcs.sort_unstable();
        }
        for neighbors in undirected.values_mut() {
            neighbors.sort_unstable();
            neighbors.dedup();
        }

        Self {
            nodes,
            outgoing,
            undirected,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.nodes.binary_search(&id).is_ok()
    }

    fn outgoing(&self, id: &str) -> &[(&'a str, &'a str)] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn neighbors(&self, id: &str) -> &[&'a str] {
        self.undirected.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct directed successors
    fn successors(&self, id: &str) -> Vec<&'a str> {
        let mut next: Vec<&str> = self.outgoing(id).iter().map(|(t, _)| *t).collect();
        next.dedup();
        next
    }

    fn arc_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }
}

/// Depth-first visitation order from `start`, ignoring edge direction.
/// Empty if `start` is not a node.
pub fn dfs(graph: &Graph, start: &str) -> Vec<String> {
    let adjacency = Adjacency::new(graph);
    if !adjacency.contains(start) {
        return Vec::new();
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![start];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id.to_string());

        // Reversed so the smallest id is explored first
        for &neighbor in adjacency.neighbors(id).iter().rev() {
            if !visited.contains(neighbor) {
                stack.push(neighbor);
            }
        }
    }

    order
}

/// Breadth-first visitation order from `start`, ignoring edge direction.
/// Empty if `start` is not a node.
pub fn bfs(graph: &Graph, start: &str) -> Vec<String> {
    let adjacency = Adjacency::new(graph);
    match adjacency.nodes.iter().find(|id| **id == start) {
        Some(&start) => bfs_levels(&adjacency, start)
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect(),
        None => Vec::new(),
    }
}

/// Undirected BFS returning (node, hop count) in visitation order
fn bfs_levels<'a>(adjacency: &Adjacency<'a>, start: &'a str) -> Vec<(&'a str, usize)> {
    let mut order = Vec::new();
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0)]);

    while let Some((id, depth)) = queue.pop_front() {
        order.push((id, depth));
        for &neighbor in adjacency.neighbors(id) {
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    order
}

/// A directed walk through the graph: `nodes` has one more entry than `edges`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFlowPath {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

impl DataFlowPath {
    fn trivial(node: &str) -> Self {
        Self {
            nodes: vec![node.to_string()],
            edges: Vec::new(),
        }
    }

    /// Number of hops
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Enumerate simple directed paths from `from` to `to`.
///
/// Only outgoing arcs are followed, unlike `dfs`/`bfs`. The search stops
/// extending a path at `limits.max_depth` hops and stops entirely once
/// `limits.max_paths` paths are found, so on dense or cyclic graphs the result
/// is a bounded sample, not every path. Results are sorted by hop count.
pub fn find_data_flow_paths(
    graph: &Graph,
    from: &str,
    to: &str,
    limits: PathConfig,
) -> Vec<DataFlowPath> {
    let adjacency = Adjacency::new(graph);
    if !adjacency.contains(from) || !adjacency.contains(to) || limits.max_paths == 0 {
        return Vec::new();
    }
    if from == to {
        return vec![DataFlowPath::trivial(from)];
    }

    let mut walk = PathWalk {
        adjacency: &adjacency,
        target: to,
        limits,
        nodes: vec![from],
        edges: Vec::new(),
        on_path: HashSet::from([from]),
        found: Vec::new(),
    };
    walk.extend(from);

    let mut paths = walk.found;
    paths.sort_by_key(DataFlowPath::len);
    paths
}

struct PathWalk<'g, 'a> {
    adjacency: &'g Adjacency<'a>,
    target: &'a str,
    limits: PathConfig,
    nodes: Vec<&'a str>,
    edges: Vec<&'a str>,
    on_path: HashSet<&'a str>,
    found: Vec<DataFlowPath>,
}

impl<'g, 'a> PathWalk<'g, 'a> {
    fn extend(&mut self, current: &'a str) {
        if self.edges.len() >= self.limits.max_depth {
            return;
        }

        let adjacency = self.adjacency;
        for &(next, edge) in adjacency.outgoing(current) {
            if self.found.len() >= self.limits.max_paths {
                return;
            }
            if self.on_path.contains(next) {
                continue;
            }

            self.nodes.push(next);
            self.edges.push(edge);

            if next == self.target {
                self.found.push(DataFlowPath {
                    nodes: self.nodes.iter().map(|s| s.to_string()).collect(),
                    edges: self.edges.iter().map(|s| s.to_string()).collect(),
                });
            } else {
                self.on_path.insert(next);
                self.extend(next);
                self.on_path.remove(next);
            }

            self.nodes.pop();
            self.edges.pop();
        }
    }
}

/// Fewest-hop directed path (Dijkstra with unit weights). None if unreachable.
pub fn shortest_path(graph: &Graph, from: &str, to: &str) -> Option<DataFlowPath> {
    let adjacency = Adjacency::new(graph);
    if !adjacency.contains(from) || !adjacency.contains(to) {
        return None;
    }
    if from == to {
        return Some(DataFlowPath::trivial(from));
    }

    let mut distance: HashMap<&str, usize> = HashMap::from([(from, 0)]);
    let mut previous: HashMap<&str, (&str, &str)> = HashMap::new();
    let mut heap = BinaryHeap::from([Reverse((0usize, from))]);

    while let Some(Reverse((cost, id))) = heap.pop() {
        if id == to {
            break;
        }
        if distance.get(id).is_some_and(|&best| cost > best) {
            continue;
        }

        for &(next, edge) in adjacency.outgoing(id) {
            let candidate = cost + 1;
            if distance.get(next).map_or(true, |&best| candidate < best) {
                distance.insert(next, candidate);
                previous.insert(next, (id, edge));
                heap.push(Reverse((candidate, next)));
            }
        }
    }

    let mut nodes = vec![to.to_string()];
    let mut edges = Vec::new();
    let mut current = to;
    while current != from {
        let &(prev, edge) = previous.get(current)?;
        nodes.push(prev.to_string());
        edges.push(edge.to_string());
        current = prev;
    }
    nodes.reverse();
    edges.reverse();

    Some(DataFlowPath { nodes, edges })
}

/// A directed cycle: `edges[i]` leads from `nodes[i]` to the next node, and the
/// last edge closes back to `nodes[0]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

/// Find directed cycles with a DFS over a recursion stack.
///
/// Each arc back into the stack closes a cycle. A cycle reachable along
/// several routes is reported once, keyed by its node and edge sets. Cycles
/// that are never closed by a back arc of this DFS are not enumerated.
pub fn detect_cycles(graph: &Graph) -> Vec<Cycle> {
    let adjacency = Adjacency::new(graph);
    let mut search = CycleSearch {
        adjacency: &adjacency,
        visited: HashSet::new(),
        on_stack: HashMap::new(),
        stack: Vec::new(),
        stack_edges: Vec::new(),
        seen: HashSet::new(),
        cycles: Vec::new(),
    };

    for &id in &adjacency.nodes {
        if !search.visited.contains(id) {
            search.visit(id);
        }
    }

    search.cycles
}

struct CycleSearch<'g, 'a> {
    adjacency: &'g Adjacency<'a>,
    visited: HashSet<&'a str>,
    /// Position of each node currently on `stack`
    on_stack: HashMap<&'a str, usize>,
    stack: Vec<&'a str>,
    /// `stack_edges[i]` leads from `stack[i]` to `stack[i + 1]`
    stack_edges: Vec<&'a str>,
    seen: HashSet<(Vec<&'a str>, Vec<&'a str>)>,
    cycles: Vec<Cycle>,
}

impl<'g, 'a> CycleSearch<'g, 'a> {
    /// Depth-first from `root` with an explicit frame stack of
    /// (node, index of the next outgoing arc to try)
    fn visit(&mut self, root: &'a str) {
        let adjacency = self.adjacency;
        let mut frames: Vec<(&'a str, usize)> = Vec::new();
        self.enter(root);
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let (id, arc) = *frame;
            let Some(&(next, edge)) = adjacency.outgoing(id).get(arc) else {
                frames.pop();
                self.leave(id);
                continue;
            };
            frame.1 += 1;

            if let Some(&start) = self.on_stack.get(next) {
                self.close(start, edge);
            } else if !self.visited.contains(next) {
                self.stack_edges.push(edge);
                self.enter(next);
                frames.push((next, 0));
            }
        }
    }

    fn enter(&mut self, id: &'a str) {
        self.visited.insert(id);
        self.on_stack.insert(id, self.stack.len());
        self.stack.push(id);
    }

    /// Pop `id` and the edge that led to it
    fn leave(&mut self, id: &'a str) {
        self.on_stack.remove(id);
        self.stack.pop();
        self.stack_edges.pop();
    }

    fn close(&mut self, start: usize, closing_edge: &'a str) {
        let nodes = &self.stack[start..];
        let mut edges = self.stack_edges[start..].to_vec();
        edges.push(closing_edge);

        let mut node_key = nodes.to_vec();
        node_key.sort_unstable();
        let mut edge_key = edges.clone();
        edge_key.sort_unstable();

        if self.seen.insert((node_key, edge_key)) {
            self.cycles.push(Cycle {
                nodes: nodes.iter().map(|s| s.to_string()).collect(),
                edges: edges.into_iter().map(String::from).collect(),
            });
        }
    }
}

/// Nodes with no incident edge in either direction, sorted by id
pub fn find_isolated_nodes(graph: &Graph) -> Vec<String> {
    let referenced: HashSet<&str> = graph.edges.iter().flat_map(|e| e.endpoints()).collect();

    let mut isolated: Vec<String> = graph
        .nodes
        .iter()
        .filter(|n| !referenced.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();
    isolated.sort();
    isolated
}

/// Components of the undirected view, largest first. Ids within a component
/// are sorted; equal-size components are ordered by their smallest id.
pub fn find_connected_components(graph: &Graph) -> Vec<Vec<String>> {
    let adjacency = Adjacency::new(graph);
    let mut assigned: HashSet<&str> = HashSet::new();
    let mut components = Vec::new();

    for &id in &adjacency.nodes {
        if assigned.contains(id) {
            continue;
        }
        let mut component: Vec<String> = bfs_levels(&adjacency, id)
            .into_iter()
            .map(|(member, _)| {
                assigned.insert(member);
                member.to_string()
            })
            .collect();
        component.sort();
        components.push(component);
    }

    components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    components
}

/// Nodes grouped by the boundary containing them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryClusters {
    /// boundary id -> member node ids (sorted); every boundary has an entry
    pub by_boundary: BTreeMap<String, Vec<String>>,
    /// Nodes outside every boundary
    pub unbounded: Vec<String>,
}

/// Assign each node to one boundary. When boundaries overlap the node goes
/// to the smallest-area boundary containing it, ties broken by boundary id.
pub fn cluster_by_boundaries(graph: &Graph) -> BoundaryClusters {
    let mut boundaries: Vec<_> = graph.boundaries.iter().collect();
    boundaries.sort_by(|a, b| {
        a.rect()
            .area()
            .total_cmp(&b.rect().area())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut clusters = BoundaryClusters {
        by_boundary: boundaries
            .iter()
            .map(|b| (b.id.clone(), Vec::new()))
            .collect(),
        unbounded: Vec::new(),
    };

    for node in &graph.nodes {
        match boundaries.iter().find(|b| b.contains(&node.position)) {
            Some(boundary) => clusters
                .by_boundary
                .entry(boundary.id.clone())
                .or_default()
                .push(node.id.clone()),
            None => clusters.unbounded.push(node.id.clone()),
        }
    }

    for members in clusters.by_boundary.values_mut() {
        members.sort();
    }
    clusters.unbounded.sort();
    clusters
}

/// Structural importance measures for one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Centrality {
    /// `in_degree + out_degree`
    pub degree: usize,
    pub in_degree: usize,
    pub out_degree: usize,
    /// Reachable node count over the sum of hop distances to them, undirected;
    /// 0 for a node that reaches nothing
    pub closeness: f64,
    /// Number of shortest directed paths between other node pairs passing
    /// through this node, split evenly among equally short alternatives
    pub betweenness: f64,
}

/// Degree, closeness and betweenness for every node
pub fn centrality(graph: &Graph) -> BTreeMap<String, Centrality> {
    let adjacency = Adjacency::new(graph);
    let mut scores: BTreeMap<String, Centrality> = adjacency
        .nodes
        .iter()
        .map(|id| (id.to_string(), Centrality::default()))
        .collect();

    for (&source, arcs) in &adjacency.outgoing {
        for (target, _) in arcs {
            if let Some(score) = scores.get_mut(source) {
                score.out_degree += 1;
            }
            if let Some(score) = scores.get_mut(*target) {
                score.in_degree += 1;
            }
        }
    }

    for &id in &adjacency.nodes {
        let levels = bfs_levels(&adjacency, id);
        let total: usize = levels.iter().map(|(_, depth)| depth).sum();
        let reached = levels.len() - 1;
        if let Some(score) = scores.get_mut(id) {
            score.degree = score.in_degree + score.out_degree;
            score.closeness = if total > 0 {
                reached as f64 / total as f64
            } else {
                0.0
            };
        }
    }

    for (id, value) in brandes_betweenness(&adjacency) {
        if let Some(score) = scores.get_mut(id) {
            score.betweenness = value;
        }
    }

    scores
}

/// Brandes' algorithm on directed, unweighted arcs
fn brandes_betweenness<'a>(adjacency: &Adjacency<'a>) -> HashMap<&'a str, f64> {
    let mut betweenness: HashMap<&str, f64> =
        adjacency.nodes.iter().map(|id| (*id, 0.0)).collect();

    for &source in &adjacency.nodes {
        let mut order: Vec<&str> = Vec::new();
        let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut paths: HashMap<&str, f64> = HashMap::from([(source, 1.0)]);
        let mut distance: HashMap<&str, usize> = HashMap::from([(source, 0)]);
        let mut queue = VecDeque::from([source]);

        while let Some(v) = queue.pop_front() {
            order.push(v);
            let (dv, sv) = (distance[v], paths[v]);
            for w in adjacency.successors(v) {
                if !distance.contains_key(w) {
                    distance.insert(w, dv + 1);
                    queue.push_back(w);
                }
                if distance[w] == dv + 1 {
                    *paths.entry(w).or_insert(0.0) += sv;
                    predecessors.entry(w).or_default().push(v);
                }
            }
        }

        let mut dependency: HashMap<&str, f64> = HashMap::new();
        while let Some(w) = order.pop() {
            let dw = dependency.get(w).copied().unwrap_or(0.0);
            for &v in predecessors.get(w).map(Vec::as_slice).unwrap_or(&[]) {
                let share = paths[v] / paths[w] * (1.0 + dw);
                *dependency.entry(v).or_insert(0.0) += share;
            }
            if w != source {
                if let Some(total) = betweenness.get_mut(w) {
                    *total += dw;
                }
            }
        }
    }

    betweenness
}

/// Summary counts for a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub boundary_count: usize,
    pub isolated_count: usize,
    pub component_count: usize,
    /// Mean of in + out degree over all nodes
    pub average_degree: f64,
    /// Arcs over the `n * (n - 1)` possible directed pairs
    pub density: f64,
}

pub fn graph_statistics(graph: &Graph) -> GraphStatistics {
    let adjacency = Adjacency::new(graph);
    let node_count = adjacency.nodes.len();
    let arcs = adjacency.arc_count() as f64;

    let average_degree = if node_count > 0 {
        2.0 * arcs / node_count as f64
    } else {
        0.0
    };
    let density = if node_count > 1 {
        arcs / (node_count * (node_count - 1)) as f64
    } else {
        0.0
    };

    GraphStatistics {
        node_count,
        edge_count: graph.edges.len(),
        boundary_count: graph.boundaries.len(),
        isolated_count: find_isolated_nodes(graph).len(),
        component_count: find_connected_components(graph).len(),
        average_degree,
        density,
    }
}
