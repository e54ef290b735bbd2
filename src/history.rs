use crate::config::HistoryConfig;
use crate::graph::Graph;
use crate::{Boundary, Edge, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Immutable deep copy of the graph's entity collections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Ulid,
    pub timestamp: DateTime<Utc>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub boundaries: Vec<Boundary>,
    /// Checkpoint names attached to this state, oldest first
    #[serde(default)]
    pub checkpoints: Vec<String>,
}

impl Snapshot {
    /// Deep-copy the entity collections of a graph
    pub fn capture(graph: &Graph) -> Self {
        Self {
            id: Ulid::new(),
            timestamp: Utc::now(),
            nodes: graph.nodes.clone(),
            edges: graph.edges.clone(),
            boundaries: graph.boundaries.clone(),
            checkpoints: Vec::new(),
        }
    }

    /// Field-wise comparison of the entity collections
    pub fn same_state(&self, other: &Snapshot) -> bool {
        self.nodes == other.nodes
            && self.edges == other.edges
            && self.boundaries == other.boundaries
    }

    pub fn is_checkpoint(&self) -> bool {
        !self.checkpoints.is_empty()
    }
}

/// Bounded undo/redo stacks of snapshots.
///
/// The top of the undo stack is always the current committed state, so
/// `undo` needs at least two entries. Capacity is bounded two ways:
///
/// - FIFO trim: past `max_history_size` the oldest snapshots are dropped, and
///   the redo stack holds at most half that.
/// - Compaction: once per `compression_threshold` recorded snapshots, an undo
///   stack above 80% of capacity is collapsed to 60%. The most recent 30% of
///   the kept entries survive verbatim and older ones are sampled at a stride,
///   so intermediate states in between become unreachable. The current state
///   and checkpoint snapshots are always kept.
#[derive(Debug, Clone)]
pub struct History {
    config: HistoryConfig,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    since_compaction: usize,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            since_compaction: 0,
        }
    }

    /// Drop everything and record `graph` as the baseline state
    pub fn reset(&mut self, graph: &Graph) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.since_compaction = 0;
        self.record(graph);
    }

    /// Record the current state. Returns false when it matches the top of the
    /// undo stack. A new state discards the redo stack.
    pub fn record(&mut self, graph: &Graph) -> bool {
        let snapshot = Snapshot::capture(graph);
        if self
            .undo_stack
            .last()
            .is_some_and(|top| top.same_state(&snapshot))
        {
            return false;
        }

        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        self.trim_undo();

        self.since_compaction += 1;
        if self.since_compaction >= self.config.compression_threshold.max(1) {
            self.since_compaction = 0;
            self.compact();
        }
        true
    }

    /// Step back. Returns the state to restore, or None if there is nothing to undo.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.trim_redo();
        self.undo_stack.last()
    }

    /// Step forward. Returns the state to restore, or None if there is nothing to redo.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next);
        self.trim_undo();
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Tag the current state with a name. Discards the redo stack.
    ///
    /// A state can carry several names; naming an unchanged state again adds
    /// the name to the top snapshot rather than pushing a duplicate.
    pub fn create_checkpoint(&mut self, name: impl Into<String>, graph: &Graph) {
        let name = name.into();
        let mut snapshot = Snapshot::capture(graph);
        self.redo_stack.clear();

        if let Some(top) = self.undo_stack.last_mut() {
            if top.same_state(&snapshot) {
                if !top.checkpoints.contains(&name) {
                    top.checkpoints.push(name);
                }
                return;
            }
        }

        snapshot.checkpoints.push(name);
        self.undo_stack.push(snapshot);
        self.trim_undo();
    }

    /// Return to the most recent checkpoint with this name. Everything after
    /// it moves to the redo stack.
    pub fn restore_to_checkpoint(&mut self, name: &str) -> Option<&Snapshot> {
        let position = self
            .undo_stack
            .iter()
            .rposition(|s| s.checkpoints.iter().any(|c| c == name))?;

        let undone = self.undo_stack.split_off(position + 1);
        self.redo_stack.extend(undone.into_iter().rev());
        self.trim_redo();
        self.undo_stack.last()
    }

    /// Checkpoint names, oldest first
    pub fn checkpoints(&self) -> Vec<&str> {
        self.undo_stack
            .iter()
            .flat_map(|s| s.checkpoints.iter().map(String::as_str))
            .collect()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.undo_stack.last()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    fn trim_undo(&mut self) {
        let max = self.config.max_history_size.max(1);
        if self.undo_stack.len() > max {
            let excess = self.undo_stack.len() - max;
            self.undo_stack.drain(..excess);
        }
    }

    fn trim_redo(&mut self) {
        let max = (self.config.max_history_size / 2).max(1);
        if self.redo_stack.len() > max {
            // Bottom of the redo stack is the furthest future
            let excess = self.redo_stack.len() - max;
            self.redo_stack.drain(..excess);
        }
    }

    fn compact(&mut self) {
        let max = self.config.max_history_size;
        let len = self.undo_stack.len();
        if len * 5 <= max * 4 {
            return;
        }

        let target = (max * 3 / 5).max(2);
        if len <= target {
            return;
        }
        let recent = (target * 3 / 10).max(1);
        let slots = target - recent;
        let older = len - recent;

        let mut keep: Vec<usize> = (0..slots).map(|i| i * older / slots).collect();
        keep.extend(
            self.undo_stack[..older]
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_checkpoint())
                .map(|(i, _)| i),
        );
        keep.sort_unstable();
        keep.dedup();
        keep.extend(older..len);

        let mut stack = std::mem::take(&mut self.undo_stack)
            .into_iter()
            .enumerate();
        let mut kept = Vec::with_capacity(keep.len());
        for index in keep {
            for (i, snapshot) in stack.by_ref() {
                if i == index {
                    kept.push(snapshot);
                    break;
                }
            }
        }
        self.undo_stack = kept;

        tracing::info!(
            before = len,
            after = self.undo_stack.len(),
            "compacted undo history"
        );
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
