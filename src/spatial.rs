use crate::entity::{Position, Rect};
use std::collections::HashMap;

/// Items a quadtree cell holds before it subdivides
pub const MAX_ITEMS: usize = 10;

/// Cells at this depth never subdivide; they hold any number of items
pub const MAX_DEPTH: usize = 10;

#[derive(Debug, Clone)]
struct QuadItem {
    id: String,
    position: Position,
}

#[derive(Debug, Clone)]
struct QuadCell {
    bounds: Rect,
    depth: usize,
    items: Vec<QuadItem>,
    /// NW, NE, SW, SE
    children: Option<Box<[QuadCell; 4]>>,
}

impl QuadCell {
    fn new(bounds: Rect, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn mid(&self) -> (f64, f64) {
        (
            self.bounds.x + self.bounds.width / 2.0,
            self.bounds.y + self.bounds.height / 2.0,
        )
    }

    /// Child slot for a point; points on a midline go east/south
    fn quadrant(&self, position: &Position) -> usize {
        let (mid_x, mid_y) = self.mid();
        let east = position.x >= mid_x;
        let south = position.y >= mid_y;
        match (south, east) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        }
    }

    fn insert(&mut self, item: QuadItem) {
        let slot = self.quadrant(&item.position);
        if let Some(children) = self.children.as_mut() {
            children[slot].insert(item);
            return;
        }

        if self.items.len() < MAX_ITEMS || self.depth >= MAX_DEPTH {
            self.items.push(item);
            return;
        }

        self.subdivide();
        self.insert(item);
    }

    fn subdivide(&mut self) {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.bounds;
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        let depth = self.depth + 1;

        let children = Box::new([
            QuadCell::new(Rect::new(x, y, half_w, half_h), depth),
            QuadCell::new(Rect::new(x + half_w, y, width - half_w, half_h), depth),
            QuadCell::new(Rect::new(x, y + half_h, half_w, height - half_h), depth),
            QuadCell::new(
                Rect::new(x + half_w, y + half_h, width - half_w, height - half_h),
                depth,
            ),
        ]);

        let items = std::mem::take(&mut self.items);
        self.children = Some(children);
        for item in items {
            self.insert(item);
        }
    }

    /// Follow the point's path down the tree and splice the item out
    fn remove(&mut self, id: &str, position: &Position) -> bool {
        if let Some(index) = self.items.iter().position(|item| item.id == id) {
            self.items.swap_remove(index);
            return true;
        }

        let slot = self.quadrant(position);
        match self.children.as_mut() {
            Some(children) => children[slot].remove(id, position),
            None => false,
        }
    }

    fn query<'a>(&'a self, region: &Rect, out: &mut Vec<(&'a str, Position)>) {
        if !self.bounds.intersects(region) {
            return;
        }

        out.extend(
            self.items
                .iter()
                .filter(|item| region.contains_point(&item.position))
                .map(|item| (item.id.as_str(), item.position)),
        );

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query(region, out);
            }
        }
    }

    fn collect(self, out: &mut Vec<QuadItem>) {
        out.extend(self.items);
        if let Some(children) = self.children {
            let [a, b, c, d] = *children;
            for child in [a, b, c, d] {
                child.collect(out);
            }
        }
    }

    fn cell_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(QuadCell::cell_count).sum())
    }
}

/// Point quadtree keyed by entity id.
///
/// Positions are never mutated in place: `update` is remove + reinsert, since
/// where an item lives in the tree is a function of its position. Removal does
/// not merge emptied cells. Points outside the root grow the root until it
/// covers them.
#[derive(Debug, Clone)]
pub struct QuadTree {
    root: QuadCell,
    positions: HashMap<String, Position>,
}

impl QuadTree {
    pub fn new(world: Rect) -> Self {
        let world = if world.is_degenerate() || world.width == 0.0 || world.height == 0.0 {
            Rect::new(-1.0, -1.0, 2.0, 2.0)
        } else {
            world
        };
        Self {
            root: QuadCell::new(world, 0),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn position_of(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    /// Insert a point. Re-inserting an existing id moves it. Non-finite positions are ignored.
    pub fn insert(&mut self, id: impl Into<String>, position: Position) -> bool {
        let id = id.into();
        if !position.is_finite() {
            tracing::warn!(%id, "ignoring non-finite position in spatial index");
            return false;
        }
        if self.positions.contains_key(&id) {
            self.remove(&id);
        }
        if !self.root.bounds.contains_point(&position) {
            self.grow_to(&position);
        }

        self.positions.insert(id.clone(), position);
        self.root.insert(QuadItem { id, position });
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.positions.remove(id) {
            Some(position) => self.root.remove(id, &position),
            None => false,
        }
    }

    pub fn update(&mut self, id: &str, position: Position) -> bool {
        self.remove(id);
        self.insert(id, position)
    }

    pub fn clear(&mut self) {
        self.root = QuadCell::new(self.root.bounds, 0);
        self.positions.clear();
    }

    /// Every item inside `region`, edges included. Degenerate regions select nothing.
    pub fn query(&self, region: &Rect) -> Vec<(&str, Position)> {
        if region.is_degenerate() {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.root.query(region, &mut out);
        out
    }

    /// Items within `max_distance` of `point`, nearest first (ties by id).
    ///
    /// Probes the square of side `2 * max_distance` and filters by true
    /// distance, which is good for hit-testing but is not a k-NN search.
    /// A radius too large for that square to be finite probes the whole tree.
    pub fn nearest(&self, point: Position, max_distance: f64) -> Vec<(&str, f64)> {
        if !point.is_finite() || !max_distance.is_finite() || max_distance < 0.0 {
            return Vec::new();
        }

        let probe = Rect::around(point, max_distance);
        let probe = if probe.is_degenerate() {
            self.root.bounds
        } else {
            probe
        };
        let mut hits: Vec<(&str, f64)> = self
            .query(&probe)
            .into_iter()
            .map(|(id, position)| (id, position.distance_to(&point)))
            .filter(|(_, distance)| *distance <= max_distance)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        hits
    }

    /// Number of cells in the tree, for diagnostics
    pub fn cell_count(&self) -> usize {
        self.root.cell_count()
    }

    /// Double the root toward the point until it is covered, then rebuild
    fn grow_to(&mut self, position: &Position) {
        let mut bounds = self.root.bounds;
        while !bounds.contains_point(position) {
            let grow_left = position.x < bounds.x;
            let grow_up = position.y < bounds.y;
            bounds = Rect::new(
                if grow_left { bounds.x - bounds.width } else { bounds.x },
                if grow_up { bounds.y - bounds.height } else { bounds.y },
                bounds.width * 2.0,
                bounds.height * 2.0,
            );
        }

        tracing::debug!(?bounds, items = self.positions.len(), "growing spatial index root");

        let old_root = std::mem::replace(&mut self.root, QuadCell::new(bounds, 0));
        let mut items = Vec::with_capacity(self.positions.len());
        old_root.collect(&mut items);
        for item in items {
            self.root.insert(item);
        }
    }
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::new(crate::config::SpatialConfig::default().world)
    }
}
