use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open-ended property bag attached to every entity
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single property value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Render the value as text for searching and size checks.
    /// Strings render raw, everything else as JSON.
    pub fn to_search_text(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// A point on the diagram plane
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Width and height of a boundary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle used for region queries and containment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `2 * half_extent` centered on `center`
    pub fn around(center: Position, half_extent: f64) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            half_extent * 2.0,
            half_extent * 2.0,
        )
    }

    /// Get the right edge of the rectangle
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom edge of the rectangle
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// A rectangle with non-finite fields or negative extent selects nothing.
    /// Zero extent is a point or line probe and stays usable.
    pub fn is_degenerate(&self) -> bool {
        !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
            || self.width < 0.0
            || self.height < 0.0
    }

    /// Check if this rectangle overlaps another, touching edges included
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() < other.x
            || other.right() < self.x
            || self.bottom() < other.y
            || other.bottom() < self.y)
    }

    /// Check if this rectangle contains a point, edges included
    pub fn contains_point(&self, point: &Position) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }
}

/// Node kinds on a data-flow diagram
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Process,
    Datastore,
    ExternalEntity,
    Service,
    /// Anything a persisted graph carried that this build does not recognise
    #[serde(other)]
    Unknown,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Process,
        NodeType::Datastore,
        NodeType::ExternalEntity,
        NodeType::Service,
    ];

    pub fn is_recognized(&self) -> bool {
        !matches!(self, NodeType::Unknown)
    }
}

/// Boundary kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryType {
    TrustBoundary,
    NetworkZone,
    #[serde(other)]
    Unknown,
}

impl BoundaryType {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, BoundaryType::Unknown)
    }
}

/// A diagram node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Unique across nodes, edges and boundaries
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    pub name: String,

    pub position: Position,

    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    /// Create a new node with an empty property bag
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        name: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            position,
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Produce the node that would result from applying `update`
    pub fn merged(&self, update: &NodeUpdate) -> Node {
        Node {
            id: self.id.clone(),
            node_type: update.node_type.unwrap_or(self.node_type),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            position: update.position.unwrap_or(self.position),
            properties: update
                .properties
                .clone()
                .unwrap_or_else(|| self.properties.clone()),
        }
    }
}

/// Partial update for a node; `None` keeps the current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeUpdate {
    #[serde(rename = "type")]
    pub node_type: Option<NodeType>,
    pub name: Option<String>,
    pub position: Option<Position>,
    pub properties: Option<Properties>,
}

impl NodeUpdate {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn node_type(node_type: NodeType) -> Self {
        Self {
            node_type: Some(node_type),
            ..Default::default()
        }
    }
}

/// A rectangular grouping construct (trust boundary, network zone)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Boundary {
    pub id: String,

    #[serde(rename = "type")]
    pub boundary_type: BoundaryType,

    pub name: String,

    pub position: Position,

    pub bounds: Size,

    #[serde(default)]
    pub properties: Properties,
}

impl Boundary {
    pub fn new(
        id: impl Into<String>,
        boundary_type: BoundaryType,
        name: impl Into<String>,
        position: Position,
        bounds: Size,
    ) -> Self {
        Self {
            id: id.into(),
            boundary_type,
            name: name.into(),
            position,
            bounds,
            properties: Properties::new(),
        }
    }

    /// The rectangle this boundary covers
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.bounds.width,
            self.bounds.height,
        )
    }

    /// Containment is derived, never stored
    pub fn contains(&self, point: &Position) -> bool {
        self.rect().contains_point(point)
    }

    pub fn merged(&self, update: &BoundaryUpdate) -> Boundary {
        Boundary {
            id: self.id.clone(),
            boundary_type: update.boundary_type.unwrap_or(self.boundary_type),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            position: update.position.unwrap_or(self.position),
            bounds: update.bounds.unwrap_or(self.bounds),
            properties: update
                .properties
                .clone()
                .unwrap_or_else(|| self.properties.clone()),
        }
    }
}

/// Partial update for a boundary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundaryUpdate {
    #[serde(rename = "type")]
    pub boundary_type: Option<BoundaryType>,
    pub name: Option<String>,
    pub position: Option<Position>,
    pub bounds: Option<Size>,
    pub properties: Option<Properties>,
}
