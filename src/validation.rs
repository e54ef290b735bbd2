use crate::config::ValidationLimits;
use crate::event::EntityKind;
use crate::graph::{EntityLookup, Graph};
use crate::{Boundary, Edge, Node};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Validation severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Warning, // advisory, never blocks
    Error,   // blocks the mutation
}

/// Machine-readable issue codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    NodeMissingId,
    NodeMissingName,
    NodeNameTooLong,
    NodeInvalidPosition,
    NodePositionOutOfRange,
    NodeTooManyProperties,
    NodePropertyTooLarge,
    NodeInvalidType,
    EdgeMissingId,
    EdgeMissingSource,
    EdgeNoTargets,
    EdgeInvalidTarget,
    EdgeTooManyTargets,
    EdgeDuplicateTargets,
    EdgeSelfLoop,
    EdgeInvalidType,
    EdgeSourceNotFound,
    EdgeTargetNotFound,
    BoundaryMissingId,
    BoundaryMissingName,
    BoundaryInvalidPosition,
    BoundaryInvalidWidth,
    BoundaryInvalidHeight,
    BoundaryTooLarge,
    BoundaryInvalidType,
    DuplicateId,
    GraphTooManyNodes,
    GraphTooManyEdges,
    IsolatedNodes,
    /// A rule failed or panicked while running
    ValidatorError,
    /// Issued by caller-registered rules
    Custom(String),
}

impl ValidationCode {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationCode::NodeMissingId => "NODE_MISSING_ID",
            ValidationCode::NodeMissingName => "NODE_MISSING_NAME",
            ValidationCode::NodeNameTooLong => "NODE_NAME_TOO_LONG",
            ValidationCode::NodeInvalidPosition => "NODE_INVALID_POSITION",
            ValidationCode::NodePositionOutOfRange => "NODE_POSITION_OUT_OF_RANGE",
            ValidationCode::NodeTooManyProperties => "NODE_TOO_MANY_PROPERTIES",
            ValidationCode::NodePropertyTooLarge => "NODE_PROPERTY_TOO_LARGE",
            ValidationCode::NodeInvalidType => "NODE_INVALID_TYPE",
            ValidationCode::EdgeMissingId => "EDGE_MISSING_ID",
            ValidationCode::EdgeMissingSource => "EDGE_MISSING_SOURCE",
            ValidationCode::EdgeNoTargets => "EDGE_NO_TARGETS",
            ValidationCode::EdgeInvalidTarget => "EDGE_INVALID_TARGET",
            ValidationCode::EdgeTooManyTargets => "EDGE_TOO_MANY_TARGETS",
            ValidationCode::EdgeDuplicateTargets => "EDGE_DUPLICATE_TARGETS",
            ValidationCode::EdgeSelfLoop => "EDGE_SELF_LOOP",
            ValidationCode::EdgeInvalidType => "EDGE_INVALID_TYPE",
            ValidationCode::EdgeSourceNotFound => "EDGE_SOURCE_NOT_FOUND",
            ValidationCode::EdgeTargetNotFound => "EDGE_TARGET_NOT_FOUND",
            ValidationCode::BoundaryMissingId => "BOUNDARY_MISSING_ID",
            ValidationCode::BoundaryMissingName => "BOUNDARY_MISSING_NAME",
            ValidationCode::BoundaryInvalidPosition => "BOUNDARY_INVALID_POSITION",
            ValidationCode::BoundaryInvalidWidth => "BOUNDARY_INVALID_WIDTH",
            ValidationCode::BoundaryInvalidHeight => "BOUNDARY_INVALID_HEIGHT",
            ValidationCode::BoundaryTooLarge => "BOUNDARY_TOO_LARGE",
            ValidationCode::BoundaryInvalidType => "BOUNDARY_INVALID_TYPE",
            ValidationCode::DuplicateId => "DUPLICATE_ID",
            ValidationCode::GraphTooManyNodes => "GRAPH_TOO_MANY_NODES",
            ValidationCode::GraphTooManyEdges => "GRAPH_TOO_MANY_EDGES",
            ValidationCode::IsolatedNodes => "ISOLATED_NODES",
            ValidationCode::ValidatorError => "VALIDATOR_ERROR",
            ValidationCode::Custom(code) => code,
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding produced by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub code: ValidationCode,
    pub message: String,
    pub entity_id: Option<String>,
    pub entity_kind: Option<EntityKind>,
}

impl ValidationIssue {
    pub fn error(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            code,
            message: message.into(),
            entity_id: None,
            entity_kind: None,
        }
    }

    pub fn warning(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attribute the issue to an entity
    pub fn on(mut self, kind: EntityKind, id: impl Into<String>) -> Self {
        self.entity_kind = Some(kind);
        self.entity_id = Some(id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }
}

/// Complete validation result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Add an issue
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Get all errors
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error()).collect()
    }

    /// Get all warnings
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
            .collect()
    }

    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn has_code(&self, code: &ValidationCode) -> bool {
        self.issues.iter().any(|i| &i.code == code)
    }

    /// Split into (errors, warnings)
    pub fn into_parts(self) -> (Vec<ValidationIssue>, Vec<ValidationIssue>) {
        self.issues.into_iter().partition(ValidationIssue::is_error)
    }
}

/// Per-entity breakdown of a graph validation, for diagnostics and UI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    /// Issues attributed to an entity, keyed by entity id
    pub by_entity: BTreeMap<String, Vec<ValidationIssue>>,
    /// Issues about the graph as a whole
    pub graph_issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_result(result: ValidationResult) -> Self {
        let mut report = Self {
            is_valid: result.is_valid(),
            error_count: result.errors().len(),
            warning_count: result.warnings().len(),
            ..Default::default()
        };

        for issue in result.issues {
            match issue.entity_id.clone() {
                Some(id) => report.by_entity.entry(id).or_default().push(issue),
                None => report.graph_issues.push(issue),
            }
        }

        report
    }

    /// Highest severity per entity, for highlighting
    pub fn entities_with_issues(&self) -> HashMap<String, ValidationSeverity> {
        self.by_entity
            .iter()
            .filter_map(|(id, issues)| {
                issues
                    .iter()
                    .map(|i| i.severity)
                    .max()
                    .map(|severity| (id.clone(), severity))
            })
            .collect()
    }
}

/// What a rule returns. An `Err` is contained by the runner and reported as `VALIDATOR_ERROR`.
pub type RuleOutcome = anyhow::Result<Vec<ValidationIssue>>;

/// Inputs shared by every rule invocation
pub struct RuleContext<'a> {
    pub limits: &'a ValidationLimits,
    /// Present when relational checks are possible
    pub lookup: Option<&'a dyn EntityLookup>,
}

type RuleFn<T> = dyn Fn(&T, &RuleContext<'_>) -> RuleOutcome + Send + Sync;

/// A named, independent check over one entity kind
pub struct Rule<T> {
    name: String,
    check: Box<RuleFn<T>>,
}

impl<T> Rule<T> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&T, &RuleContext<'_>) -> RuleOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Rule engine for nodes, edges, boundaries and whole graphs. Never mutates.
pub struct Validator {
    limits: ValidationLimits,
    node_rules: Vec<Rule<Node>>,
    edge_rules: Vec<Rule<Edge>>,
    boundary_rules: Vec<Rule<Boundary>>,
    graph_rules: Vec<Rule<Graph>>,
}

impl Validator {
    /// Validator with the built-in rule set
    pub fn new(limits: ValidationLimits) -> Self {
        Self {
            limits,
            node_rules: rules::node_rules(),
            edge_rules: rules::edge_rules(),
            boundary_rules: rules::boundary_rules(),
            graph_rules: rules::graph_rules(),
        }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    pub fn add_node_rule(&mut self, rule: Rule<Node>) {
        self.node_rules.push(rule);
    }

    pub fn add_edge_rule(&mut self, rule: Rule<Edge>) {
        self.edge_rules.push(rule);
    }

    pub fn add_boundary_rule(&mut self, rule: Rule<Boundary>) {
        self.boundary_rules.push(rule);
    }

    pub fn add_graph_rule(&mut self, rule: Rule<Graph>) {
        self.graph_rules.push(rule);
    }

    // ========== Entity validation ==========

    pub fn validate_node(
        &self,
        node: &Node,
        lookup: Option<&dyn EntityLookup>,
    ) -> ValidationResult {
        let ctx = self.context(lookup);
        ValidationResult::from_issues(run_rules(
            &self.node_rules,
            node,
            &ctx,
            EntityKind::Node,
            &node.id,
        ))
    }

    pub fn validate_edge(
        &self,
        edge: &Edge,
        lookup: Option<&dyn EntityLookup>,
    ) -> ValidationResult {
        let ctx = self.context(lookup);
        ValidationResult::from_issues(run_rules(
            &self.edge_rules,
            edge,
            &ctx,
            EntityKind::Edge,
            &edge.id,
        ))
    }

    pub fn validate_boundary(
        &self,
        boundary: &Boundary,
        lookup: Option<&dyn EntityLookup>,
    ) -> ValidationResult {
        let ctx = self.context(lookup);
        ValidationResult::from_issues(run_rules(
            &self.boundary_rules,
            boundary,
            &ctx,
            EntityKind::Boundary,
            &boundary.id,
        ))
    }

    /// Errors-only gate check
    pub fn is_node_valid(&self, node: &Node, lookup: Option<&dyn EntityLookup>) -> bool {
        self.validate_node(node, lookup).is_valid()
    }

    pub fn is_edge_valid(&self, edge: &Edge, lookup: Option<&dyn EntityLookup>) -> bool {
        self.validate_edge(edge, lookup).is_valid()
    }

    pub fn is_boundary_valid(
        &self,
        boundary: &Boundary,
        lookup: Option<&dyn EntityLookup>,
    ) -> bool {
        self.validate_boundary(boundary, lookup).is_valid()
    }

    // ========== Graph validation ==========

    /// Validate every entity structurally, then run graph-level rules
    /// (id uniqueness, dangling references, size and connectivity advisories).
    pub fn validate_graph(&self, graph: &Graph) -> ValidationResult {
        let ctx = self.context(None);
        let mut result = ValidationResult::new();

        for node in &graph.nodes {
            result.extend(run_rules(&self.node_rules, node, &ctx, EntityKind::Node, &node.id));
        }
        for edge in &graph.edges {
            result.extend(run_rules(&self.edge_rules, edge, &ctx, EntityKind::Edge, &edge.id));
        }
        for boundary in &graph.boundaries {
            result.extend(run_rules(
                &self.boundary_rules,
                boundary,
                &ctx,
                EntityKind::Boundary,
                &boundary.id,
            ));
        }
        result.extend(run_graph_rules(&self.graph_rules, graph, &ctx));

        result
    }

    pub fn validation_report(&self, graph: &Graph) -> ValidationReport {
        ValidationReport::from_result(self.validate_graph(graph))
    }

    fn context<'a>(&'a self, lookup: Option<&'a dyn EntityLookup>) -> RuleContext<'a> {
        RuleContext {
            limits: &self.limits,
            lookup,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationLimits::default())
    }
}

/// Run every rule, attributing issues to the entity and containing rule failures
fn run_rules<T>(
    rules: &[Rule<T>],
    entity: &T,
    ctx: &RuleContext<'_>,
    kind: EntityKind,
    id: &str,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for rule in rules {
        for issue in contain(rule, entity, ctx) {
            issues.push(if issue.entity_id.is_none() {
                issue.on(kind, id)
            } else {
                issue
            });
        }
    }
    issues
}

fn run_graph_rules(
    rules: &[Rule<Graph>],
    graph: &Graph,
    ctx: &RuleContext<'_>,
) -> Vec<ValidationIssue> {
    rules.iter().flat_map(|rule| contain(rule, graph, ctx)).collect()
}

fn contain<T>(rule: &Rule<T>, entity: &T, ctx: &RuleContext<'_>) -> Vec<ValidationIssue> {
    match panic::catch_unwind(AssertUnwindSafe(|| (rule.check)(entity, ctx))) {
        Ok(Ok(issues)) => issues,
        Ok(Err(err)) => {
            tracing::error!(rule = %rule.name, error = %err, "validation rule failed");
            vec![ValidationIssue::error(
                ValidationCode::ValidatorError,
                format!("Rule '{}' failed: {:#}", rule.name, err),
            )]
        }
        Err(_) => {
            tracing::error!(rule = %rule.name, "validation rule panicked");
            vec![ValidationIssue::error(
                ValidationCode::ValidatorError,
                format!("Rule '{}' panicked", rule.name),
            )]
        }
    }
}

/// Built-in rule set
mod rules {
    use super::*;
    use crate::{Position, Size};

    pub(super) fn node_rules() -> Vec<Rule<Node>> {
        vec![
            Rule::new("node.identity", |node: &Node, ctx| {
                let mut issues = Vec::new();
                if node.id.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::NodeMissingId,
                        "Node must have an id",
                    ));
                }
                if node.name.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::NodeMissingName,
                        "Node must have a name",
                    ));
                } else if node.name.chars().count() > ctx.limits.max_name_length {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::NodeNameTooLong,
                        format!(
                            "Node name exceeds {} characters",
                            ctx.limits.max_name_length
                        ),
                    ));
                }
                Ok(issues)
            }),
            Rule::new("node.position", |node: &Node, ctx| {
                Ok(position_issues(
                    &node.position,
                    ctx.limits.max_position_magnitude,
                    ValidationCode::NodeInvalidPosition,
                    Some(ValidationCode::NodePositionOutOfRange),
                    "Node",
                ))
            }),
            Rule::new("node.properties", |node: &Node, ctx| {
                let mut issues = Vec::new();
                if node.properties.len() > ctx.limits.max_properties {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::NodeTooManyProperties,
                        format!(
                            "Node has {} properties (more than {})",
                            node.properties.len(),
                            ctx.limits.max_properties
                        ),
                    ));
                }
                for (key, value) in &node.properties {
                    let serialized = serde_json::to_string(value)?;
                    if serialized.chars().count() > ctx.limits.max_property_length {
                        issues.push(ValidationIssue::warning(
                            ValidationCode::NodePropertyTooLarge,
                            format!(
                                "Property '{}' exceeds {} characters",
                                key, ctx.limits.max_property_length
                            ),
                        ));
                    }
                }
                Ok(issues)
            }),
            Rule::new("node.type", |node: &Node, _ctx| {
                Ok(if node.node_type.is_recognized() {
                    vec![]
                } else {
                    vec![ValidationIssue::error(
                        ValidationCode::NodeInvalidType,
                        "Node type is not recognized",
                    )]
                })
            }),
        ]
    }

    pub(super) fn edge_rules() -> Vec<Rule<Edge>> {
        vec![
            Rule::new("edge.identity", |edge: &Edge, _ctx| {
                let mut issues = Vec::new();
                if edge.id.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::EdgeMissingId,
                        "Edge must have an id",
                    ));
                }
                if edge.source.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::EdgeMissingSource,
                        "Edge must have a source node",
                    ));
                }
                Ok(issues)
            }),
            Rule::new("edge.targets", |edge: &Edge, ctx| {
                let mut issues = Vec::new();
                if edge.targets.is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::EdgeNoTargets,
                        "Edge must have at least one target",
                    ));
                    return Ok(issues);
                }

                for (index, target) in edge.targets.iter().enumerate() {
                    if target.trim().is_empty() {
                        issues.push(ValidationIssue::error(
                            ValidationCode::EdgeInvalidTarget,
                            format!("Edge target at index {} is empty", index),
                        ));
                    }
                }

                if edge.targets.len() > ctx.limits.max_edge_targets {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::EdgeTooManyTargets,
                        format!(
                            "Edge has {} targets (more than {})",
                            edge.targets.len(),
                            ctx.limits.max_edge_targets
                        ),
                    ));
                }

                let distinct: HashSet<&str> = edge.targets.iter().map(String::as_str).collect();
                if distinct.len() != edge.targets.len() {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::EdgeDuplicateTargets,
                        "Edge lists the same target more than once",
                    ));
                }

                if edge.targets_node(&edge.source) {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::EdgeSelfLoop,
                        "Edge source is also one of its targets",
                    ));
                }
                Ok(issues)
            }),
            Rule::new("edge.type", |edge: &Edge, _ctx| {
                Ok(if edge.edge_type.is_recognized() {
                    vec![]
                } else {
                    vec![ValidationIssue::error(
                        ValidationCode::EdgeInvalidType,
                        "Edge type is not recognized",
                    )]
                })
            }),
            Rule::new("edge.references", |edge: &Edge, ctx| {
                Ok(match ctx.lookup {
                    Some(lookup) => reference_issues(edge, |id| lookup.has_node(id)),
                    None => vec![],
                })
            }),
        ]
    }

    pub(super) fn boundary_rules() -> Vec<Rule<Boundary>> {
        vec![
            Rule::new("boundary.identity", |boundary: &Boundary, _ctx| {
                let mut issues = Vec::new();
                if boundary.id.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::BoundaryMissingId,
                        "Boundary must have an id",
                    ));
                }
                if boundary.name.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        ValidationCode::BoundaryMissingName,
                        "Boundary must have a name",
                    ));
                }
                Ok(issues)
            }),
            Rule::new("boundary.position", |boundary: &Boundary, _ctx| {
                Ok(position_issues(
                    &boundary.position,
                    f64::INFINITY,
                    ValidationCode::BoundaryInvalidPosition,
                    None,
                    "Boundary",
                ))
            }),
            Rule::new("boundary.dimensions", |boundary: &Boundary, ctx| {
                let mut issues = Vec::new();
                let Size { width, height } = boundary.bounds;
                if !(width.is_finite() && width > 0.0) {
                    issues.push(ValidationIssue::error(
                        ValidationCode::BoundaryInvalidWidth,
                        format!("Boundary width must be a positive number, got {}", width),
                    ));
                }
                if !(height.is_finite() && height > 0.0) {
                    issues.push(ValidationIssue::error(
                        ValidationCode::BoundaryInvalidHeight,
                        format!("Boundary height must be a positive number, got {}", height),
                    ));
                }
                let max = ctx.limits.max_boundary_dimension;
                if (width.is_finite() && width > max) || (height.is_finite() && height > max) {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::BoundaryTooLarge,
                        format!("Boundary is larger than {} on one axis", max),
                    ));
                }
                Ok(issues)
            }),
            Rule::new("boundary.type", |boundary: &Boundary, _ctx| {
                Ok(if boundary.boundary_type.is_recognized() {
                    vec![]
                } else {
                    vec![ValidationIssue::error(
                        ValidationCode::BoundaryInvalidType,
                        "Boundary type is not recognized",
                    )]
                })
            }),
        ]
    }

    pub(super) fn graph_rules() -> Vec<Rule<Graph>> {
        vec![
            Rule::new("graph.unique_ids", |graph: &Graph, _ctx| {
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                let ids = graph
                    .nodes
                    .iter()
                    .map(|n| n.id.as_str())
                    .chain(graph.edges.iter().map(|e| e.id.as_str()))
                    .chain(graph.boundaries.iter().map(|b| b.id.as_str()));
                for id in ids {
                    *counts.entry(id).or_default() += 1;
                }

                Ok(counts
                    .into_iter()
                    .filter(|(_, count)| *count > 1)
                    .map(|(id, count)| {
                        ValidationIssue::error(
                            ValidationCode::DuplicateId,
                            format!("Id '{}' is used by {} entities", id, count),
                        )
                        .on(EntityKind::Graph, id)
                    })
                    .collect())
            }),
            Rule::new("graph.references", |graph: &Graph, _ctx| {
                let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
                Ok(graph
                    .edges
                    .iter()
                    .flat_map(|edge| {
                        reference_issues(edge, |id| node_ids.contains(id))
                            .into_iter()
                            .map(move |issue| issue.on(EntityKind::Edge, edge.id.clone()))
                    })
                    .collect())
            }),
            Rule::new("graph.size", |graph: &Graph, ctx| {
                let mut issues = Vec::new();
                if graph.nodes.len() > ctx.limits.max_graph_nodes {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::GraphTooManyNodes,
                        format!(
                            "Graph has {} nodes; rendering may degrade past {}",
                            graph.nodes.len(),
                            ctx.limits.max_graph_nodes
                        ),
                    ));
                }
                if graph.edges.len() > ctx.limits.max_graph_edges {
                    issues.push(ValidationIssue::warning(
                        ValidationCode::GraphTooManyEdges,
                        format!(
                            "Graph has {} edges; rendering may degrade past {}",
                            graph.edges.len(),
                            ctx.limits.max_graph_edges
                        ),
                    ));
                }
                Ok(issues)
            }),
            Rule::new("graph.isolated_nodes", |graph: &Graph, _ctx| {
                let connected: HashSet<&str> =
                    graph.edges.iter().flat_map(|e| e.endpoints()).collect();
                let isolated = graph
                    .nodes
                    .iter()
                    .filter(|n| !connected.contains(n.id.as_str()))
                    .count();
                Ok(if isolated > 0 {
                    vec![ValidationIssue::warning(
                        ValidationCode::IsolatedNodes,
                        format!("{} node(s) have no connections", isolated),
                    )]
                } else {
                    vec![]
                })
            }),
        ]
    }

    fn position_issues(
        position: &Position,
        max_magnitude: f64,
        invalid: ValidationCode,
        out_of_range: Option<ValidationCode>,
        label: &str,
    ) -> Vec<ValidationIssue> {
        if !position.is_finite() {
            return vec![ValidationIssue::error(
                invalid,
                format!("{} position must be finite", label),
            )];
        }
        match out_of_range {
            Some(code) if position.x.abs() > max_magnitude || position.y.abs() > max_magnitude => {
                vec![ValidationIssue::warning(
                    code,
                    format!(
                        "{} position is beyond {} and may not render correctly",
                        label, max_magnitude
                    ),
                )]
            }
            _ => vec![],
        }
    }

    /// Missing source / target nodes, one issue per distinct missing id
    fn reference_issues(edge: &Edge, exists: impl Fn(&str) -> bool) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !edge.source.is_empty() && !exists(&edge.source) {
            issues.push(ValidationIssue::error(
                ValidationCode::EdgeSourceNotFound,
                format!("Source node '{}' does not exist", edge.source),
            ));
        }
        let mut reported = HashSet::new();
        for target in &edge.targets {
            if !target.is_empty() && !exists(target) && reported.insert(target.as_str()) {
                issues.push(ValidationIssue::error(
                    ValidationCode::EdgeTargetNotFound,
                    format!("Target node '{}' does not exist", target),
                ));
            }
        }
        issues
    }
}
