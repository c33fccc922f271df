use crate::{
    DEFAULT_GROUP, Diagnostic, Direction, Edge, Graph, Layout, MAX_EDGE_LABEL_CHARS,
    MAX_NODE_LABEL_CHARS, MAX_NODES, Node, Shape, ValidationError, lint,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

const ROOT_FIELDS: &[&str] = &["nodes", "edges", "layout"];
const NODE_FIELDS: &[&str] = &["id", "label", "group", "shape"];
const EDGE_FIELDS: &[&str] = &["source", "target", "label"];
const LAYOUT_FIELDS: &[&str] = &["direction"];

/// Handling of object keys the schema does not declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownFields {
    #[default]
    Ignore,
    Reject,
}

/// Handling of two nodes sharing an `id`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateIds {
    #[default]
    Reject,
    Allow,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    pub unknown_fields: UnknownFields,
    pub duplicate_ids: DuplicateIds,
}

impl SchemaOptions {
    pub fn strict() -> Self {
        Self {
            unknown_fields: UnknownFields::Reject,
            duplicate_ids: DuplicateIds::Reject,
        }
    }
}

/// A graph that passed validation, with the advisory warnings raised for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedGraph {
    pub graph: Graph,
    pub warnings: Vec<Diagnostic>,
}

/// Validates an arbitrary JSON document against the flowchart schema.
///
/// All failures are collected. Node fields are checked before edges; edge
/// references are resolved only when every node validated, since the id set
/// is meaningless otherwise.
pub fn validate(
    document: &Value,
    options: &SchemaOptions,
) -> Result<ValidatedGraph, ValidationError> {
    let Some(root) = document.as_object() else {
        return Err(ValidationError::new(vec![Diagnostic::error(
            "type",
            "",
            format!("input should be an object, got {}", value_kind(document)),
        )]));
    };

    let mut checker = Checker::new(*options);
    checker.check_unknown_fields(root, "", ROOT_FIELDS);
    let nodes = checker.nodes(root.get("nodes"));
    let edges = checker.edges(root.get("edges"));
    let layout = checker.layout(root.get("layout"));

    if let (Some(nodes), Some(edges)) = (&nodes, &edges) {
        checker.check_references(nodes, edges);
    }

    match (nodes, edges, layout) {
        (Some(nodes), Some(edges), Some(layout)) if checker.diagnostics.is_empty() => {
            let graph = Graph::from_parts(nodes, edges, layout);
            let warnings = lint(&graph, &[]);
            Ok(ValidatedGraph { graph, warnings })
        }
        _ => Err(ValidationError::new(checker.diagnostics)),
    }
}

struct Checker {
    options: SchemaOptions,
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    fn new(options: SchemaOptions) -> Self {
        Self {
            options,
            diagnostics: Vec::new(),
        }
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn nodes(&mut self, value: Option<&Value>) -> Option<Vec<Node>> {
        let before = self.diagnostics.len();
        let Some(value) = value else {
            self.push(Diagnostic::error("missing", "nodes", "field required"));
            return None;
        };
        let items = self.list(value, "nodes")?;

        if items.is_empty() {
            self.push(Diagnostic::error(
                "too_short",
                "nodes",
                "list should have at least 1 item",
            ));
        } else if items.len() > MAX_NODES {
            self.push(Diagnostic::error(
                "too_long",
                "nodes",
                format!(
                    "list should have at most {MAX_NODES} items, got {}",
                    items.len()
                ),
            ));
        }

        let mut nodes = Vec::with_capacity(items.len());
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            let path = format!("nodes.{index}");
            let Some(node) = self.node(item, &path) else {
                continue;
            };
            if let Some(first) = first_seen.get(&node.id) {
                if self.options.duplicate_ids == DuplicateIds::Reject {
                    self.push(
                        Diagnostic::error(
                            "duplicate_id",
                            field_path(&path, "id"),
                            format!(
                                "duplicate node id '{}' (first used by nodes.{first})",
                                node.id
                            ),
                        )
                        .with_node_id(node.id.clone()),
                    );
                }
            } else {
                first_seen.insert(node.id.clone(), index);
            }
            nodes.push(node);
        }

        (self.diagnostics.len() == before).then_some(nodes)
    }

    fn node(&mut self, value: &Value, path: &str) -> Option<Node> {
        let before = self.diagnostics.len();
        let object = self.object(value, path)?;
        self.check_unknown_fields(object, path, NODE_FIELDS);

        let id = self.required_string(object, "id", path);
        if id.as_deref() == Some("") {
            self.push(Diagnostic::error(
                "too_short",
                field_path(path, "id"),
                "string should have at least 1 character",
            ));
        }
        let label = self.required_string(object, "label", path);
        if let Some(label) = &label {
            self.check_max_chars(label, MAX_NODE_LABEL_CHARS, &field_path(path, "label"));
        }
        let group = self
            .optional_string(object, "group", path, false)
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let shape = match object.get("shape") {
            Some(value) => self.shape(value, &field_path(path, "shape")),
            None => Some(Shape::default()),
        };

        if self.diagnostics.len() > before {
            return None;
        }
        Some(Node {
            id: id?,
            label: label?,
            group,
            shape: shape?,
        })
    }

    fn edges(&mut self, value: Option<&Value>) -> Option<Vec<Edge>> {
        let Some(value) = value else {
            return Some(Vec::new());
        };
        let before = self.diagnostics.len();
        let items = self.list(value, "edges")?;

        let edges: Vec<Edge> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| self.edge(item, &format!("edges.{index}")))
            .collect();

        (self.diagnostics.len() == before).then_some(edges)
    }

    fn edge(&mut self, value: &Value, path: &str) -> Option<Edge> {
        let before = self.diagnostics.len();
        let object = self.object(value, path)?;
        self.check_unknown_fields(object, path, EDGE_FIELDS);

        let source = self.required_string(object, "source", path);
        let target = self.required_string(object, "target", path);
        let label = self.optional_string(object, "label", path, true);
        if let Some(label) = &label {
            self.check_max_chars(label, MAX_EDGE_LABEL_CHARS, &field_path(path, "label"));
        }

        if self.diagnostics.len() > before {
            return None;
        }
        Some(Edge {
            source: source?,
            target: target?,
            label,
        })
    }

    fn layout(&mut self, value: Option<&Value>) -> Option<Layout> {
        let Some(value) = value else {
            return Some(Layout::default());
        };
        let object = self.object(value, "layout")?;
        self.check_unknown_fields(object, "layout", LAYOUT_FIELDS);

        let direction = match object.get("direction") {
            None => Direction::default(),
            Some(Value::String(raw)) => match Direction::parse(raw) {
                Some(direction) => direction,
                None => {
                    self.push(Diagnostic::error(
                        "enum",
                        "layout.direction",
                        format!(
                            "input should be {}, got '{raw}'",
                            expected_literals(&direction_names())
                        ),
                    ));
                    return None;
                }
            },
            Some(other) => {
                self.push(type_error("layout.direction", "string", other));
                return None;
            }
        };
        Some(Layout { direction })
    }

    fn check_references(&mut self, nodes: &[Node], edges: &[Edge]) {
        let ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        for (index, edge) in edges.iter().enumerate() {
            for (field, id) in [("source", &edge.source), ("target", &edge.target)] {
                if ids.contains(id.as_str()) {
                    continue;
                }
                self.push(
                    Diagnostic::error(
                        format!("edge_{field}_exists"),
                        format!("edges.{index}.{field}"),
                        format!("edge {field} '{id}' does not match any node id"),
                    )
                    .with_edge(edge.source.clone(), edge.target.clone()),
                );
            }
        }
    }

    fn shape(&mut self, value: &Value, path: &str) -> Option<Shape> {
        let Some(raw) = value.as_str() else {
            self.push(type_error(path, "string", value));
            return None;
        };
        let shape = Shape::parse(raw);
        if shape.is_none() {
            let names: Vec<&str> = Shape::ALL.iter().map(Shape::as_str).collect();
            self.push(Diagnostic::error(
                "enum",
                path,
                format!("input should be {}, got '{raw}'", expected_literals(&names)),
            ));
        }
        shape
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let object = value.as_object();
        if object.is_none() {
            self.push(type_error(path, "object", value));
        }
        object
    }

    fn list<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
        let items = value.as_array();
        if items.is_none() {
            self.push(type_error(path, "list", value));
        }
        items
    }

    fn required_string(
        &mut self,
        object: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<String> {
        let path = field_path(path, key);
        match object.get(key) {
            None => {
                self.push(Diagnostic::error("missing", path, "field required"));
                None
            }
            Some(Value::String(value)) => Some(value.clone()),
            Some(other) => {
                self.push(type_error(&path, "string", other));
                None
            }
        }
    }

    fn optional_string(
        &mut self,
        object: &Map<String, Value>,
        key: &str,
        path: &str,
        nullable: bool,
    ) -> Option<String> {
        match object.get(key) {
            None => None,
            Some(Value::Null) if nullable => None,
            Some(Value::String(value)) => Some(value.clone()),
            Some(other) => {
                self.push(type_error(&field_path(path, key), "string", other));
                None
            }
        }
    }

    fn check_max_chars(&mut self, value: &str, max: usize, path: &str) {
        let count = value.chars().count();
        if count > max {
            self.push(Diagnostic::error(
                "too_long",
                path,
                format!("string should have at most {max} characters, got {count}"),
            ));
        }
    }

    fn check_unknown_fields(&mut self, object: &Map<String, Value>, path: &str, allowed: &[&str]) {
        if self.options.unknown_fields == UnknownFields::Ignore {
            return;
        }
        for key in object.keys() {
            if !allowed.contains(&key.as_str()) {
                self.push(Diagnostic::error(
                    "extra_forbidden",
                    field_path(path, key),
                    "extra fields not permitted",
                ));
            }
        }
    }
}

fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(
        "type",
        path,
        format!("input should be a valid {expected}, got {}", value_kind(value)),
    )
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn direction_names() -> Vec<&'static str> {
    Direction::ALL.iter().map(Direction::as_str).collect()
}

fn expected_literals(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("'{name}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}
