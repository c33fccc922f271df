use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::{GraphError, SchemaOptions, ValidationError, validate};

pub const MAX_NODES: usize = 100;
pub const MAX_NODE_LABEL_CHARS: usize = 100;
pub const MAX_EDGE_LABEL_CHARS: usize = 50;
pub const DEFAULT_GROUP: &str = "default";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Box,
    Ellipse,
    Diamond,
    Circle,
}

impl Shape {
    pub const ALL: [Shape; 4] = [Shape::Box, Shape::Ellipse, Shape::Diamond, Shape::Circle];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Ellipse => "ellipse",
            Self::Diamond => "diamond",
            Self::Circle => "circle",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    #[default]
    TB,
    LR,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::TB, Direction::LR];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|direction| direction.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TB => "TB",
            Self::LR => "LR",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub group: String,
    pub shape: Shape,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub direction: Direction,
}

/// A validated flowchart.
///
/// Only the validation entry points construct a `Graph`, so every value of
/// this type satisfies the size bounds and edge referential integrity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    layout: Layout,
}

impl Graph {
    pub(crate) fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, layout: Layout) -> Self {
        Self {
            nodes,
            edges,
            layout,
        }
    }

    /// Validates `document` with default options, discarding lint warnings.
    pub fn from_value(document: &Value) -> Result<Self, ValidationError> {
        validate(document, &SchemaOptions::default()).map(|validated| validated.graph)
    }

    pub fn from_json_str(source: &str) -> Result<Self, GraphError> {
        let document: Value = serde_json::from_str(source)?;
        Ok(Self::from_value(&document)?)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.source == node_id)
    }

    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.target == node_id)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
