use crate::{Direction, Graph};
use graphviz_rust::dot_structures::{
    Attribute, Edge as DotEdge, EdgeTy, Graph as DotGraph, GraphAttributes, Id, Node as DotNode,
    NodeId, Stmt, Vertex,
};
use graphviz_rust::printer::PrinterContext;
use std::collections::BTreeMap;

/// Presentation settings for DOT output. Passed explicitly; the graph itself
/// carries no styling beyond `group` and `shape`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DotStyle {
    pub layout_engine: String,
    pub node_color: String,
    pub edge_color: String,
    pub font: String,
    pub group_colors: BTreeMap<String, String>,
}

impl Default for DotStyle {
    fn default() -> Self {
        let group_colors = [
            ("process", "#e6f7ff"),
            ("decision", "#fffbe6"),
            ("interface", "#f6ffed"),
            ("user", "#e6e6ff"),
            ("system", "#f0f0f0"),
        ]
        .into_iter()
        .map(|(group, color)| (group.to_string(), color.to_string()))
        .collect();

        Self {
            layout_engine: "dot".to_string(),
            node_color: "#f0f0f0".to_string(),
            edge_color: "#808080".to_string(),
            font: "Arial".to_string(),
            group_colors,
        }
    }
}

impl DotStyle {
    pub fn fill_for_group(&self, group: &str) -> &str {
        self.group_colors
            .get(group)
            .map(String::as_str)
            .unwrap_or(&self.node_color)
    }
}

pub fn to_dot(graph: &Graph, style: &DotStyle) -> String {
    let rankdir = match graph.layout().direction {
        Direction::TB => "TB",
        Direction::LR => "LR",
    };

    let mut stmts = vec![
        Stmt::GAttribute(GraphAttributes::Graph(vec![
            attr("layout", quoted(&style.layout_engine)),
            attr("rankdir", plain(rankdir)),
            attr("splines", plain("ortho")),
            attr("nodesep", plain("0.8")),
            attr("ranksep", plain("0.8")),
        ])),
        Stmt::GAttribute(GraphAttributes::Node(vec![
            attr("style", quoted("rounded,filled")),
            attr("fillcolor", quoted(&style.node_color)),
            attr("fontname", quoted(&style.font)),
            attr("fontsize", plain("12")),
        ])),
        Stmt::GAttribute(GraphAttributes::Edge(vec![
            attr("color", quoted(&style.edge_color)),
            attr("fontname", quoted(&style.font)),
            attr("fontsize", plain("10")),
        ])),
    ];

    for node in graph.nodes() {
        stmts.push(Stmt::Node(DotNode {
            id: node_id(&node.id),
            attributes: vec![
                attr("label", quoted(&node.label)),
                attr("shape", plain(node.shape.as_str())),
                attr("fillcolor", quoted(style.fill_for_group(&node.group))),
            ],
        }));
    }

    for edge in graph.edges() {
        let attributes = edge
            .label
            .as_deref()
            .map(|label| vec![attr("label", quoted(label))])
            .unwrap_or_default();
        stmts.push(Stmt::Edge(DotEdge {
            ty: EdgeTy::Pair(
                Vertex::N(node_id(&edge.source)),
                Vertex::N(node_id(&edge.target)),
            ),
            attributes,
        }));
    }

    let dot = DotGraph::DiGraph {
        id: plain("flowchart"),
        strict: false,
        stmts,
    };
    graphviz_rust::print(dot, &mut PrinterContext::default())
}

fn attr(key: &str, value: Id) -> Attribute {
    Attribute(plain(key), value)
}

fn node_id(id: &str) -> NodeId {
    NodeId(quoted(id), None)
}

fn plain(value: &str) -> Id {
    Id::Plain(value.to_string())
}

fn quoted(value: &str) -> Id {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Id::Escaped(format!("\"{escaped}\""))
}
