use crate::{Diagnostic, Graph, Shape};

pub const LABEL_WORD_SOFT_LIMIT: usize = 6;
pub const NODE_COUNT_SOFT_CAP: usize = 40;

/// An advisory check. Lint rules never reject a graph; their diagnostics are
/// reported as warnings next to a validated graph.
pub trait LintRule {
    fn name(&self) -> &str;
    fn apply(&self, graph: &Graph) -> Vec<Diagnostic>;
}

pub fn lint(graph: &Graph, extra_rules: &[&dyn LintRule]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    diagnostics.extend(rule_label_word_count(graph));
    diagnostics.extend(rule_node_count_soft_cap(graph));
    diagnostics.extend(rule_isolated_node(graph));
    diagnostics.extend(rule_decision_branches(graph));

    for rule in extra_rules {
        diagnostics.extend(rule.apply(graph));
    }

    diagnostics
}

fn rule_label_word_count(graph: &Graph) -> Vec<Diagnostic> {
    graph
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(index, node)| {
            let words = node.label.split_whitespace().count();
            (words > LABEL_WORD_SOFT_LIMIT).then(|| {
                Diagnostic::warning(
                    "label_word_count",
                    format!("nodes.{index}.label"),
                    format!("label has {words} words; keep it under {LABEL_WORD_SOFT_LIMIT}"),
                )
                .with_node_id(node.id.clone())
            })
        })
        .collect()
}

fn rule_node_count_soft_cap(graph: &Graph) -> Vec<Diagnostic> {
    let count = graph.nodes().len();
    if count <= NODE_COUNT_SOFT_CAP {
        return Vec::new();
    }
    vec![Diagnostic::warning(
        "node_count_soft_cap",
        "nodes",
        format!("graph has {count} nodes; more than {NODE_COUNT_SOFT_CAP} is hard to read"),
    )]
}

fn rule_isolated_node(graph: &Graph) -> Vec<Diagnostic> {
    if graph.nodes().len() < 2 {
        return Vec::new();
    }

    let mut diagnostics = Vec::new();
    for (index, node) in graph.nodes().iter().enumerate() {
        let connected = graph.outgoing_edges(&node.id).next().is_some()
            || graph.incoming_edges(&node.id).next().is_some();
        if !connected {
            diagnostics.push(
                Diagnostic::warning(
                    "isolated_node",
                    format!("nodes.{index}"),
                    "node is not connected to any edge",
                )
                .with_node_id(node.id.clone()),
            );
        }
    }
    diagnostics
}

fn rule_decision_branches(graph: &Graph) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (index, node) in graph.nodes().iter().enumerate() {
        if node.shape != Shape::Diamond {
            continue;
        }
        let branches = graph.outgoing_edges(&node.id).count();
        if branches < 2 {
            diagnostics.push(
                Diagnostic::warning(
                    "decision_branches",
                    format!("nodes.{index}"),
                    format!("decision node has {branches} outgoing edge(s); expected at least 2"),
                )
                .with_node_id(node.id.clone()),
            );
        }
    }
    diagnostics
}
