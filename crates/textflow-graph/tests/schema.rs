use serde_json::{Value, json};
use textflow_graph::{
    DuplicateIds, Graph, SchemaOptions, Severity, Shape, UnknownFields, validate,
};

fn valid_document() -> Value {
    json!({
        "nodes": [
            {"id": "A", "label": "Start"},
            {"id": "B", "label": "End", "shape": "ellipse"}
        ],
        "edges": [
            {"source": "A", "target": "B", "label": "connects"}
        ],
        "layout": {"direction": "LR"}
    })
}

fn chain_document(count: usize) -> Value {
    let nodes: Vec<Value> = (0..count)
        .map(|index| json!({"id": format!("n{index}"), "label": format!("Step {index}")}))
        .collect();
    let edges: Vec<Value> = (1..count)
        .map(|index| json!({"source": format!("n{}", index - 1), "target": format!("n{index}")}))
        .collect();
    json!({"nodes": nodes, "edges": edges})
}

#[test]
fn validate_valid_document_expected_fields_preserved() {
    let graph = Graph::from_value(&valid_document()).expect("graph should validate");

    assert_eq!(graph.nodes().len(), 2);
    assert_eq!(graph.nodes()[0].id, "A");
    assert_eq!(graph.nodes()[1].shape, Shape::Ellipse);
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edges()[0].label.as_deref(), Some("connects"));
    assert_eq!(graph.layout().direction.as_str(), "LR");
}

#[test]
fn validate_reserialized_graph_expected_idempotent() {
    let first = Graph::from_value(&valid_document()).expect("graph should validate");
    let value = first.to_value().expect("graph should serialize");
    let second = Graph::from_value(&value).expect("serialized graph should validate");

    assert_eq!(first, second);
    assert_eq!(value, second.to_value().expect("graph should serialize"));
}

#[test]
fn validate_empty_nodes_expected_error() {
    let error = Graph::from_value(&json!({"nodes": [], "edges": []})).unwrap_err();
    assert!(error.has_path("nodes"));
    assert!(error.to_string().contains("at least 1 item"));
}

#[test]
fn validate_missing_nodes_expected_field_required() {
    let error = Graph::from_value(&json!({"edges": []})).unwrap_err();
    assert!(error.to_string().contains("nodes: field required"));
}

#[test]
fn validate_node_count_bounds_expected_100_ok_101_rejected() {
    let graph = Graph::from_value(&chain_document(100)).expect("100 nodes should validate");
    assert_eq!(graph.nodes().len(), 100);

    let error = Graph::from_value(&chain_document(101)).unwrap_err();
    assert!(error.has_path("nodes"));
    assert!(error.to_string().contains("at most 100 items"));
}

#[test]
fn validate_dangling_edge_target_expected_reference_named() {
    let mut document = valid_document();
    document["edges"][0]["target"] = json!("Z");

    let error = Graph::from_value(&document).unwrap_err();
    assert!(error.has_path("edges.0.target"));
    assert!(
        error
            .to_string()
            .contains("edge target 'Z' does not match any node id")
    );
}

#[test]
fn validate_dangling_source_and_target_expected_both_reported() {
    let mut document = valid_document();
    document["edges"][0]["source"] = json!("X");
    document["edges"][0]["target"] = json!("Y");

    let error = Graph::from_value(&document).unwrap_err();
    assert_eq!(error.errors_count, 2);
    assert!(error.has_path("edges.0.source"));
    assert!(error.has_path("edges.0.target"));
}

#[test]
fn validate_unknown_shape_expected_rejected_not_coerced() {
    let mut document = valid_document();
    document["nodes"][0]["shape"] = json!("hexagon");

    let error = Graph::from_value(&document).unwrap_err();
    assert!(error.has_path("nodes.0.shape"));
    assert!(error.to_string().contains("got 'hexagon'"));
}

#[test]
fn validate_unknown_direction_expected_rejected() {
    let mut document = valid_document();
    document["layout"]["direction"] = json!("UP");

    let error = Graph::from_value(&document).unwrap_err();
    assert!(error.has_path("layout.direction"));
}

#[test]
fn validate_defaults_expected_box_default_group_and_tb() {
    let graph = Graph::from_value(&json!({
        "nodes": [{"id": "1", "label": "Only ID and Label"}]
    }))
    .expect("graph should validate");

    assert_eq!(graph.nodes()[0].shape, Shape::Box);
    assert_eq!(graph.nodes()[0].group, "default");
    assert_eq!(graph.layout().direction.as_str(), "TB");
    assert!(graph.edges().is_empty());
}

#[test]
fn validate_multiple_failures_expected_every_path_reported() {
    let error = Graph::from_value(&json!({
        "nodes": [
            {"id": "A"},
            {"id": "B", "label": "x".repeat(101), "shape": "star"},
            "not a node"
        ],
        "edges": [{"source": "A", "target": "B", "label": "y".repeat(51)}],
        "layout": {"direction": 3}
    }))
    .unwrap_err();

    for path in [
        "nodes.0.label",
        "nodes.1.label",
        "nodes.1.shape",
        "nodes.2",
        "edges.0.label",
        "layout.direction",
    ] {
        assert!(error.has_path(path), "missing {path} in:\n{error}");
    }
    assert_eq!(error.errors_count, 6);
    assert_eq!(error.to_string().lines().count(), 7);
}

#[test]
fn validate_null_edge_label_expected_none() {
    let graph = Graph::from_value(&json!({
        "nodes": [{"id": "A", "label": "a"}, {"id": "B", "label": "b"}],
        "edges": [{"source": "A", "target": "B", "label": null}]
    }))
    .expect("graph should validate");
    assert_eq!(graph.edges()[0].label, None);
}

#[test]
fn validate_duplicate_ids_default_expected_rejected() {
    let error = Graph::from_value(&json!({
        "nodes": [{"id": "A", "label": "one"}, {"id": "A", "label": "two"}]
    }))
    .unwrap_err();
    assert!(error.has_path("nodes.1.id"));
    assert!(error.to_string().contains("first used by nodes.0"));
}

#[test]
fn validate_duplicate_ids_allowed_expected_ok() {
    let options = SchemaOptions {
        duplicate_ids: DuplicateIds::Allow,
        ..SchemaOptions::default()
    };
    let validated = validate(
        &json!({"nodes": [{"id": "A", "label": "one"}, {"id": "A", "label": "two"}]}),
        &options,
    )
    .expect("duplicates should be accepted when allowed");
    assert_eq!(validated.graph.nodes().len(), 2);
}

#[test]
fn validate_extra_fields_lenient_expected_ignored() {
    let mut document = valid_document();
    document["title"] = json!("Auth flow");
    document["nodes"][0]["color"] = json!("red");

    let graph = Graph::from_value(&document).expect("extra fields are ignored by default");
    let value = graph.to_value().expect("graph should serialize");
    assert!(value.get("title").is_none());
    assert!(value["nodes"][0].get("color").is_none());
}

#[test]
fn validate_extra_fields_strict_expected_rejected() {
    let mut document = valid_document();
    document["title"] = json!("Auth flow");
    document["nodes"][0]["color"] = json!("red");

    let options = SchemaOptions {
        unknown_fields: UnknownFields::Reject,
        ..SchemaOptions::default()
    };
    let error = validate(&document, &options).unwrap_err();
    assert!(error.has_path("title"));
    assert!(error.has_path("nodes.0.color"));
    let strict = validate(&valid_document(), &SchemaOptions::strict())
        .expect("a clean document passes strict mode");
    assert_eq!(strict.graph.nodes().len(), 2);
}

#[test]
fn validate_warnings_expected_attached_not_rejected() {
    let validated = validate(
        &json!({
            "nodes": [
                {"id": "A", "label": "a label that is far too long to read"},
                {"id": "B", "label": "b"}
            ],
            "edges": [{"source": "A", "target": "B"}]
        }),
        &SchemaOptions::default(),
    )
    .expect("warnings must not reject");

    assert_eq!(validated.warnings.len(), 1);
    assert_eq!(validated.warnings[0].severity, Severity::Warning);
    assert_eq!(validated.warnings[0].rule, "label_word_count");
}

#[test]
fn from_json_str_invalid_schema_expected_validation_error() {
    let error = Graph::from_json_str(r#"{"nodes": [{"id": "C"}]}"#).unwrap_err();
    assert!(matches!(error, textflow_graph::GraphError::Validation(_)));
    assert!(error.to_string().contains("nodes.0.label: field required"));
}
