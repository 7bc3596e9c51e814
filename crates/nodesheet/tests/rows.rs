//! Row style output.

use nodesheet::{
    render, Accessor, Aggregator, DataSources, FieldDecl, LeafDecl, NodeValue, RenderConfig,
    RenderRequest, SheetDecl, SheetStyle, TextMode,
};
use serde_json::json;

fn rows(decl: &SheetDecl, sources: &DataSources) -> String {
    let config = RenderConfig::new().text_mode(TextMode::Plain);
    render(decl, "Usage", sources, &config, RenderRequest::new().style(SheetStyle::Rows))
        .unwrap()
        .as_text()
        .unwrap()
        .to_string()
}

fn sources() -> DataSources {
    DataSources::new().with_source(
        "ns",
        [
            (
                "n1",
                NodeValue::from(json!({"bar": {"objects": 10}, "test": {"objects": 2000}})),
            ),
            ("n2", NodeValue::from(json!({"test": {"objects": 3}}))),
        ],
    )
}

#[test]
fn one_line_per_field_with_group_aggregates() {
    let decl = SheetDecl::new(vec![
        FieldDecl::leaf("Namespace", LeafDecl::new(Accessor::entry_key())),
        FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
        FieldDecl::leaf(
            "Objects",
            LeafDecl::new(Accessor::number("ns", ["objects"]).keyed()).aggregate(Aggregator::Sum),
        ),
    ])
    .from_source("ns")
    .entries(nodesheet::EntrySource::PerKey {
        source: "ns".to_string(),
        path: Vec::new(),
    })
    .group_by(["Namespace"]);

    let out = rows(&decl, &sources());
    let lines: Vec<&str> = out.lines().collect();

    // Columns: bar/n1 | bar aggregate | test/n1 | test/n2 | test aggregate.
    assert_eq!(lines[1], "Namespace bar    test test     ");
    assert_eq!(lines[2], "Node      n1     n1   n2       ");
    assert_eq!(lines[3], "Objects    10 10 2000    3 2003");
    assert_eq!(lines[4], "Number of rows: 3");
    assert_eq!(lines.len(), 5);
}

#[test]
fn every_line_has_the_same_width() {
    let decl = SheetDecl::new(vec![
        FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
        FieldDecl::composite(
            "Namespaces",
            vec![
                FieldDecl::leaf("bar", LeafDecl::new(Accessor::number("ns", ["bar", "objects"]))),
                FieldDecl::leaf("test", LeafDecl::new(Accessor::number("ns", ["test", "objects"]))),
            ],
        ),
    ])
    .from_source("ns");

    let out = rows(&decl, &sources());
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[2], "Namespaces");
    assert!(lines[3].starts_with("  bar "));
    assert!(lines[3].ends_with("--"));

    let leaf_lines = [lines[1], lines[3], lines[4]];
    let width = leaf_lines[0].chars().count();
    assert!(leaf_lines.iter().all(|l| l.chars().count() == width));
}

#[test]
fn unavailable_nodes_show_markers_in_place() {
    let decl = SheetDecl::new(vec![
        FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
        FieldDecl::leaf("Objects", LeafDecl::new(Accessor::number("ns", ["test", "objects"]))),
    ])
    .from_source("ns");
    let sources = DataSources::new().with_source(
        "ns",
        [
            ("n1", NodeValue::from(json!({"test": {"objects": 1}}))),
            ("n2", NodeValue::unavailable("timeout")),
        ],
    );

    let out = rows(&decl, &sources);
    assert!(out.lines().nth(2).unwrap().ends_with("~~"));
}

#[test]
fn empty_rows_render_nothing() {
    let decl = SheetDecl::new(vec![FieldDecl::leaf(
        "Objects",
        LeafDecl::new(Accessor::number("ns", ["nothing"])),
    )])
    .from_source("ns");
    assert_eq!(rows(&decl, &sources()), "");
}
