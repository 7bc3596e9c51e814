//! The document style: the field tree as structured data.
//!
//! ```json
//! {
//!   "title": "Usage",
//!   "groups": [
//!     {
//!       "records": [
//!         { "Node": { "raw": "n1", "converted": "n1" },
//!           "Objects": { "raw": 5, "converted": "5" } },
//!         { "Node": { "raw": "n2", "converted": "n2" },
//!           "Objects": { "raw": null, "converted": "~~", "error": "timeout" } }
//!       ],
//!       "aggregates": { "Objects": { "raw": 5, "converted": "5" } }
//!     }
//!   ],
//!   "record_count": 2
//! }
//! ```
//!
//! Field titles are keys and composites nest. No layout is computed. When
//! siblings share a title, the later ones are keyed by their field key, or
//! by the title with a ` (n)` suffix if that key is taken too.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use super::{Rendered, StyleRenderer};
use crate::decl::SheetStyle;
use crate::error::SheetError;
use crate::sheet::{Cell, FieldNode, Sheet};
use crate::value::Datum;

/// Serializes a sheet into a [`serde_json::Value`] tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        DocumentRenderer
    }
}

impl StyleRenderer for DocumentRenderer {
    fn style(&self) -> SheetStyle {
        SheetStyle::Document
    }

    fn render(&self, sheet: &Sheet<'_>) -> Result<Rendered, SheetError> {
        if sheet.is_empty() {
            return Ok(Rendered::Document(Value::Object(Map::new())));
        }

        let fields = sheet.visible_fields();
        let with_aggregates = sheet.has_aggregates();

        let groups: Vec<Value> = sheet
            .group_sizes()
            .iter()
            .enumerate()
            .map(|(group, &size)| {
                let records: Vec<Value> = (0..size)
                    .map(|entry| Value::Object(record(fields, group, entry)))
                    .collect();
                let mut out = Map::new();
                out.insert("records".to_string(), Value::Array(records));
                if with_aggregates {
                    out.insert(
                        "aggregates".to_string(),
                        Value::Object(aggregates(fields, group)),
                    );
                }
                Value::Object(out)
            })
            .collect();

        let mut doc = Map::new();
        doc.insert("title".to_string(), json!(sheet.title()));
        if let Some(description) = sheet.description() {
            doc.insert("description".to_string(), json!(description));
        }
        doc.insert("groups".to_string(), Value::Array(groups));
        doc.insert("record_count".to_string(), json!(sheet.record_count()));

        Ok(Rendered::Document(Value::Object(doc)))
    }
}

/// One distinct document key per sibling, in field order.
fn document_names(fields: &[FieldNode]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    fields
        .iter()
        .map(|field| {
            let title = field.title();
            let name = if !taken.contains(title) {
                title.to_string()
            } else if !taken.contains(field.key()) {
                field.key().to_string()
            } else {
                (2..)
                    .map(|n| format!("{} ({})", title, n))
                    .find(|candidate| !taken.contains(candidate))
                    .unwrap_or_else(|| title.to_string())
            };
            taken.insert(name.clone());
            name
        })
        .collect()
}

fn record(fields: &[FieldNode], group: usize, entry: usize) -> Map<String, Value> {
    document_names(fields)
        .into_iter()
        .zip(fields)
        .filter_map(|(name, field)| {
            let value = match field {
                FieldNode::Leaf(leaf) => cell_value(leaf.entry(group, entry)?),
                FieldNode::Composite(composite) => {
                    Value::Object(record(&composite.children, group, entry))
                }
            };
            Some((name, value))
        })
        .collect()
}

fn aggregates(fields: &[FieldNode], group: usize) -> Map<String, Value> {
    document_names(fields)
        .into_iter()
        .zip(fields)
        .filter(|(_, field)| field.has_aggregate())
        .filter_map(|(name, field)| {
            let value = match field {
                FieldNode::Leaf(leaf) => cell_value(leaf.aggregate(group)?),
                FieldNode::Composite(composite) => {
                    Value::Object(aggregates(&composite.children, group))
                }
            };
            Some((name, value))
        })
        .collect()
}

fn cell_value(cell: &Cell) -> Value {
    let mut out = Map::new();
    let raw = match &cell.datum {
        Datum::Value(scalar) => scalar.to_json(),
        Datum::Missing | Datum::Unavailable(_) => Value::Null,
    };
    out.insert("raw".to_string(), raw);
    out.insert("converted".to_string(), json!(cell.text));
    if let Datum::Unavailable(reason) = &cell.datum {
        out.insert("error".to_string(), json!(reason));
    }
    if let Some(format) = &cell.format {
        out.insert("format".to_string(), json!(format.name));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Accessor, Aggregator, FieldDecl, Formatter, LeafDecl, SheetDecl};
    use crate::sheet::SheetOptions;
    use crate::value::{DataSources, NodeValue, Scalar};

    fn data() -> DataSources {
        DataSources::new().with_source(
            "s",
            [
                ("n1", NodeValue::from(json!({"objects": 5, "mem": {"used": 90}}))),
                ("n2", NodeValue::unavailable("timeout")),
            ],
        )
    }

    fn decl() -> SheetDecl {
        SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf(
                "Objects",
                LeafDecl::new(Accessor::number("s", ["objects"])).aggregate(Aggregator::Sum),
            ),
            FieldDecl::composite(
                "Memory",
                vec![FieldDecl::leaf(
                    "Used",
                    LeafDecl::new(Accessor::number("s", ["mem", "used"])).formatter(
                        Formatter::alert("high", |v, _| v.as_f64().is_some_and(|v| v > 80.0)),
                    ),
                )],
            ),
        ])
        .from_source("s")
    }

    fn render(decl: &SheetDecl) -> Value {
        let sheet = Sheet::build(decl, "Usage", None, &data(), &SheetOptions::default()).unwrap();
        match DocumentRenderer::new().render(&sheet).unwrap() {
            Rendered::Document(v) => v,
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn records_nest_composites_and_mark_unavailable() {
        let doc = render(&decl());
        let records = &doc["groups"][0]["records"];
        assert_eq!(records[0]["Node"], json!({"raw": "n1", "converted": "n1"}));
        assert_eq!(
            records[0]["Memory"]["Used"],
            json!({"raw": 90, "converted": "90", "format": "high"})
        );
        assert_eq!(
            records[1]["Objects"],
            json!({"raw": null, "converted": "~~", "error": "timeout"})
        );
        assert_eq!(doc["record_count"], json!(2));
        assert!(doc.get("description").is_none());
    }

    #[test]
    fn aggregates_are_a_separate_key() {
        let doc = render(&decl());
        let aggregates = &doc["groups"][0]["aggregates"];
        assert_eq!(aggregates["Objects"], json!({"raw": 5, "converted": "5"}));
        assert!(aggregates.get("Node").is_none());
        assert!(aggregates.get("Memory").is_none());
    }

    #[test]
    fn duplicate_titles_keep_every_field() {
        let data = DataSources::new().with_source(
            "s",
            [("n1", NodeValue::from(json!({"a": 1, "b": 2, "c": 3})))],
        );
        let used = |path: &str| {
            LeafDecl::new(Accessor::number("s", [path])).aggregate(Aggregator::Sum)
        };
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Used", used("a")).key("ua"),
            FieldDecl::leaf("Used", used("b")).key("ub"),
            FieldDecl::leaf("Used", used("c")).key("ub"),
        ])
        .from_source("s");
        let sheet = Sheet::build(&decl, "Usage", None, &data, &SheetOptions::default()).unwrap();
        let doc = match DocumentRenderer::new().render(&sheet).unwrap() {
            Rendered::Document(v) => v,
            other => panic!("unexpected output: {:?}", other),
        };

        let record = &doc["groups"][0]["records"][0];
        assert_eq!(record["Used"]["raw"], json!(1));
        assert_eq!(record["ub"]["raw"], json!(2));
        assert_eq!(record["Used (2)"]["raw"], json!(3));
        let aggregates = &doc["groups"][0]["aggregates"];
        assert_eq!(aggregates["ub"]["raw"], json!(2));
        assert_eq!(aggregates["Used (2)"]["raw"], json!(3));
    }

    #[test]
    fn empty_sheet_is_an_empty_document() {
        let decl = SheetDecl::new(vec![FieldDecl::leaf(
            "Nothing",
            LeafDecl::new(Accessor::value("s", ["nothing"])),
        )]);
        let data = DataSources::new().with_source("s", [("n1", Scalar::Int(1))]);
        let sheet = Sheet::build(&decl, "Usage", None, &data, &SheetOptions::default()).unwrap();
        assert_eq!(
            DocumentRenderer::new().render(&sheet).unwrap(),
            Rendered::Document(json!({}))
        );
    }
}
