//! The base orchestrator: binds a declaration to data.
//!
//! [`Sheet::build`] runs the whole data pipeline for one render call:
//!
//! 1. enumerate entries (one per node, or one per key within each node),
//! 2. project every declared field, expanding dynamic fields from data and
//!    filtering them with selectors,
//! 3. sort entries by group key then order key and split them into groups,
//! 4. drop hidden fields (declared hidden, empty, or uniform in diff mode),
//! 5. convert values to display cells and compute per-group aggregates.
//!
//! The result is a tree of visible [`FieldNode`]s. Text renderers then run
//! [`layout::prepare`] over it; the document renderer uses it as is.

pub mod field;
pub mod layout;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::decl::{
    Accessor, Aggregator, DynamicDecl, EntryContext, EntrySource, FieldDecl, FieldKind, Hidden,
    LeafDecl, Projection, SheetDecl,
};
use crate::error::SheetError;
use crate::value::{CommonContext, DataSources, Datum, NodeId, NodeValue, Scalar};

pub use field::{
    Cell, CellFormat, CompositeField, Field, FieldNode, MISSING_MARKER, UNAVAILABLE_MARKER,
};
pub use layout::Layout;

/// Per-call options that shape which fields are visible.
#[derive(Clone, Debug, Default)]
pub struct SheetOptions {
    pub common: CommonContext,
    /// Regular expressions selecting dynamic sub-fields by key.
    pub selectors: Option<Vec<String>>,
    /// Keep only numeric dynamic sub-fields and show just their per-group
    /// sums.
    pub dynamic_aggregate: bool,
    /// Hide dynamic sub-fields whose value is the same for every entry.
    pub dynamic_diff: bool,
}

/// One row of data before grouping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub node: NodeId,
    pub key: Option<String>,
}

/// A declaration bound to data, with its visible field tree.
#[derive(Debug)]
pub struct Sheet<'d> {
    decl: &'d SheetDecl,
    title: String,
    description: Option<String>,
    fields: Vec<FieldNode>,
    group_sizes: Vec<usize>,
}

impl<'d> Sheet<'d> {
    /// Builds the visible field tree for one render call.
    pub fn build(
        decl: &'d SheetDecl,
        title: impl Into<String>,
        description: Option<String>,
        sources: &DataSources,
        options: &SheetOptions,
    ) -> Result<Self, SheetError> {
        let selectors = compile_selectors(options.selectors.as_deref())?;
        let entries = enumerate_entries(decl, sources);
        let entry_path: &[String] = match &decl.entries {
            EntrySource::PerKey { path, .. } => path,
            _ => &[],
        };
        let contexts: Vec<EntryContext<'_>> = entries
            .iter()
            .map(|e| EntryContext {
                node: &e.node,
                key: e.key.as_deref(),
                entry_path,
                common: &options.common,
                sources,
            })
            .collect();

        let projector = Projector {
            contexts: &contexts,
            selectors: &selectors,
            dynamic_aggregate: options.dynamic_aggregate,
        };
        let projected: Vec<Projected> = decl
            .fields
            .iter()
            .flat_map(|f| projector.project(f))
            .collect();

        let group_cols = key_columns(&projected, &decl.group_by, "group-by")?;
        let order_cols = key_columns(&projected, &decl.order_by, "order-by")?;

        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| {
            compare_keys(&group_cols, a, b).then_with(|| compare_keys(&order_cols, a, b))
        });
        let group_sizes = split_groups(&order, &group_cols);

        let binder = Binder {
            decl,
            contexts: &contexts,
            order: &order,
            group_sizes: &group_sizes,
            diff: options.dynamic_diff || decl.dynamic_diff,
        };
        let fields = projected
            .into_iter()
            .filter_map(|p| binder.bind(p))
            .collect();

        Ok(Sheet {
            decl,
            title: title.into(),
            description,
            fields,
            group_sizes,
        })
    }

    pub fn decl(&self) -> &'d SheetDecl {
        self.decl
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Top-level visible fields.
    pub fn visible_fields(&self) -> &[FieldNode] {
        &self.fields
    }

    /// Total entries across all groups.
    pub fn record_count(&self) -> usize {
        self.group_sizes.iter().sum()
    }

    pub fn group_count(&self) -> usize {
        self.group_sizes.len()
    }

    pub fn group_sizes(&self) -> &[usize] {
        &self.group_sizes
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when any visible field renders an aggregate row.
    pub fn has_aggregates(&self) -> bool {
        self.fields.iter().any(FieldNode::has_aggregate)
    }

    pub fn separator(&self) -> &str {
        &self.decl.separator
    }

    /// Runs the two-phase layout over the visible fields.
    pub fn layout(&self) -> Vec<Layout> {
        layout::prepare(
            &self.fields,
            crate::text::display_width(&self.decl.separator),
        )
    }
}

fn compile_selectors(selectors: Option<&[String]>) -> Result<Option<Vec<Regex>>, SheetError> {
    let Some(patterns) = selectors else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| SheetError::InvalidSelector {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn node_entries(nodes: BTreeSet<&NodeId>) -> Vec<Entry> {
    nodes
        .into_iter()
        .map(|node| Entry {
            node: node.clone(),
            key: None,
        })
        .collect()
}

fn enumerate_entries(decl: &SheetDecl, sources: &DataSources) -> Vec<Entry> {
    match &decl.entries {
        EntrySource::Nodes => {
            let names: Vec<&str> = if decl.from_sources.is_empty() {
                sources.names().collect()
            } else {
                decl.from_sources.iter().map(String::as_str).collect()
            };
            let nodes = names
                .into_iter()
                .filter_map(|name| sources.source(name))
                .flat_map(|nodes| nodes.keys())
                .collect();
            node_entries(nodes)
        }
        EntrySource::NodesOf(source) => node_entries(
            sources
                .source(source)
                .map(|nodes| nodes.keys().collect())
                .unwrap_or_default(),
        ),
        EntrySource::PerKey { source, path } => {
            let Some(nodes) = sources.source(source) else {
                return Vec::new();
            };
            let mut entries = Vec::new();
            for (node, value) in nodes {
                match per_key_target(value, path) {
                    KeyTarget::Keys(map) => entries.extend(map.keys().map(|key| Entry {
                        node: node.clone(),
                        key: Some(key.clone()),
                    })),
                    KeyTarget::Node => entries.push(Entry {
                        node: node.clone(),
                        key: None,
                    }),
                    KeyTarget::Absent => {}
                }
            }
            entries
        }
    }
}

enum KeyTarget<'a> {
    /// One entry per key of this map.
    Keys(&'a BTreeMap<String, NodeValue>),
    /// A single key-less entry, so an unavailable node shows up in place.
    Node,
    /// The node has nothing at the path.
    Absent,
}

fn per_key_target<'a>(value: &'a NodeValue, path: &[String]) -> KeyTarget<'a> {
    let mut current = value;
    for step in path {
        match current {
            NodeValue::Map(map) => match map.get(step) {
                Some(next) => current = next,
                None => return KeyTarget::Absent,
            },
            NodeValue::Unavailable(_) => return KeyTarget::Node,
            NodeValue::Scalar(_) => return KeyTarget::Absent,
        }
    }
    match current {
        NodeValue::Map(map) => KeyTarget::Keys(map),
        NodeValue::Unavailable(_) | NodeValue::Scalar(_) => KeyTarget::Node,
    }
}

/// A field projected over every entry, before grouping and conversion.
enum Projected {
    Leaf(ProjectedLeaf),
    Composite {
        title: String,
        key: String,
        children: Vec<Projected>,
    },
}

struct ProjectedLeaf {
    title: String,
    key: String,
    decl: LeafDecl,
    min_title_width: usize,
    /// One datum per entry, in enumeration order.
    data: Vec<Datum>,
    dynamic: bool,
    /// Entry cells are blanked once the aggregates are computed.
    aggregate_only: bool,
}

impl Projected {
    fn find_leaf(&self, key: &str) -> Option<&ProjectedLeaf> {
        match self {
            Projected::Leaf(leaf) if leaf.key == key => Some(leaf),
            Projected::Leaf(_) => None,
            Projected::Composite { children, .. } => {
                children.iter().find_map(|c| c.find_leaf(key))
            }
        }
    }
}

struct Projector<'c, 'a> {
    contexts: &'c [EntryContext<'a>],
    selectors: &'c Option<Vec<Regex>>,
    dynamic_aggregate: bool,
}

impl Projector<'_, '_> {
    fn project(&self, field: &FieldDecl) -> Vec<Projected> {
        match &field.kind {
            FieldKind::Leaf(leaf) => vec![Projected::Leaf(ProjectedLeaf {
                title: field.title.clone(),
                key: field.key.clone(),
                decl: leaf.clone(),
                min_title_width: field.min_title_width(),
                data: self
                    .contexts
                    .iter()
                    .map(|ctx| leaf.accessor.project(ctx))
                    .collect(),
                dynamic: false,
                aggregate_only: false,
            })],
            FieldKind::Composite(children) => vec![Projected::Composite {
                title: field.title.clone(),
                key: field.key.clone(),
                children: children.iter().flat_map(|c| self.project(c)).collect(),
            }],
            FieldKind::Dynamic(dynamic) => {
                let children = self.project_dynamic(dynamic);
                if field.title.is_empty() {
                    children
                } else {
                    vec![Projected::Composite {
                        title: field.title.clone(),
                        key: field.key.clone(),
                        children,
                    }]
                }
            }
        }
    }

    fn project_dynamic(&self, dynamic: &DynamicDecl) -> Vec<Projected> {
        let keys: BTreeSet<&String> = self
            .contexts
            .iter()
            .filter_map(|ctx| dynamic_map(dynamic, ctx))
            .flat_map(|map| map.keys())
            .collect();

        keys.into_iter()
            .filter(|key| self.selected(key))
            .filter_map(|key| self.project_dynamic_key(dynamic, key))
            .map(Projected::Leaf)
            .collect()
    }

    fn selected(&self, key: &str) -> bool {
        match self.selectors {
            Some(selectors) => selectors.iter().any(|re| re.is_match(key)),
            None => true,
        }
    }

    fn project_dynamic_key(&self, dynamic: &DynamicDecl, key: &str) -> Option<ProjectedLeaf> {
        let mut path = dynamic.path.clone();
        path.push(key.to_string());
        let accessor = Accessor::value(dynamic.source.clone(), path);
        let accessor = if dynamic.keyed {
            accessor.keyed()
        } else {
            accessor
        };

        let raw: Vec<Datum> = self.contexts.iter().map(|ctx| accessor.project(ctx)).collect();
        let values: Vec<&Scalar> = raw.iter().filter_map(Datum::as_value).collect();
        let numeric = !values.is_empty() && values.iter().all(|v| v.to_number().is_some());

        if self.dynamic_aggregate && !numeric {
            return None;
        }

        let (data, projection) = if numeric {
            let data: Vec<Datum> = raw.into_iter().map(|d| Projection::Number.apply(d)).collect();
            (data, Projection::Number)
        } else {
            (raw, Projection::Any)
        };

        let mut decl = LeafDecl::new(accessor)
            .converter(dynamic.converter.clone())
            .align(projection.default_align());
        if self.dynamic_aggregate {
            decl = decl.aggregate(Aggregator::Sum);
        }

        Some(ProjectedLeaf {
            title: key.to_string(),
            key: key.to_string(),
            min_title_width: crate::text::longest_word(key),
            decl,
            data,
            dynamic: true,
            aggregate_only: self.dynamic_aggregate,
        })
    }
}

fn dynamic_map<'a>(
    dynamic: &DynamicDecl,
    ctx: &EntryContext<'a>,
) -> Option<&'a BTreeMap<String, NodeValue>> {
    let root = ctx.sources.node(&dynamic.source, ctx.node)?;
    let target = match (dynamic.keyed, ctx.key) {
        (true, Some(key)) => root
            .descend(ctx.entry_path)?
            .descend(&[key])?
            .descend(dynamic.path.as_slice())?,
        _ => root.descend(dynamic.path.as_slice())?,
    };
    target.as_map()
}

fn key_columns<'p>(
    projected: &'p [Projected],
    keys: &[String],
    role: &'static str,
) -> Result<Vec<&'p [Datum]>, SheetError> {
    keys.iter()
        .map(|key| {
            projected
                .iter()
                .find_map(|p| p.find_leaf(key))
                .map(|leaf| leaf.data.as_slice())
                .ok_or_else(|| SheetError::UnknownField {
                    key: key.clone(),
                    role,
                })
        })
        .collect()
}

fn compare_keys(columns: &[&[Datum]], a: usize, b: usize) -> Ordering {
    columns
        .iter()
        .map(|col| col[a].sort_cmp(&col[b]))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Sizes of the contiguous runs of equal group keys in `order`.
fn split_groups(order: &[usize], group_cols: &[&[Datum]]) -> Vec<usize> {
    let mut sizes: Vec<usize> = Vec::new();
    let mut previous: Option<usize> = None;

    for &index in order {
        match previous {
            Some(prev) if compare_keys(group_cols, prev, index) == Ordering::Equal => {
                if let Some(last) = sizes.last_mut() {
                    *last += 1;
                }
            }
            _ => sizes.push(1),
        }
        previous = Some(index);
    }

    sizes
}

/// Turns projected fields into visible, converted, grouped fields.
struct Binder<'b, 'a> {
    decl: &'b SheetDecl,
    contexts: &'b [EntryContext<'a>],
    order: &'b [usize],
    group_sizes: &'b [usize],
    diff: bool,
}

impl Binder<'_, '_> {
    fn bind(&self, projected: Projected) -> Option<FieldNode> {
        match projected {
            Projected::Leaf(leaf) => self.bind_leaf(leaf).map(FieldNode::Leaf),
            Projected::Composite {
                title,
                key,
                children,
            } => {
                let children: Vec<FieldNode> =
                    children.into_iter().filter_map(|c| self.bind(c)).collect();
                if children.is_empty() {
                    None
                } else {
                    Some(FieldNode::Composite(CompositeField {
                        title,
                        key,
                        children,
                    }))
                }
            }
        }
    }

    fn bind_leaf(&self, leaf: ProjectedLeaf) -> Option<Field> {
        match leaf.decl.hidden {
            Hidden::Always => return None,
            Hidden::WhenEmpty if leaf.data.iter().all(Datum::is_missing) => return None,
            _ => {}
        }

        let cells: Vec<Cell> = self
            .order
            .iter()
            .map(|&i| self.cell(&leaf.decl, &leaf.data[i], &self.contexts[i]))
            .collect();

        if leaf.dynamic && self.diff && is_uniform(&cells) {
            return None;
        }

        let mut groups = Vec::with_capacity(self.group_sizes.len());
        let mut remaining = cells.into_iter();
        for &size in self.group_sizes {
            groups.push(remaining.by_ref().take(size).collect::<Vec<_>>());
        }

        let aggregates = match &leaf.decl.aggregate {
            Some(aggregator) if !self.decl.disable_aggregations => {
                Some(self.aggregates(&leaf.decl, aggregator, &groups))
            }
            _ => None,
        };

        if leaf.aggregate_only && aggregates.is_some() {
            for cell in groups.iter_mut().flatten() {
                *cell = Cell::empty();
            }
        }

        Some(Field {
            align: leaf.decl.effective_align(),
            is_grouped_by: self.decl.group_by.contains(&leaf.key),
            is_ordered_by: self.decl.order_by.contains(&leaf.key),
            title: leaf.title,
            key: leaf.key,
            min_title_width: leaf.min_title_width,
            groups,
            aggregates,
        })
    }

    fn cell(&self, decl: &LeafDecl, datum: &Datum, ctx: &EntryContext<'_>) -> Cell {
        let (text, format) = match datum {
            Datum::Value(value) => {
                let format = decl
                    .formatters
                    .iter()
                    .find(|f| f.matches(value, ctx))
                    .map(|f| CellFormat {
                        name: f.name().to_string(),
                        style: f.style().to_string(),
                    });
                (decl.converter.convert(value), format)
            }
            Datum::Missing => (MISSING_MARKER.to_string(), None),
            Datum::Unavailable(_) => (UNAVAILABLE_MARKER.to_string(), None),
        };
        Cell {
            datum: datum.clone(),
            text,
            format,
        }
    }

    fn aggregates(
        &self,
        decl: &LeafDecl,
        aggregator: &Aggregator,
        groups: &[Vec<Cell>],
    ) -> Vec<Cell> {
        groups
            .iter()
            .map(|group| {
                let values: Vec<Scalar> = group
                    .iter()
                    .filter_map(|c| c.datum.as_value().cloned())
                    .collect();
                match aggregator.aggregate(&values) {
                    Some(value) => Cell {
                        text: decl.converter.convert(&value),
                        datum: Datum::Value(value),
                        format: None,
                    },
                    None => Cell::empty(),
                }
            })
            .collect()
    }
}

/// Uniform when every entry holding a value converts to the same text.
/// Missing and unavailable entries do not take part; with none left the
/// field is kept.
fn is_uniform(cells: &[Cell]) -> bool {
    let mut texts = cells
        .iter()
        .filter(|c| c.datum.as_value().is_some())
        .map(|c| c.text.as_str());
    match texts.next() {
        Some(first) => texts.all(|t| t == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sources() -> DataSources {
        DataSources::new().with_source(
            "stats",
            [
                ("n1", NodeValue::from(json!({"objects": 10, "rack": 1, "bins": {"a": 1, "b": "x"}}))),
                ("n2", NodeValue::from(json!({"objects": 30, "rack": 0, "bins": {"a": 1, "b": "y"}}))),
                ("n3", NodeValue::unavailable("timeout")),
            ],
        )
    }

    fn basic_decl() -> SheetDecl {
        SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf(
                "Objects",
                LeafDecl::new(Accessor::number("stats", ["objects"])).aggregate(Aggregator::Sum),
            ),
        ])
        .from_source("stats")
    }

    fn leaf<'s>(sheet: &'s Sheet<'_>, key: &str) -> &'s Field {
        sheet
            .visible_fields()
            .iter()
            .flat_map(FieldNode::leaves)
            .find(|f| f.key == key)
            .expect("field not visible")
    }

    #[test]
    fn builds_one_entry_per_node() {
        let decl = basic_decl();
        let sheet = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap();
        assert_eq!(sheet.record_count(), 3);
        assert_eq!(sheet.group_count(), 1);
        let objects = leaf(&sheet, "Objects");
        let texts: Vec<&str> = objects.cells().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["10", "30", UNAVAILABLE_MARKER]);
    }

    #[test]
    fn aggregates_skip_unavailable_entries() {
        let decl = basic_decl();
        let sheet = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap();
        let objects = leaf(&sheet, "Objects");
        assert_eq!(objects.aggregate(0).map(|c| c.text.as_str()), Some("40"));
        assert!(sheet.has_aggregates());
    }

    #[test]
    fn disable_aggregations_drops_aggregate_rows() {
        let decl = basic_decl().disable_aggregations();
        let sheet = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap();
        assert!(!sheet.has_aggregates());
    }

    #[test]
    fn group_by_splits_contiguous_groups() {
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf("Rack", LeafDecl::new(Accessor::number("stats", ["rack"]))),
        ])
        .from_source("stats")
        .group_by(["Rack"]);
        let sheet = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap();
        assert_eq!(sheet.group_sizes(), &[1, 1, 1]);
        let node = leaf(&sheet, "Node");
        assert_eq!(node.entry(0, 0).map(|c| c.text.as_str()), Some("n2"));
        assert_eq!(node.entry(1, 0).map(|c| c.text.as_str()), Some("n1"));
        assert!(leaf(&sheet, "Rack").is_grouped_by);
    }

    #[test]
    fn order_by_sorts_within_groups() {
        let decl = basic_decl().order_by(["Objects"]);
        let sheet = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap();
        let node = leaf(&sheet, "Node");
        let nodes: Vec<&str> = node.cells().map(|c| c.text.as_str()).collect();
        assert_eq!(nodes, vec!["n1", "n2", "n3"]);
        assert!(leaf(&sheet, "Objects").is_ordered_by);
    }

    #[test]
    fn unknown_group_key_is_an_error() {
        let decl = basic_decl().group_by(["Nope"]);
        let err = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap_err();
        assert!(matches!(err, SheetError::UnknownField { role: "group-by", .. }));
    }

    #[test]
    fn empty_fields_are_hidden_by_default() {
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf("Nothing", LeafDecl::new(Accessor::number("stats", ["nothing"]))),
            FieldDecl::leaf(
                "Shown",
                LeafDecl::new(Accessor::number("stats", ["nothing"])).hidden(Hidden::Never),
            ),
        ])
        .from_source("stats");
        let data = DataSources::new().with_source(
            "stats",
            [("n1", NodeValue::from(json!({"objects": 1})))],
        );
        let sheet = Sheet::build(&decl, "t", None, &data, &SheetOptions::default()).unwrap();
        let keys: Vec<&str> = sheet.visible_fields().iter().map(FieldNode::key).collect();
        assert_eq!(keys, vec!["Node", "Shown"]);
    }

    #[test]
    fn dynamic_fields_follow_data_and_selectors() {
        let decl = SheetDecl::new(vec![FieldDecl::dynamic("Bins", DynamicDecl::new("stats", ["bins"]))])
            .from_source("stats");
        let sheet = Sheet::build(&decl, "t", None, &sources(), &SheetOptions::default()).unwrap();
        assert_eq!(leaf(&sheet, "a").align, crate::decl::Align::Right);
        assert_eq!(leaf(&sheet, "b").align, crate::decl::Align::Left);

        let options = SheetOptions {
            selectors: Some(vec!["^b$".to_string()]),
            ..Default::default()
        };
        let sheet = Sheet::build(&decl, "t", None, &sources(), &options).unwrap();
        let leaves: Vec<&str> = sheet.visible_fields()[0]
            .leaves()
            .into_iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(leaves, vec!["b"]);
    }

    #[test]
    fn dynamic_diff_hides_uniform_fields() {
        let decl = SheetDecl::new(vec![FieldDecl::dynamic("Bins", DynamicDecl::new("stats", ["bins"]))])
            .from_source("stats");
        let options = SheetOptions {
            dynamic_diff: true,
            ..Default::default()
        };
        let sheet = Sheet::build(&decl, "t", None, &sources(), &options).unwrap();
        let leaves: Vec<&str> = sheet.visible_fields()[0]
            .leaves()
            .into_iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(leaves, vec!["b"]);
    }

    #[test]
    fn dynamic_aggregate_keeps_numeric_and_sums() {
        let decl = SheetDecl::new(vec![FieldDecl::dynamic("Bins", DynamicDecl::new("stats", ["bins"]))])
            .from_source("stats");
        let options = SheetOptions {
            dynamic_aggregate: true,
            ..Default::default()
        };
        let sheet = Sheet::build(&decl, "t", None, &sources(), &options).unwrap();
        let a = leaf(&sheet, "a");
        assert_eq!(a.aggregate(0).map(|c| c.text.as_str()), Some("2"));
        assert!(a.cells().all(|c| c.text.is_empty()));
        assert_eq!(sheet.visible_fields()[0].leaves().len(), 1);
    }

    #[test]
    fn invalid_selector_is_reported() {
        let decl = basic_decl();
        let options = SheetOptions {
            selectors: Some(vec!["(".to_string()]),
            ..Default::default()
        };
        let err = Sheet::build(&decl, "t", None, &sources(), &options).unwrap_err();
        assert!(matches!(err, SheetError::InvalidSelector { .. }));
    }

    #[test]
    fn per_key_entries_iterate_maps_within_nodes() {
        let data = DataSources::new().with_source(
            "ns",
            [
                ("n1", NodeValue::from(json!({"bar": {"objects": 1}, "test": {"objects": 2}}))),
                ("n2", NodeValue::from(json!({"test": {"objects": 3}}))),
            ],
        );
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Namespace", LeafDecl::new(Accessor::entry_key())),
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf(
                "Objects",
                LeafDecl::new(Accessor::number("ns", ["objects"]).keyed()).aggregate(Aggregator::Sum),
            ),
        ])
        .from_source("ns")
        .entries(EntrySource::PerKey {
            source: "ns".to_string(),
            path: vec![],
        })
        .group_by(["Namespace"]);

        let sheet = Sheet::build(&decl, "t", None, &data, &SheetOptions::default()).unwrap();
        assert_eq!(sheet.group_sizes(), &[1, 2]);
        let objects = leaf(&sheet, "Objects");
        assert_eq!(objects.aggregate(0).map(|c| c.text.as_str()), Some("1"));
        assert_eq!(objects.aggregate(1).map(|c| c.text.as_str()), Some("5"));
    }

    #[test]
    fn per_key_entries_keep_unavailable_nodes_under_a_path() {
        let data = DataSources::new().with_source(
            "ns",
            [
                ("n1", NodeValue::from(json!({"namespace": {"test": {"objects": 1}}}))),
                ("n2", NodeValue::unavailable("timeout")),
                ("n3", NodeValue::map([("namespace", NodeValue::unavailable("busy"))])),
                ("n4", NodeValue::from(json!({"other": 1}))),
            ],
        );
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf(
                "Objects",
                LeafDecl::new(Accessor::number("ns", ["objects"]).keyed()),
            ),
        ])
        .from_source("ns")
        .entries(EntrySource::PerKey {
            source: "ns".to_string(),
            path: vec!["namespace".to_string()],
        });

        let sheet = Sheet::build(&decl, "t", None, &data, &SheetOptions::default()).unwrap();
        assert_eq!(sheet.record_count(), 3);
        let nodes: Vec<&str> = leaf(&sheet, "Node").cells().map(|c| c.text.as_str()).collect();
        assert_eq!(nodes, vec!["n1", "n2", "n3"]);
        let objects: Vec<&str> = leaf(&sheet, "Objects").cells().map(|c| c.text.as_str()).collect();
        assert_eq!(objects, vec!["1", UNAVAILABLE_MARKER, UNAVAILABLE_MARKER]);
    }

    #[test]
    fn uniformity_ignores_unavailable() {
        let cell = |datum: Datum, text: &str| Cell {
            datum,
            text: text.to_string(),
            format: None,
        };
        assert!(is_uniform(&[
            cell(Datum::from(1), "1"),
            cell(Datum::Unavailable("x".into()), UNAVAILABLE_MARKER),
            cell(Datum::from(1), "1"),
        ]));
        assert!(!is_uniform(&[cell(Datum::from(1), "1"), cell(Datum::from(2), "2")]));
        assert!(!is_uniform(&[cell(Datum::Unavailable("x".into()), UNAVAILABLE_MARKER)]));
    }

    #[test]
    fn uniformity_ignores_missing() {
        let cell = |datum: Datum, text: &str| Cell {
            datum,
            text: text.to_string(),
            format: None,
        };
        assert!(is_uniform(&[
            cell(Datum::from(1), "1"),
            cell(Datum::Missing, MISSING_MARKER),
            cell(Datum::from(1), "1"),
        ]));
        assert!(!is_uniform(&[cell(Datum::Missing, MISSING_MARKER)]));
    }

    #[test]
    fn diff_mode_hides_fields_equal_wherever_present() {
        let data = DataSources::new().with_source(
            "stats",
            [
                ("n1", NodeValue::from(json!({"bins": {"a": 1, "b": 1}}))),
                ("n2", NodeValue::from(json!({"bins": {"a": 1, "b": 2}}))),
                ("n3", NodeValue::from(json!({"bins": {"b": 3}}))),
            ],
        );
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::dynamic("", DynamicDecl::new("stats", ["bins"])),
        ])
        .from_source("stats");
        let options = SheetOptions {
            dynamic_diff: true,
            ..Default::default()
        };
        let sheet = Sheet::build(&decl, "t", None, &data, &options).unwrap();
        let keys: Vec<&str> = sheet.visible_fields().iter().map(FieldNode::key).collect();
        assert_eq!(keys, vec!["Node", "b"]);
    }
}
