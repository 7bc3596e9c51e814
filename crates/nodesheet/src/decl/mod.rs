//! Sheet declarations.
//!
//! A [`SheetDecl`] is the static description of a report: an ordered list of
//! [`FieldDecl`]s plus sheet-level settings (required sources, default
//! style, separators, grouping and ordering). Declarations are immutable
//! once built and are typically constructed once and reused for every
//! render.
//!
//! ```rust
//! use nodesheet::decl::{Accessor, FieldDecl, LeafDecl, SheetDecl};
//! use nodesheet::decl::Aggregator;
//!
//! let sheet = SheetDecl::new(vec![
//!     FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
//!     FieldDecl::composite(
//!         "Memory",
//!         vec![
//!             FieldDecl::leaf("Used", LeafDecl::new(Accessor::number("stats", ["used"]))
//!                 .aggregate(Aggregator::Sum)),
//!             FieldDecl::leaf("Free", LeafDecl::new(Accessor::number("stats", ["free"]))),
//!         ],
//!     ),
//! ])
//! .from_source("stats");
//!
//! assert_eq!(sheet.fields.len(), 2);
//! ```

mod aggregate;
mod convert;
mod format;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::text::longest_word;
use crate::value::{Datum, Scalar};

pub use aggregate::Aggregator;
pub use convert::Converter;
pub use format::{EntryContext, Formatter};

/// Output representation of a sheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetStyle {
    /// One column per field, one line per entry.
    #[default]
    Columns,
    /// Transposed: one line per field, one column per entry.
    Rows,
    /// Structured document with no presentation formatting.
    Document,
}

impl fmt::Display for SheetStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetStyle::Columns => f.write_str("columns"),
            SheetStyle::Rows => f.write_str("rows"),
            SheetStyle::Document => f.write_str("document"),
        }
    }
}

/// Text alignment within a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    Center,
}

/// When a field is hidden regardless of diff filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hidden {
    Never,
    Always,
    /// Hidden when no entry has a value at all.
    #[default]
    WhenEmpty,
}

/// How a projected scalar is coerced before conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Projection {
    /// Keep whatever the source holds.
    #[default]
    Any,
    Text,
    /// Integer or float; anything else is unavailable.
    Number,
    Float,
    Boolean,
}

impl Projection {
    pub fn apply(self, datum: Datum) -> Datum {
        let value = match datum {
            Datum::Value(v) => v,
            other => return other,
        };
        match self {
            Projection::Any => Datum::Value(value),
            Projection::Text => Datum::Value(Scalar::Text(value.to_string())),
            Projection::Number => match value.to_number() {
                Some(n) => Datum::Value(n),
                None => Datum::Unavailable(format!("not a number: {}", value)),
            },
            Projection::Float => match value.as_f64() {
                Some(f) => Datum::Value(Scalar::Float(f)),
                None => Datum::Unavailable(format!("not a number: {}", value)),
            },
            Projection::Boolean => match value {
                Scalar::Bool(b) => Datum::from(b),
                Scalar::Text(ref s) if s.eq_ignore_ascii_case("true") => Datum::from(true),
                Scalar::Text(ref s) if s.eq_ignore_ascii_case("false") => Datum::from(false),
                _ => Datum::Unavailable(format!("not a boolean: {}", value)),
            },
        }
    }

    /// Alignment used when a field does not declare one.
    pub fn default_align(self) -> Align {
        match self {
            Projection::Number | Projection::Float => Align::Right,
            _ => Align::Left,
        }
    }
}

type AccessorFn = Arc<dyn Fn(&EntryContext<'_>) -> Datum + Send + Sync>;

/// Where a field's value comes from.
#[derive(Clone)]
pub enum Accessor {
    /// `sources[source][node][path...]`, or with `keyed`,
    /// `sources[source][node][entry key][path...]`.
    Path {
        source: String,
        path: Vec<String>,
        keyed: bool,
        projection: Projection,
    },
    /// The entry's node id.
    NodeId,
    /// The entry's key within its node.
    EntryKey,
    Func(AccessorFn),
}

impl Accessor {
    fn path<P, S>(source: impl Into<String>, path: P, projection: Projection) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Accessor::Path {
            source: source.into(),
            path: path.into_iter().map(Into::into).collect(),
            keyed: false,
            projection,
        }
    }

    /// Raw value at `path` within `source`.
    pub fn value<P, S>(source: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::path(source, path, Projection::Any)
    }

    pub fn text<P, S>(source: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::path(source, path, Projection::Text)
    }

    pub fn number<P, S>(source: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::path(source, path, Projection::Number)
    }

    pub fn float<P, S>(source: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::path(source, path, Projection::Float)
    }

    pub fn boolean<P, S>(source: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::path(source, path, Projection::Boolean)
    }

    pub fn node_id() -> Self {
        Accessor::NodeId
    }

    pub fn entry_key() -> Self {
        Accessor::EntryKey
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&EntryContext<'_>) -> Datum + Send + Sync + 'static,
    {
        Accessor::Func(Arc::new(f))
    }

    /// Resolves the path under the entry's key instead of the node root.
    pub fn keyed(self) -> Self {
        match self {
            Accessor::Path {
                source,
                path,
                projection,
                ..
            } => Accessor::Path {
                source,
                path,
                keyed: true,
                projection,
            },
            other => other,
        }
    }

    /// Projects the value for one entry.
    pub fn project(&self, ctx: &EntryContext<'_>) -> Datum {
        match self {
            Accessor::Path {
                source,
                path,
                keyed,
                projection,
            } => {
                let Some(root) = ctx.sources.node(source, ctx.node) else {
                    return Datum::Missing;
                };
                let datum = if *keyed {
                    let full: Vec<&str> = ctx
                        .entry_path
                        .iter()
                        .map(String::as_str)
                        .chain(ctx.key)
                        .chain(path.iter().map(String::as_str))
                        .collect();
                    root.lookup(&full)
                } else {
                    root.lookup(path.as_slice())
                };
                projection.apply(datum)
            }
            Accessor::NodeId => Datum::Value(Scalar::Text(ctx.node.clone())),
            Accessor::EntryKey => match ctx.key {
                Some(key) => Datum::Value(Scalar::Text(key.to_string())),
                None => Datum::Missing,
            },
            Accessor::Func(f) => f(ctx),
        }
    }

    pub fn projection(&self) -> Projection {
        match self {
            Accessor::Path { projection, .. } => *projection,
            _ => Projection::Any,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Path {
                source,
                path,
                keyed,
                projection,
            } => f
                .debug_struct("Path")
                .field("source", source)
                .field("path", path)
                .field("keyed", keyed)
                .field("projection", projection)
                .finish(),
            Accessor::NodeId => write!(f, "NodeId"),
            Accessor::EntryKey => write!(f, "EntryKey"),
            Accessor::Func(_) => write!(f, "Func(<fn>)"),
        }
    }
}

/// Declaration of a single-valued field.
#[derive(Clone, Debug)]
pub struct LeafDecl {
    pub accessor: Accessor,
    pub converter: Converter,
    /// Explicit alignment; defaults from the accessor's projection.
    pub align: Option<Align>,
    pub aggregate: Option<Aggregator>,
    pub min_width: usize,
    pub hidden: Hidden,
    pub formatters: Vec<Formatter>,
}

impl LeafDecl {
    pub fn new(accessor: Accessor) -> Self {
        LeafDecl {
            accessor,
            converter: Converter::default(),
            align: None,
            aggregate: None,
            min_width: 0,
            hidden: Hidden::default(),
            formatters: Vec::new(),
        }
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn right(self) -> Self {
        self.align(Align::Right)
    }

    pub fn left(self) -> Self {
        self.align(Align::Left)
    }

    pub fn center(self) -> Self {
        self.align(Align::Center)
    }

    pub fn aggregate(mut self, aggregate: Aggregator) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// Minimum column width, on top of the title's longest word.
    pub fn min_width(mut self, width: usize) -> Self {
        self.min_width = width;
        self
    }

    pub fn hidden(mut self, hidden: Hidden) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn formatter(mut self, formatter: Formatter) -> Self {
        self.formatters.push(formatter);
        self
    }

    pub fn effective_align(&self) -> Align {
        self.align
            .unwrap_or_else(|| self.accessor.projection().default_align())
    }
}

/// Declaration of a composite whose children are discovered from data.
///
/// Every key of the map at `source[node][path...]`, across all entries,
/// becomes one sub-field titled by the key. Numeric sub-fields are right
/// aligned, everything else left aligned.
#[derive(Clone, Debug)]
pub struct DynamicDecl {
    pub source: String,
    pub path: Vec<String>,
    pub keyed: bool,
    pub converter: Converter,
}

impl DynamicDecl {
    pub fn new<P, S>(source: impl Into<String>, path: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DynamicDecl {
            source: source.into(),
            path: path.into_iter().map(Into::into).collect(),
            keyed: false,
            converter: Converter::default(),
        }
    }

    /// Resolves the map under the entry's key.
    pub fn keyed(mut self) -> Self {
        self.keyed = true;
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }
}

/// The shape of a field.
#[derive(Clone, Debug)]
pub enum FieldKind {
    Leaf(LeafDecl),
    /// A titled group of sub-fields.
    Composite(Vec<FieldDecl>),
    /// Sub-fields discovered from data. With an empty title the discovered
    /// fields are spliced into the parent instead of grouped.
    Dynamic(DynamicDecl),
}

/// One declared field.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub title: String,
    /// Identifier used by group-by and order-by. Defaults to the title.
    pub key: String,
    pub kind: FieldKind,
}

impl FieldDecl {
    pub fn leaf(title: impl Into<String>, leaf: LeafDecl) -> Self {
        Self::with_kind(title, FieldKind::Leaf(leaf))
    }

    pub fn composite(title: impl Into<String>, children: Vec<FieldDecl>) -> Self {
        Self::with_kind(title, FieldKind::Composite(children))
    }

    pub fn dynamic(title: impl Into<String>, dynamic: DynamicDecl) -> Self {
        Self::with_kind(title, FieldKind::Dynamic(dynamic))
    }

    fn with_kind(title: impl Into<String>, kind: FieldKind) -> Self {
        let title = title.into();
        FieldDecl {
            key: title.clone(),
            title,
            kind,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Smallest width that still shows the title's longest word.
    pub fn min_title_width(&self) -> usize {
        let declared = match &self.kind {
            FieldKind::Leaf(leaf) => leaf.min_width,
            _ => 0,
        };
        declared.max(longest_word(&self.title))
    }

    /// Finds a declared leaf by key, searching composites depth first.
    pub fn find_leaf(&self, key: &str) -> Option<&FieldDecl> {
        match &self.kind {
            FieldKind::Leaf(_) if self.key == key => Some(self),
            FieldKind::Leaf(_) | FieldKind::Dynamic(_) => None,
            FieldKind::Composite(children) => children.iter().find_map(|c| c.find_leaf(key)),
        }
    }
}

/// How a sheet enumerates its entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EntrySource {
    /// One entry per node present in any of the sheet's sources.
    #[default]
    Nodes,
    /// One entry per node present in the named source.
    NodesOf(String),
    /// One entry per `(node, key)` where `source[node][path...]` is a map.
    PerKey { source: String, path: Vec<String> },
}

/// A complete sheet declaration.
#[derive(Clone, Debug)]
pub struct SheetDecl {
    pub fields: Vec<FieldDecl>,
    /// Data sources the caller must supply.
    pub from_sources: BTreeSet<String>,
    pub entries: EntrySource,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub default_style: SheetStyle,
    pub separator: String,
    pub title_fill: char,
    pub subtitle_fill: char,
    /// Header text for a leaf that has fewer title lines than its neighbours.
    pub subtitle_empty_line: String,
    pub disable_aggregations: bool,
    /// Hide uniform dynamic sub-fields even when the caller does not ask to.
    pub dynamic_diff: bool,
}

impl SheetDecl {
    pub fn new(fields: Vec<FieldDecl>) -> Self {
        SheetDecl {
            fields,
            from_sources: BTreeSet::new(),
            entries: EntrySource::default(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            default_style: SheetStyle::default(),
            separator: " ".to_string(),
            title_fill: '~',
            subtitle_fill: '~',
            subtitle_empty_line: String::new(),
            disable_aggregations: false,
            dynamic_diff: false,
        }
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.from_sources.insert(source.into());
        self
    }

    pub fn entries(mut self, entries: EntrySource) -> Self {
        self.entries = entries;
        self
    }

    pub fn group_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_style(mut self, style: SheetStyle) -> Self {
        self.default_style = style;
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn title_fill(mut self, fill: char) -> Self {
        self.title_fill = fill;
        self
    }

    pub fn subtitle_fill(mut self, fill: char) -> Self {
        self.subtitle_fill = fill;
        self
    }

    pub fn subtitle_empty_line(mut self, line: impl Into<String>) -> Self {
        self.subtitle_empty_line = line.into();
        self
    }

    pub fn disable_aggregations(mut self) -> Self {
        self.disable_aggregations = true;
        self
    }

    pub fn dynamic_diff(mut self) -> Self {
        self.dynamic_diff = true;
        self
    }

    /// Finds a declared leaf field by key.
    pub fn find_leaf(&self, key: &str) -> Option<&FieldDecl> {
        self.fields.iter().find_map(|f| f.find_leaf(key))
    }
}
