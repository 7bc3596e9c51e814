//! # Nodesheet - Declarative Cluster Reports
//!
//! `nodesheet` turns per-node nested values collected from a cluster into
//! readable tables or machine readable documents. A report is declared once
//! as a [`SheetDecl`] and rendered against fresh data on every call.
//!
//! ## Core Concepts
//!
//! - [`DataSources`]: `source -> node -> NodeValue`, where a node's value may
//!   be [`NodeValue::Unavailable`]
//! - [`SheetDecl`] / [`FieldDecl`]: ordered leaf, composite and dynamic fields
//! - [`Sheet`]: a declaration bound to data, grouped, ordered and filtered
//! - [`sheet::layout`]: the two-phase width and title layout
//! - [`SheetStyle`]: columns, rows or document
//! - [`render()`]: the entry point, driven by a [`RenderConfig`]
//!
//! ## Quick Start
//!
//! ```rust
//! use nodesheet::{render, Accessor, Aggregator, DataSources, FieldDecl, LeafDecl,
//!     NodeValue, RenderConfig, RenderRequest, SheetDecl, SheetStyle, TextMode};
//!
//! let decl = SheetDecl::new(vec![
//!     FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
//!     FieldDecl::leaf(
//!         "Objects",
//!         LeafDecl::new(Accessor::number("stats", ["objects"])).aggregate(Aggregator::Sum),
//!     ),
//! ])
//! .from_source("stats");
//!
//! let mut sources = DataSources::new();
//! sources.insert("stats", "10.0.0.1:3000", NodeValue::map([("objects", 1200)]));
//! sources.insert("stats", "10.0.0.2:3000", NodeValue::unavailable("timeout"));
//!
//! let config = RenderConfig::new().text_mode(TextMode::Plain);
//! let table = render(&decl, "Objects", &sources, &config, RenderRequest::new()).unwrap();
//! assert!(table.as_text().unwrap().contains("~~"));
//!
//! let doc = render(
//!     &decl,
//!     "Objects",
//!     &sources,
//!     &config,
//!     RenderRequest::new().style(SheetStyle::Document),
//! )
//! .unwrap();
//! assert_eq!(doc.as_document().unwrap()["record_count"], 2);
//! ```
//!
//! ## Unavailable and missing values
//!
//! A node that could not provide a value renders `~~` in text styles and an
//! `"error"` key in documents. A path that does not exist renders `--`.
//! Neither takes part in aggregates, and unavailable values are ignored when
//! deciding whether a dynamic field is uniform.

pub mod config;
pub mod decl;
pub mod dispatch;
mod error;
pub mod render;
pub mod sheet;
pub mod style;
pub mod text;
pub mod value;

pub use config::{EnvReader, MockEnv, RealEnv, RenderConfig};
pub use decl::{
    Accessor, Aggregator, Align, Converter, DynamicDecl, EntryContext, EntrySource, FieldDecl,
    FieldKind, Formatter, Hidden, LeafDecl, Projection, SheetDecl, SheetStyle,
};
pub use dispatch::{render, render_to_string, resolve_style, RenderRequest};
pub use error::{RenderError, SheetError};
pub use render::{
    renderer_for, ColumnRenderer, DocumentFormat, DocumentRenderer, Rendered, RowRenderer,
    StyleRenderer,
};
pub use sheet::{Sheet, SheetOptions};
pub use style::{Palette, TextMode};
pub use value::{CommonContext, DataSources, Datum, NodeId, NodeValue, Scalar};
