//! The render entry point.
//!
//! [`render`] checks the declaration's source requirements, resolves the
//! style, builds the sheet, hands it to the style's renderer and annotates any
//! failure with the title, style and description of the call.
//!
//! ```rust
//! use nodesheet::{render, Accessor, DataSources, FieldDecl, LeafDecl, RenderConfig,
//!     RenderRequest, SheetDecl, TextMode};
//!
//! let decl = SheetDecl::new(vec![
//!     FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
//!     FieldDecl::leaf("Value", LeafDecl::new(Accessor::number("stats", ["value"]))),
//! ])
//! .from_source("stats");
//!
//! let mut sources = DataSources::new();
//! sources.insert("stats", "1.1.1.1", nodesheet::NodeValue::map([("value", 42)]));
//!
//! let config = RenderConfig::new().text_mode(TextMode::Plain);
//! let out = render(&decl, "Values", &sources, &config, RenderRequest::new()).unwrap();
//! let text = out.as_text().unwrap();
//! assert!(text.contains("1.1.1.1    42"));
//! assert!(text.ends_with("Number of rows: 1\n"));
//! ```

use crate::config::RenderConfig;
use crate::decl::{SheetDecl, SheetStyle};
use crate::error::{RenderError, SheetError};
use crate::render::{renderer_for, Rendered};
use crate::sheet::{Sheet, SheetOptions};
use crate::value::{CommonContext, DataSources, Scalar};

/// Per-call arguments of [`render`].
#[derive(Clone, Debug, Default)]
pub struct RenderRequest {
    pub style: Option<SheetStyle>,
    pub description: Option<String>,
    pub options: SheetOptions,
}

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a style. Ignored when the configuration forces documents.
    pub fn style(mut self, style: SheetStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn common(mut self, common: CommonContext) -> Self {
        self.options.common = common;
        self
    }

    /// Adds one value to the common context.
    pub fn with_common(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.options.common.insert(key.into(), value.into());
        self
    }

    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.selectors = Some(selectors.into_iter().map(Into::into).collect());
        self
    }

    pub fn dynamic_aggregate(mut self, enabled: bool) -> Self {
        self.options.dynamic_aggregate = enabled;
        self
    }

    pub fn dynamic_diff(mut self, enabled: bool) -> Self {
        self.options.dynamic_diff = enabled;
        self
    }
}

/// Effective style: forced documents, then the requested style, then the
/// declaration's default.
pub fn resolve_style(
    config: &RenderConfig,
    requested: Option<SheetStyle>,
    decl: &SheetDecl,
) -> SheetStyle {
    if config.force_document {
        SheetStyle::Document
    } else {
        requested.unwrap_or(decl.default_style)
    }
}

/// Renders `decl` over `sources`.
///
/// Fails with [`RenderError::MissingSources`] before doing any work when a
/// required source is absent. Every later failure is returned as
/// [`RenderError::Sheet`].
pub fn render(
    decl: &SheetDecl,
    title: &str,
    sources: &DataSources,
    config: &RenderConfig,
    request: RenderRequest,
) -> Result<Rendered, RenderError> {
    let missing: Vec<String> = decl
        .from_sources
        .iter()
        .filter(|name| !sources.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RenderError::MissingSources { missing });
    }

    let style = resolve_style(config, request.style, decl);
    let palette = config.palette();

    let result = Sheet::build(
        decl,
        title,
        request.description.clone(),
        sources,
        &request.options,
    )
    .and_then(|sheet| {
        tracing::debug!(
            target: "nodesheet::dispatch",
            title,
            %style,
            fields = sheet.visible_fields().len(),
            records = sheet.record_count(),
            "rendering sheet"
        );
        renderer_for(style, &palette).render(&sheet)
    });

    result.map_err(|source| annotate(title, style, request.description, source))
}

/// Like [`render`], returning text with documents serialized in the
/// configured format.
pub fn render_to_string(
    decl: &SheetDecl,
    title: &str,
    sources: &DataSources,
    config: &RenderConfig,
    request: RenderRequest,
) -> Result<String, RenderError> {
    let style = resolve_style(config, request.style, decl);
    let description = request.description.clone();
    render(decl, title, sources, config, request)?
        .into_string(config.document_format)
        .map_err(|source| annotate(title, style, description, source))
}

fn annotate(
    title: &str,
    style: SheetStyle,
    description: Option<String>,
    source: SheetError,
) -> RenderError {
    tracing::error!(
        target: "nodesheet::dispatch",
        title,
        %style,
        description = description.as_deref().unwrap_or_default(),
        error = %source,
        "sheet render failed"
    );
    RenderError::Sheet {
        title: title.to_string(),
        style,
        description,
        source,
    }
}
