//! Style renderers.
//!
//! Every style consumes the same built [`Sheet`] and differs only in how it
//! serializes it:
//!
//! - [`ColumnRenderer`]: one column per field, one line per entry.
//! - [`RowRenderer`]: transposed, one line per field.
//! - [`DocumentRenderer`]: a structured JSON tree with no presentation.
//!
//! [`renderer_for`] maps a [`SheetStyle`] to its renderer.

mod column;
mod document;
mod row;

use serde::{Deserialize, Serialize};

use crate::decl::{Align, SheetStyle};
use crate::error::SheetError;
use crate::sheet::{Cell, Sheet};
use crate::style::{self, Palette};
use crate::text::{center_with, display_width, pad_center, pad_left, pad_right, wrap_description};

pub use column::ColumnRenderer;
pub use document::DocumentRenderer;
pub use row::RowRenderer;

/// Serialization format for document output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

/// Output of a renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum Rendered {
    /// Newline terminated text, or empty for a sheet with no visible fields.
    Text(String),
    Document(serde_json::Value),
}

impl Rendered {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Rendered::Text(s) => Some(s),
            Rendered::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&serde_json::Value> {
        match self {
            Rendered::Document(v) => Some(v),
            Rendered::Text(_) => None,
        }
    }

    /// Converts to a string, serializing documents in `format`.
    pub fn into_string(self, format: DocumentFormat) -> Result<String, SheetError> {
        match self {
            Rendered::Text(s) => Ok(s),
            Rendered::Document(v) => match format {
                DocumentFormat::Json => Ok(serde_json::to_string_pretty(&v)?),
                DocumentFormat::Yaml => Ok(serde_yaml::to_string(&v)?),
            },
        }
    }
}

/// One output style.
pub trait StyleRenderer {
    fn style(&self) -> SheetStyle;

    /// Renders a built sheet.
    fn render(&self, sheet: &Sheet<'_>) -> Result<Rendered, SheetError>;
}

/// Selects the renderer for `style`. Text styles paint with `palette`.
pub fn renderer_for<'p>(style: SheetStyle, palette: &'p Palette) -> Box<dyn StyleRenderer + 'p> {
    match style {
        SheetStyle::Columns => Box::new(ColumnRenderer::new(palette)),
        SheetStyle::Rows => Box::new(RowRenderer::new(palette)),
        SheetStyle::Document => Box::new(DocumentRenderer::new()),
    }
}

/// Title and description lines shared by the text styles.
///
/// The title is centered in `width` with the sheet's title fill, keeping at
/// least one fill character on both ends. The description wraps ten columns
/// narrower and is centered below it.
fn banner(sheet: &Sheet<'_>, palette: &Palette, width: usize) -> Vec<String> {
    let decl = sheet.decl();
    let width = width.max(display_width(sheet.title()) + 2);

    let mut lines = vec![palette.paint(
        style::TITLE,
        &center_with(sheet.title(), width, decl.title_fill),
    )];

    if let Some(description) = sheet.description().filter(|d| !d.is_empty()) {
        for line in wrap_description(description, width.saturating_sub(10)) {
            lines.push(palette.paint(style::DESCRIPTION, &center_with(&line, width, ' ')));
        }
    }

    lines
}

fn footer(sheet: &Sheet<'_>, palette: &Palette) -> String {
    palette.paint(
        style::FOOTER,
        &format!("Number of rows: {}", sheet.record_count()),
    )
}

/// Paints `text`, then pads it to `width` with `align`. The padding is never
/// styled.
fn aligned(palette: &Palette, role: Option<&str>, text: &str, width: usize, align: Align) -> String {
    let painted = match role {
        Some(role) => palette.paint(role, text),
        None => text.to_string(),
    };
    match align {
        Align::Right => pad_left(&painted, width),
        Align::Left => pad_right(&painted, width),
        Align::Center => pad_center(&painted, width),
    }
}

/// Palette role for an entry cell.
fn cell_role(cell: &Cell) -> Option<&str> {
    match &cell.format {
        Some(format) => Some(format.style.as_str()),
        None if cell.datum.is_unavailable() => Some(style::UNAVAILABLE),
        None => None,
    }
}

fn aggregate_role(grouped_by: bool) -> &'static str {
    if grouped_by {
        style::GROUP_AGGREGATE
    } else {
        style::AGGREGATE
    }
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextMode;
    use serde_json::json;

    #[test]
    fn aligned_pads_outside_the_styled_text() {
        let palette = Palette::new(TextMode::Styled);
        let out = aligned(&palette, Some(style::AGGREGATE), "12", 5, Align::Right);
        assert!(out.starts_with("   \u{1b}["));
        assert_eq!(console::measure_text_width(&out), 5);

        let plain = Palette::new(TextMode::Plain);
        assert_eq!(aligned(&plain, None, "ab", 5, Align::Center), "  ab ");
        assert_eq!(aligned(&plain, None, "ab", 6, Align::Center), "  ab  ");
        assert_eq!(aligned(&plain, None, "ab", 5, Align::Left), "ab   ");
        assert_eq!(aligned(&plain, None, "abcdef", 3, Align::Left), "abcdef");
    }

    #[test]
    fn document_serializes_to_json_and_yaml() {
        let doc = Rendered::Document(json!({"title": "Usage", "record_count": 2}));
        let as_json = doc.clone().into_string(DocumentFormat::Json).unwrap();
        assert!(as_json.contains("\"record_count\": 2"));
        let as_yaml = doc.into_string(DocumentFormat::Yaml).unwrap();
        assert!(as_yaml.contains("record_count: 2"));
    }

    #[test]
    fn text_passes_through() {
        let text = Rendered::Text("x\n".to_string());
        assert_eq!(text.as_text(), Some("x\n"));
        assert!(text.as_document().is_none());
        assert_eq!(text.into_string(DocumentFormat::Yaml).unwrap(), "x\n");
    }

    #[test]
    fn renderer_for_matches_style() {
        let palette = Palette::default();
        for style in [SheetStyle::Columns, SheetStyle::Rows, SheetStyle::Document] {
            assert_eq!(renderer_for(style, &palette).style(), style);
        }
    }
}
