//! Terminal styling for text renderers.
//!
//! A [`Palette`] maps style roles to `console` styles, in the same
//! name-to-style manner as a theme. Renderers always pad plain text first and
//! then call [`Palette::paint`], so styling never changes a cell's width.
//!
//! In [`TextMode::Plain`] painting is the identity function, which is what
//! tests and piped output use.

use std::collections::HashMap;

use console::Style;
use serde::{Deserialize, Serialize};

/// Whether text renderers emit ANSI escapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    /// Emit ANSI styling.
    #[default]
    Styled,
    /// Never emit escapes.
    Plain,
}

/// Sheet title line.
pub const TITLE: &str = "title";
/// Description lines below the title.
pub const DESCRIPTION: &str = "description";
/// Field title lines.
pub const HEADER: &str = "header";
/// Title of the field the sheet is ordered by.
pub const ORDERED: &str = "ordered";
/// Aggregate cells.
pub const AGGREGATE: &str = "aggregate";
/// Aggregate cells of a group-by field.
pub const GROUP_AGGREGATE: &str = "group_aggregate";
/// Trailing row count line.
pub const FOOTER: &str = "footer";
/// Cells of unavailable values.
pub const UNAVAILABLE: &str = "unavailable";
pub const ALERT: &str = "alert";
pub const WARNING: &str = "warning";
pub const SUCCESS: &str = "success";

/// Named styles used by the column and row renderers.
#[derive(Clone, Debug)]
pub struct Palette {
    mode: TextMode,
    styles: HashMap<String, Style>,
}

impl Palette {
    /// Creates a palette with the default roles.
    pub fn new(mode: TextMode) -> Self {
        Palette {
            mode,
            styles: HashMap::new(),
        }
        .add(TITLE, Style::new().bold())
        .add(DESCRIPTION, Style::new().dim())
        .add(HEADER, Style::new().bold())
        .add(ORDERED, Style::new().bold().underlined())
        .add(AGGREGATE, Style::new().blue())
        .add(GROUP_AGGREGATE, Style::new().blue().bold())
        .add(FOOTER, Style::new().dim())
        .add(UNAVAILABLE, Style::new().dim())
        .add(ALERT, Style::new().red().bold())
        .add(WARNING, Style::new().yellow())
        .add(SUCCESS, Style::new().green())
    }

    /// Adds or replaces a named style.
    pub fn add(mut self, name: impl Into<String>, style: Style) -> Self {
        self.styles
            .insert(name.into(), style.force_styling(true));
        self
    }

    pub fn mode(&self) -> TextMode {
        self.mode
    }

    /// Applies the named style. Unknown names and plain mode leave the text
    /// untouched.
    pub fn paint(&self, name: &str, text: &str) -> String {
        if self.mode == TextMode::Plain {
            return text.to_string();
        }
        match self.styles.get(name) {
            Some(style) => style.apply_to(text).to_string(),
            None => text.to_string(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::new(TextMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_is_identity() {
        let palette = Palette::new(TextMode::Plain);
        assert_eq!(palette.paint(TITLE, "Report"), "Report");
        assert_eq!(palette.paint(AGGREGATE, "  12"), "  12");
    }

    #[test]
    fn styled_mode_wraps_without_changing_visible_width() {
        let palette = Palette::new(TextMode::Styled);
        let painted = palette.paint(AGGREGATE, "  12");
        assert_ne!(painted, "  12");
        assert!(painted.contains("  12"));
        assert_eq!(console::measure_text_width(&painted), 4);
    }

    #[test]
    fn unknown_style_is_untouched() {
        let palette = Palette::new(TextMode::Styled);
        assert_eq!(palette.paint("nope", "x"), "x");
    }

    #[test]
    fn custom_style_replaces_default() {
        let palette = Palette::new(TextMode::Styled).add(ALERT, Style::new().magenta());
        let painted = palette.paint(ALERT, "hot");
        assert!(painted.contains("hot"));
        assert!(painted.starts_with("\u{1b}["));
    }
}
