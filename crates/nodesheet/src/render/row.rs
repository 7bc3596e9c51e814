//! The row style: the column table transposed.
//!
//! Each visible leaf becomes one line with its title in the first column and
//! one cell per entry after it. A composite contributes a heading line and
//! indents its children beneath it. When any field aggregates, every group
//! ends with an aggregate column.
//!
//! ```text
//! ~~~~~Usage~~~~~
//! Node    n1 n2
//! Objects  5 ~~ 5
//! Number of rows: 2
//! ```

use super::{aggregate_role, aligned, banner, cell_role, finish, footer, Rendered, StyleRenderer};
use crate::decl::{Align, SheetStyle};
use crate::error::SheetError;
use crate::sheet::{Field, FieldNode, Sheet};
use crate::style::{self, Palette};
use crate::text::display_width;

const INDENT: usize = 2;

/// Renders one line per visible field.
#[derive(Clone, Copy, Debug)]
pub struct RowRenderer<'p> {
    palette: &'p Palette,
}

enum Line<'f> {
    Heading { depth: usize, title: &'f str },
    Leaf { depth: usize, field: &'f Field },
}

impl Line<'_> {
    fn title_width(&self) -> usize {
        match self {
            Line::Heading { depth, title } => depth * INDENT + display_width(title),
            Line::Leaf { depth, field } => depth * INDENT + display_width(&field.title),
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Entry { group: usize, entry: usize },
    Aggregate { group: usize },
}

impl<'p> RowRenderer<'p> {
    pub fn new(palette: &'p Palette) -> Self {
        RowRenderer { palette }
    }

    fn leaf_line(
        &self,
        field: &Field,
        depth: usize,
        title_width: usize,
        slots: &[(Slot, usize)],
        separator: &str,
    ) -> String {
        let indent = depth * INDENT;
        let role = if field.is_ordered_by {
            style::ORDERED
        } else {
            style::HEADER
        };
        let title = format!(
            "{}{}",
            " ".repeat(indent),
            aligned(self.palette, Some(role), &field.title, title_width - indent, Align::Left)
        );

        let mut cells = vec![title];
        cells.extend(slots.iter().map(|&(slot, width)| match slot {
            Slot::Entry { group, entry } => match field.entry(group, entry) {
                Some(cell) => aligned(self.palette, cell_role(cell), &cell.text, width, field.align),
                None => " ".repeat(width),
            },
            Slot::Aggregate { group } => match field.aggregate(group) {
                Some(cell) => aligned(
                    self.palette,
                    Some(aggregate_role(field.is_grouped_by)),
                    &cell.text,
                    width,
                    field.align,
                ),
                None => " ".repeat(width),
            },
        }));
        cells.join(separator)
    }
}

impl StyleRenderer for RowRenderer<'_> {
    fn style(&self) -> SheetStyle {
        SheetStyle::Rows
    }

    fn render(&self, sheet: &Sheet<'_>) -> Result<Rendered, SheetError> {
        if sheet.is_empty() {
            return Ok(Rendered::Text(String::new()));
        }

        let separator = sheet.separator();
        let mut rows = Vec::new();
        flatten(sheet.visible_fields(), 0, &mut rows);
        let leaves: Vec<&Field> = rows
            .iter()
            .filter_map(|line| match line {
                Line::Leaf { field, .. } => Some(*field),
                Line::Heading { .. } => None,
            })
            .collect();

        let title_width = rows.iter().map(Line::title_width).max().unwrap_or(0);
        let slots = slots(sheet, &leaves);
        let width = title_width
            + slots
                .iter()
                .map(|(_, w)| w + display_width(separator))
                .sum::<usize>();

        let mut lines = banner(sheet, self.palette, width);
        for row in &rows {
            lines.push(match row {
                Line::Heading { depth, title } => format!(
                    "{}{}",
                    " ".repeat(depth * INDENT),
                    self.palette.paint(style::HEADER, title)
                ),
                Line::Leaf { depth, field } => {
                    self.leaf_line(field, *depth, title_width, &slots, separator)
                }
            });
        }
        lines.push(footer(sheet, self.palette));

        Ok(Rendered::Text(finish(lines)))
    }
}

fn flatten<'f>(fields: &'f [FieldNode], depth: usize, out: &mut Vec<Line<'f>>) {
    for field in fields {
        match field {
            FieldNode::Leaf(leaf) => out.push(Line::Leaf { depth, field: leaf }),
            FieldNode::Composite(composite) => {
                out.push(Line::Heading {
                    depth,
                    title: &composite.title,
                });
                flatten(&composite.children, depth + 1, out);
            }
        }
    }
}

/// Value columns in display order, each with the width of its widest cell.
fn slots(sheet: &Sheet<'_>, leaves: &[&Field]) -> Vec<(Slot, usize)> {
    let with_aggregates = sheet.has_aggregates();
    let mut slots = Vec::new();

    for (group, &size) in sheet.group_sizes().iter().enumerate() {
        for entry in 0..size {
            let width = leaves
                .iter()
                .filter_map(|f| f.entry(group, entry))
                .map(|c| c.width())
                .max()
                .unwrap_or(0);
            slots.push((Slot::Entry { group, entry }, width));
        }
        if with_aggregates {
            let width = leaves
                .iter()
                .filter_map(|f| f.aggregate(group))
                .map(|c| c.width())
                .max()
                .unwrap_or(0);
            slots.push((Slot::Aggregate { group }, width));
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Accessor, Aggregator, FieldDecl, LeafDecl, SheetDecl};
    use crate::sheet::SheetOptions;
    use crate::style::TextMode;
    use crate::value::{DataSources, NodeValue};
    use serde_json::json;

    fn render(decl: &SheetDecl, data: &DataSources) -> String {
        let palette = Palette::new(TextMode::Plain);
        let sheet = Sheet::build(decl, "Usage", None, data, &SheetOptions::default()).unwrap();
        match RowRenderer::new(&palette).render(&sheet).unwrap() {
            Rendered::Text(s) => s,
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn transposes_fields_into_lines() {
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::leaf(
                "Objects",
                LeafDecl::new(Accessor::number("s", ["objects"])).aggregate(Aggregator::Sum),
            ),
        ])
        .from_source("s");
        let data = DataSources::new().with_source(
            "s",
            [
                ("n1", NodeValue::from(json!({"objects": 5}))),
                ("n2", NodeValue::unavailable("timeout")),
            ],
        );
        let out = render(&decl, &data);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "Node    n1 n2  ");
        assert_eq!(lines[2], "Objects  5 ~~ 5");
        assert_eq!(lines[3], "Number of rows: 2");
    }

    #[test]
    fn composites_indent_their_children() {
        let decl = SheetDecl::new(vec![
            FieldDecl::leaf("Node", LeafDecl::new(Accessor::node_id())),
            FieldDecl::composite(
                "Memory",
                vec![FieldDecl::leaf("Used", LeafDecl::new(Accessor::number("s", ["used"])))],
            ),
        ])
        .from_source("s");
        let data = DataSources::new().with_source("s", [("n1", NodeValue::from(json!({"used": 7})))]);
        let out = render(&decl, &data);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "Node   n1");
        assert_eq!(lines[2], "Memory");
        assert_eq!(lines[3], "  Used  7");
    }
}
