//! The column style: the reference layout.
//!
//! ```text
//! ~~~Usage~~~~
//! Node Objects
//! n1         5
//! n2        ~~
//!            5
//! Number of rows: 2
//! ```
//!
//! Header lines come from the wrapped titles in the layout tree: a
//! composite's own lines are centered with the subtitle fill, the lines below
//! them join its children's lines. Entry and aggregate lines are the visible
//! leaves' cells padded to the leaf widths and joined by the separator.

use super::{aggregate_role, aligned, banner, cell_role, finish, footer, Rendered, StyleRenderer};
use crate::decl::{Align, SheetDecl, SheetStyle};
use crate::error::SheetError;
use crate::sheet::layout::{joined_width, Layout};
use crate::sheet::{Field, FieldNode, Sheet};
use crate::style::{self, Palette};
use crate::text::{center_with, display_width, pad_left};

/// Renders one column per visible leaf.
#[derive(Clone, Copy, Debug)]
pub struct ColumnRenderer<'p> {
    palette: &'p Palette,
}

impl<'p> ColumnRenderer<'p> {
    pub fn new(palette: &'p Palette) -> Self {
        ColumnRenderer { palette }
    }

    fn header_cell(&self, decl: &SheetDecl, field: &FieldNode, layout: &Layout, line: usize) -> String {
        match field {
            FieldNode::Leaf(leaf) => match layout.title_lines.get(line) {
                Some(title) => {
                    let role = if leaf.is_ordered_by {
                        style::ORDERED
                    } else {
                        style::HEADER
                    };
                    aligned(self.palette, Some(role), title, layout.width, Align::Right)
                }
                None => pad_left(&decl.subtitle_empty_line, layout.width),
            },
            FieldNode::Composite(composite) => {
                let own = layout.title_lines.len();
                match layout.title_lines.get(line) {
                    Some(title) => self.palette.paint(
                        style::HEADER,
                        &center_with(title, layout.width, decl.subtitle_fill),
                    ),
                    None => composite
                        .children
                        .iter()
                        .zip(&layout.children)
                        .map(|(child, child_layout)| {
                            self.header_cell(decl, child, child_layout, line - own)
                        })
                        .collect::<Vec<_>>()
                        .join(decl.separator.as_str()),
                }
            }
        }
    }

    fn entry_line(&self, columns: &[(&Field, usize)], separator: &str, group: usize, entry: usize) -> String {
        columns
            .iter()
            .map(|(field, width)| match field.entry(group, entry) {
                Some(cell) => aligned(self.palette, cell_role(cell), &cell.text, *width, field.align),
                None => " ".repeat(*width),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn aggregate_line(&self, columns: &[(&Field, usize)], separator: &str, group: usize) -> String {
        columns
            .iter()
            .map(|(field, width)| match field.aggregate(group) {
                Some(cell) => aligned(
                    self.palette,
                    Some(aggregate_role(field.is_grouped_by)),
                    &cell.text,
                    *width,
                    field.align,
                ),
                None => " ".repeat(*width),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl StyleRenderer for ColumnRenderer<'_> {
    fn style(&self) -> SheetStyle {
        SheetStyle::Columns
    }

    fn render(&self, sheet: &Sheet<'_>) -> Result<Rendered, SheetError> {
        if sheet.is_empty() {
            return Ok(Rendered::Text(String::new()));
        }

        let decl = sheet.decl();
        let separator = decl.separator.as_str();
        let fields = sheet.visible_fields();
        let layouts = sheet.layout();
        let width = joined_width(&layouts, display_width(separator));

        let mut lines = banner(sheet, self.palette, width);

        let header_lines = layouts.iter().map(Layout::n_title_lines).max().unwrap_or(0);
        for line in 0..header_lines {
            lines.push(
                fields
                    .iter()
                    .zip(&layouts)
                    .map(|(field, layout)| self.header_cell(decl, field, layout, line))
                    .collect::<Vec<_>>()
                    .join(separator),
            );
        }

        let columns = leaf_columns(fields, &layouts);
        let with_aggregates = sheet.has_aggregates();
        for (group, &size) in sheet.group_sizes().iter().enumerate() {
            for entry in 0..size {
                lines.push(self.entry_line(&columns, separator, group, entry));
            }
            if with_aggregates {
                lines.push(self.aggregate_line(&columns, separator, group));
            }
        }

        lines.push(footer(sheet, self.palette));
        Ok(Rendered::Text(finish(lines)))
    }
}

/// Visible leaves in display order with their final widths.
fn leaf_columns<'f>(fields: &'f [FieldNode], layouts: &[Layout]) -> Vec<(&'f Field, usize)> {
    let mut columns = Vec::new();
    for (field, layout) in fields.iter().zip(layouts) {
        match field {
            FieldNode::Leaf(leaf) => columns.push((leaf, layout.width)),
            FieldNode::Composite(composite) => {
                columns.extend(leaf_columns(&composite.children, &layout.children))
            }
        }
    }
    columns
}
