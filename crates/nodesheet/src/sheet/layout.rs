//! Two-phase field layout.
//!
//! Layout is a pure function of the visible field tree and the separator
//! width. It produces a parallel tree of [`Layout`]s, one per field:
//!
//! 1. **Measure** (bottom-up): a leaf takes the width of its longest cell,
//!    aggregate or title word. A composite takes the larger of its children
//!    plus separators and its own longest title word, widens itself by one
//!    or two columns when a wrapped title line would touch both edges, and
//!    then hands the slack down to its children.
//! 2. **Ready**: with every width fixed, titles are wrapped.
//!
//! After measuring, every composite satisfies
//! `sum(child widths) + separators == width` exactly.

use super::field::FieldNode;
use crate::text::{display_width, longest_word, wrap_title};

/// Computed layout of one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    /// The field's own title lines.
    pub title_lines: Vec<String>,
    /// Layouts of a composite's children, in order. Empty for leaves.
    pub children: Vec<Layout>,
}

impl Layout {
    /// Header lines this field occupies, including its children's.
    pub fn n_title_lines(&self) -> usize {
        self.title_lines.len()
            + self
                .children
                .iter()
                .map(Layout::n_title_lines)
                .max()
                .unwrap_or(0)
    }

    fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Runs both phases over the top-level fields.
pub fn prepare(fields: &[FieldNode], separator_width: usize) -> Vec<Layout> {
    fields
        .iter()
        .map(|field| {
            let mut layout = measure(field, separator_width);
            ready(field, &mut layout);
            layout
        })
        .collect()
}

/// Total width of laid out fields joined by separators.
pub fn joined_width(layouts: &[Layout], separator_width: usize) -> usize {
    let widths: usize = layouts.iter().map(|l| l.width).sum();
    widths + separator_width * layouts.len().saturating_sub(1)
}

/// Phase one: widths, bottom-up, with slack distributed to children.
pub fn measure(field: &FieldNode, separator_width: usize) -> Layout {
    match field {
        FieldNode::Leaf(leaf) => Layout {
            width: leaf.natural_width(),
            title_lines: Vec::new(),
            children: Vec::new(),
        },
        FieldNode::Composite(composite) => {
            let mut children: Vec<Layout> = composite
                .children
                .iter()
                .map(|child| measure(child, separator_width))
                .collect();

            let mut width =
                joined_width(&children, separator_width).max(longest_word(&composite.title));

            // Leave room for at least one fill character either side of
            // the widest title line.
            let line_len = widest_line(&wrap_title(&composite.title, width));
            if line_len == width {
                width += 2;
            } else if line_len + 1 == width {
                width += 1;
            }

            distribute(&mut children, width, separator_width);

            Layout {
                width,
                title_lines: Vec::new(),
                children,
            }
        }
    }
}

/// Spreads `width` across `children` so that their widths plus separators
/// add up to it exactly. Each child gets `slack / n`, and the first
/// `slack % n` children one more.
pub fn distribute(children: &mut [Layout], width: usize, separator_width: usize) {
    let current = joined_width(children, separator_width);
    if children.is_empty() || width <= current {
        return;
    }

    let slack = width - current;
    let share = slack / children.len();
    let extra = slack % children.len();

    for (i, child) in children.iter_mut().enumerate() {
        let add = share + usize::from(i < extra);
        grow(child, add, separator_width);
    }
}

fn grow(layout: &mut Layout, extra: usize, separator_width: usize) {
    if extra == 0 {
        return;
    }
    layout.width += extra;
    if layout.is_composite() {
        let width = layout.width;
        distribute(&mut layout.children, width, separator_width);
    }
}

/// Phase two: wrap every title at its final width.
pub fn ready(field: &FieldNode, layout: &mut Layout) {
    layout.title_lines = wrap_title(field.title(), layout.width);
    if let FieldNode::Composite(composite) = field {
        for (child, child_layout) in composite.children.iter().zip(layout.children.iter_mut()) {
            ready(child, child_layout);
        }
    }
}

fn widest_line(lines: &[String]) -> usize {
    lines.iter().map(|l| display_width(l)).max().unwrap_or(0)
}
