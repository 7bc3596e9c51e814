//! Runtime fields: declarations bound to one render call's data.

use crate::decl::Align;
use crate::text::display_width;
use crate::value::Datum;

/// Cell text for a node whose value could not be obtained.
pub const UNAVAILABLE_MARKER: &str = "~~";
/// Cell text for a value that does not exist at the projected path.
pub const MISSING_MARKER: &str = "--";

/// A formatter that matched a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellFormat {
    pub name: String,
    /// Palette style applied by text renderers.
    pub style: String,
}

/// One converted value.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub datum: Datum,
    /// Display text, before alignment and styling.
    pub text: String,
    pub format: Option<CellFormat>,
}

impl Cell {
    pub fn width(&self) -> usize {
        display_width(&self.text)
    }

    /// An aggregate slot with no value renders as an empty cell.
    pub fn empty() -> Self {
        Cell {
            datum: Datum::Missing,
            text: String::new(),
            format: None,
        }
    }
}

/// A leaf field with its converted cells, already split into groups.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub title: String,
    pub key: String,
    pub align: Align,
    pub min_title_width: usize,
    /// `groups[g][e]` is the cell of entry `e` in group `g`.
    pub groups: Vec<Vec<Cell>>,
    /// One aggregate per group, present only if the field aggregates.
    pub aggregates: Option<Vec<Cell>>,
    pub is_grouped_by: bool,
    pub is_ordered_by: bool,
}

impl Field {
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn n_entries_in_group(&self, group: usize) -> usize {
        self.groups.get(group).map_or(0, Vec::len)
    }

    pub fn entry(&self, group: usize, entry: usize) -> Option<&Cell> {
        self.groups.get(group)?.get(entry)
    }

    pub fn aggregate(&self, group: usize) -> Option<&Cell> {
        self.aggregates.as_ref()?.get(group)
    }

    pub fn has_aggregate(&self) -> bool {
        self.aggregates.is_some()
    }

    /// All entry cells in render order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.groups.iter().flatten()
    }

    /// Width needed before any slack from a parent is added.
    pub fn natural_width(&self) -> usize {
        let entries = self.cells().map(Cell::width).max().unwrap_or(0);
        let aggregates = self
            .aggregates
            .iter()
            .flatten()
            .map(Cell::width)
            .max()
            .unwrap_or(0);
        entries.max(aggregates).max(self.min_title_width)
    }
}

/// A titled group of child fields.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeField {
    pub title: String,
    pub key: String,
    /// Visible children, never empty.
    pub children: Vec<FieldNode>,
}

/// A node of the visible field tree.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldNode {
    Leaf(Field),
    Composite(CompositeField),
}

impl FieldNode {
    pub fn title(&self) -> &str {
        match self {
            FieldNode::Leaf(f) => &f.title,
            FieldNode::Composite(c) => &c.title,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            FieldNode::Leaf(f) => &f.key,
            FieldNode::Composite(c) => &c.key,
        }
    }

    /// Leaves under this node, depth first.
    pub fn leaves(&self) -> Vec<&Field> {
        match self {
            FieldNode::Leaf(f) => vec![f],
            FieldNode::Composite(c) => c.children.iter().flat_map(FieldNode::leaves).collect(),
        }
    }

    pub fn has_aggregate(&self) -> bool {
        match self {
            FieldNode::Leaf(f) => f.has_aggregate(),
            FieldNode::Composite(c) => c.children.iter().any(FieldNode::has_aggregate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> Cell {
        Cell {
            datum: Datum::from(text),
            text: text.to_string(),
            format: None,
        }
    }

    fn field(groups: Vec<Vec<Cell>>, aggregates: Option<Vec<Cell>>, min: usize) -> Field {
        Field {
            title: "Objects".to_string(),
            key: "objects".to_string(),
            align: Align::Right,
            min_title_width: min,
            groups,
            aggregates,
            is_grouped_by: false,
            is_ordered_by: false,
        }
    }

    #[test]
    fn natural_width_takes_longest_of_cells_aggregates_and_title() {
        let f = field(vec![vec![cell("12"), cell("12345")]], None, 3);
        assert_eq!(f.natural_width(), 5);

        let f = field(vec![vec![cell("1")]], Some(vec![cell("1234567")]), 3);
        assert_eq!(f.natural_width(), 7);

        let f = field(vec![vec![cell("1")]], None, 7);
        assert_eq!(f.natural_width(), 7);
    }

    #[test]
    fn group_accessors() {
        let f = field(vec![vec![cell("a"), cell("b")], vec![cell("c")]], None, 0);
        assert_eq!(f.n_groups(), 2);
        assert_eq!(f.n_entries_in_group(0), 2);
        assert_eq!(f.n_entries_in_group(5), 0);
        assert_eq!(f.entry(1, 0).map(|c| c.text.as_str()), Some("c"));
        assert!(f.aggregate(0).is_none());
        assert_eq!(f.cells().count(), 3);
    }

    #[test]
    fn leaves_walk_composites() {
        let tree = FieldNode::Composite(CompositeField {
            title: "Memory".to_string(),
            key: "Memory".to_string(),
            children: vec![
                FieldNode::Leaf(field(vec![], None, 0)),
                FieldNode::Leaf(field(vec![], Some(vec![]), 0)),
            ],
        });
        assert_eq!(tree.leaves().len(), 2);
        assert!(tree.has_aggregate());
        assert_eq!(tree.title(), "Memory");
    }
}
