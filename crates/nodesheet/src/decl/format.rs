//! Conditional cell formatting.

use std::fmt;
use std::sync::Arc;

use crate::style;
use crate::value::{CommonContext, DataSources, NodeId, Scalar};

/// What a closure can see about the entry being projected or formatted.
#[derive(Clone, Copy, Debug)]
pub struct EntryContext<'a> {
    pub node: &'a NodeId,
    /// The entry's key when the sheet iterates keys within each node.
    pub key: Option<&'a str>,
    /// Where those keys live within the node. Keyed lookups resolve under
    /// `entry_path` then `key`.
    pub entry_path: &'a [String],
    pub common: &'a CommonContext,
    pub sources: &'a DataSources,
}

type Predicate = Arc<dyn Fn(&Scalar, &EntryContext<'_>) -> bool + Send + Sync>;

/// A named condition that styles matching cells.
///
/// Text renderers paint the cell with the formatter's palette style; the
/// document renderer records the formatter name. The first matching
/// formatter of a field wins.
#[derive(Clone)]
pub struct Formatter {
    name: String,
    style: String,
    predicate: Predicate,
}

impl Formatter {
    pub fn new<F>(name: impl Into<String>, style: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Scalar, &EntryContext<'_>) -> bool + Send + Sync + 'static,
    {
        Formatter {
            name: name.into(),
            style: style.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn alert<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Scalar, &EntryContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(name, style::ALERT, predicate)
    }

    pub fn warning<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Scalar, &EntryContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(name, style::WARNING, predicate)
    }

    pub fn success<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Scalar, &EntryContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(name, style::SUCCESS, predicate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn matches(&self, value: &Scalar, ctx: &EntryContext<'_>) -> bool {
        (self.predicate)(value, ctx)
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("name", &self.name)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}
