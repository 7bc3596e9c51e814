//! Error types for sheet rendering.
//!
//! Two layers exist. [`SheetError`] covers failures raised while a sheet is
//! being built, laid out or serialized. [`RenderError`] is what the public
//! [`render`](crate::dispatch::render) entry point returns: either a contract violation
//! detected before any work starts, or a [`SheetError`] annotated with the
//! title, style and description of the render that failed.
//!
//! Per-node data problems are *not* errors. They travel through the engine as
//! [`Datum::Unavailable`](crate::Datum::Unavailable) and render in place.

use thiserror::Error;

use crate::decl::SheetStyle;

/// Failures raised while building, laying out or serializing a sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// A group-by or order-by key names no field of the declaration.
    #[error("{role} key '{key}' does not name a field")]
    UnknownField {
        /// The key that failed to resolve.
        key: String,
        /// Either `"group-by"` or `"order-by"`.
        role: &'static str,
    },

    /// A selector could not be compiled as a regular expression.
    #[error("invalid selector '{pattern}': {source}")]
    InvalidSelector {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Error returned by [`render`](crate::dispatch::render).
#[derive(Debug, Error)]
pub enum RenderError {
    /// The declaration requires data sources the caller did not supply.
    ///
    /// This is a programming error on the caller's side. It is reported
    /// before anything is built and is never annotated.
    #[error("sheet requires data sources that were not supplied: {}", .missing.join(", "))]
    MissingSources { missing: Vec<String> },

    /// A failure during layout or serialization, with the render's context.
    #[error("failed to render sheet '{title}' as {style}{}: {source}", describe(.description))]
    Sheet {
        title: String,
        style: SheetStyle,
        description: Option<String>,
        #[source]
        source: SheetError,
    },
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!(" ({})", d),
        _ => String::new(),
    }
}

impl RenderError {
    /// Returns the underlying sheet error, if this is an annotated failure.
    pub fn sheet_error(&self) -> Option<&SheetError> {
        match self {
            RenderError::Sheet { source, .. } => Some(source),
            RenderError::MissingSources { .. } => None,
        }
    }

    /// True when the error is a caller contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, RenderError::MissingSources { .. })
    }
}
