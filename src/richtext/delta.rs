//! Rich-text delta payload model.
//!
//! The delta format describes formatted text as an ordered list of insert
//! operations. Two shapes matter here: a text op carries a fragment of
//! character data with inline attributes, and a lone-newline op carries the
//! block attributes of the line it terminates.

use serde::Deserialize;

/// A parsed rich-text delta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Delta {
    /// Insert operations in content order
    pub ops: Vec<DeltaOp>,
}

/// One insert operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaOp {
    /// Inserted text, possibly holding embedded newlines
    pub insert: String,
    /// Formatting attributes, absent means none
    #[serde(default)]
    pub attributes: OpAttributes,
}

/// Recognized formatting attributes.
///
/// Unknown attributes are ignored rather than rejected, so payloads from
/// richer editors still compile with the formatting subset supported here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OpAttributes {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// Block-level list membership, `"bullet"` for bulleted lines
    #[serde(default)]
    pub list: Option<String>,
}

impl Delta {
    /// Parse a JSON payload, or `None` when it is not a delta.
    ///
    /// Anything that deviates from the expected shape, a non-object, a
    /// missing `ops` array or a non-string insert, makes the whole payload
    /// not-a-delta. Callers fall back to treating it as plain text.
    pub fn from_json(source: &str) -> Option<Self> {
        serde_json::from_str(source).ok()
    }
}

impl DeltaOp {
    /// Whether this op is a line terminator carrying block attributes.
    #[inline]
    pub fn is_line_format(&self) -> bool {
        self.insert == "\n"
    }

    /// Whether this op marks its line as a bullet list item.
    #[inline]
    pub fn is_bullet(&self) -> bool {
        self.attributes.list.as_deref() == Some("bullet")
    }
}
