//! Longan - A template rendering engine for word-processing documents
//!
//! This library fills `.docx` templates from JSON data. Placeholders are
//! written directly in the document as `{dotted.path}` tokens; rendering
//! looks each path up in a nested context and substitutes the value, even
//! when the word processor has split a token across several formatting runs.
//!
//! # Features
//!
//! - **Run-aware substitution**: Tokens fragmented across sibling runs are
//!   reassembled and replaced without disturbing surrounding formatting
//! - **Rich-text fields**: Context values holding Quill-style deltas compile
//!   into real paragraphs with bold, italic and bullet formatting
//! - **Byte-faithful output**: Untouched parts of the template survive
//!   rendering unchanged, down to whitespace and entity escaping
//! - **Unresolved-token reporting**: Every path that had no context value is
//!   available for inspection after a render
//!
//! # Example - Rendering a template
//!
//! ```no_run
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = std::fs::read("subscription-agreement.docx")?;
//!
//! let context = json!({
//!     "investor": { "primary_owner": { "full_name": "Ada Lovelace" } },
//!     "fund": { "name": "Evergreen Fund I" },
//!     "commitment": 250000,
//! });
//!
//! let document = longan::render(&template, &context)?;
//! std::fs::write("subscription-agreement-filled.docx", document)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Compiling a rich-text delta
//!
//! ```
//! let markup = longan::compile_delta(
//!     r#"{"ops":[{"insert":"Hello","attributes":{"bold":true}},{"insert":"\n"}]}"#,
//! );
//! assert_eq!(
//!     markup,
//!     "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">Hello</w:t></w:r></w:p>"
//! );
//! ```

use serde_json::Value;

/// Document container reading and writing
pub mod archive;
/// Render context flattening
pub mod context;
/// Error types
pub mod error;
/// Rich-text delta compilation
pub mod richtext;
/// Template handles and token substitution
pub mod template;
/// XML tree parsing and serialization
pub mod xml;

// Re-export the types most callers need
pub use error::{Error, Result};
pub use richtext::{DeltaCompiler, compile_delta};
pub use template::{RenderOptions, RenderReport, Template};

/// Render template bytes against a context, returning the finished document.
///
/// One-shot form of [`Template::from_bytes`] followed by
/// [`Template::render`].
pub fn render(template_bytes: &[u8], context: &Value) -> Result<Vec<u8>> {
    Template::from_bytes(template_bytes)?.render(context)
}

/// Render template bytes and also collect unresolved-token diagnostics.
pub fn render_with_report(
    template_bytes: &[u8],
    context: &Value,
) -> Result<(Vec<u8>, RenderReport)> {
    Template::from_bytes(template_bytes)?.render_with_report(context)
}
